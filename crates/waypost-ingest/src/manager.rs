//! The subscription manager — connection lifecycle, checkpointing, and
//! event routing.
//!
//! One manager owns one logical stream. Its life is an explicit retry loop
//! (`Connecting → Streaming → Error → Reconnecting → Connecting`, forever)
//! rather than reconnection-by-recursion, so the retry policy is testable
//! and the call stack stays flat. While streaming, a spawned interval task
//! checkpoints the source's position to the store; each inbound event is
//! handled on its own task so a slow insert never stalls dispatch.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use futures::StreamExt as _;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use waypost_core::{FilterEngine, post::NewPost, store::FeedStore};

use crate::{Error, Result, event::CreateEvent, source::EventSource};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
  /// Upstream endpoint identifier; keys the `sub_state` cursor row.
  pub service:             String,
  /// Sleep between reconnection attempts. Retries are unbounded.
  pub reconnect_delay:     Duration,
  /// How often the checkpoint timer writes the current position.
  pub checkpoint_interval: Duration,
}

// ─── Manager ─────────────────────────────────────────────────────────────────

pub struct SubscriptionManager<S, D> {
  source: Arc<S>,
  store:  Arc<D>,
  filter: Arc<FilterEngine>,
  config: SubscriptionConfig,
}

impl<S, D> SubscriptionManager<S, D>
where
  S: EventSource,
  D: FeedStore + 'static,
{
  pub fn new(
    source: Arc<S>,
    store: Arc<D>,
    filter: FilterEngine,
    config: SubscriptionConfig,
  ) -> Self {
    Self {
      source,
      store,
      filter: Arc::new(filter),
      config,
    }
  }

  /// Run the subscription for the lifetime of the process. Never returns;
  /// every failure is logged and followed by a delayed reconnect.
  pub async fn run(&self) {
    loop {
      if let Err(e) = self.run_once().await {
        warn!(error = %e, "event stream failed");
      }
      info!(
        delay_ms = self.config.reconnect_delay.as_millis() as u64,
        "reconnecting to event stream"
      );
      tokio::time::sleep(self.config.reconnect_delay).await;
    }
  }

  /// A single `Connecting → Streaming` pass. Returns when the stream errors
  /// out or the upstream ends it; the checkpoint timer is cancelled on every
  /// exit path.
  pub async fn run_once(&self) -> Result<()> {
    let cursor = self.start_cursor().await;
    info!(cursor, service = %self.config.service, "connecting to event stream");

    let mut stream = self.source.connect(cursor).await?;

    let checkpoint = self.spawn_checkpoint_task();
    let outcome = self.stream_events(&mut stream).await;
    checkpoint.abort();
    outcome
  }

  /// The stored cursor wins; a cold start (or a failed read) falls back to
  /// "now minus the lookback window" so we neither replay the entire
  /// backlog nor miss the eligible window.
  async fn start_cursor(&self) -> u64 {
    match self.store.read_cursor(&self.config.service).await {
      Ok(Some(cursor)) => cursor,
      Ok(None) => {
        let cursor = fallback_cursor(self.filter.lookback(), Utc::now());
        info!(cursor, "no stored cursor; starting at the lookback window");
        cursor
      }
      Err(e) => {
        let cursor = fallback_cursor(self.filter.lookback(), Utc::now());
        warn!(error = %e, cursor, "cursor read failed; starting at the lookback window");
        cursor
      }
    }
  }

  /// Periodically persist the source's latest observed position.
  /// Checkpointing is best-effort: a write failure is logged and the timer
  /// keeps ticking.
  fn spawn_checkpoint_task(&self) -> JoinHandle<()> {
    let source = self.source.clone();
    let store = self.store.clone();
    let service = self.config.service.clone();
    let interval = self.config.checkpoint_interval;

    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      // The first tick of a tokio interval completes immediately.
      ticker.tick().await;
      loop {
        ticker.tick().await;
        let Some(cursor) = source.position() else {
          continue;
        };
        debug!(cursor, "checkpointing stream position");
        if let Err(e) = store.write_cursor(&service, cursor).await {
          warn!(error = %e, "cursor checkpoint failed");
        }
      }
    })
  }

  /// Dispatch events until the stream errors or ends. Each event is handled
  /// on its own task; per-event failures are logged there and never reach
  /// this loop.
  async fn stream_events(&self, stream: &mut S::Stream) -> Result<()> {
    while let Some(item) = stream.next().await {
      let event = item?;
      let filter = self.filter.clone();
      let store = self.store.clone();
      tokio::spawn(async move {
        if let Err(e) = handle_event(&filter, store.as_ref(), event).await {
          warn!(error = %e, "could not handle stream event");
        }
      });
    }
    Err(Error::StreamClosed)
  }
}

// ─── Event handling ──────────────────────────────────────────────────────────

/// Route one creation event through the filter and, if accepted, into the
/// post index. Duplicate URIs are a silent no-op at the store layer.
pub async fn handle_event<D: FeedStore>(
  filter: &FilterEngine,
  store: &D,
  event: CreateEvent,
) -> Result<()> {
  let candidate = event.record.candidate();
  if !filter.accept(&candidate, Utc::now()) {
    return Ok(());
  }

  // accept() implies a parseable created_at.
  let Some(created_at) = candidate.created_at else {
    return Ok(());
  };

  let uri = event.uri();
  let post = NewPost {
    uri: uri.clone(),
    cid: event.cid,
    created_at,
  };

  match store.insert_post(post).await {
    Ok(true) => info!(%uri, "indexed post"),
    Ok(false) => debug!(%uri, "post already indexed; skipping"),
    Err(e) => return Err(Error::Store(Box::new(e))),
  }
  Ok(())
}

/// "Now minus the maximum post age the filter will ever accept", in
/// microsecond epoch terms.
pub fn fallback_cursor(lookback: chrono::Duration, now: DateTime<Utc>) -> u64 {
  let lookback_us = lookback.num_microseconds().unwrap_or(i64::MAX);
  now.timestamp_micros().saturating_sub(lookback_us).max(0) as u64
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::{
    collections::VecDeque,
    sync::{Mutex, atomic::Ordering},
  };

  use futures::stream::{self, BoxStream};
  use waypost_core::filter::FilterConfig;
  use waypost_store_sqlite::SqliteStore;

  use super::*;
  use crate::{event::PostRecord, source::PositionCell};

  // ── Scripted source ─────────────────────────────────────────────────

  /// An [`EventSource`] that replays scripted batches: each `connect` call
  /// records the requested cursor and serves the next batch. Once the
  /// script is exhausted, connections fail.
  struct ScriptedSource {
    batches:  Mutex<VecDeque<Vec<Result<CreateEvent>>>>,
    connects: Mutex<Vec<u64>>,
    position: PositionCell,
    /// Keep the final stream open instead of ending it.
    hold_open: std::sync::atomic::AtomicBool,
  }

  impl ScriptedSource {
    fn new(batches: Vec<Vec<Result<CreateEvent>>>) -> Self {
      Self {
        batches:   Mutex::new(batches.into()),
        connects:  Mutex::new(Vec::new()),
        position:  PositionCell::new(),
        hold_open: std::sync::atomic::AtomicBool::new(false),
      }
    }

    fn connects(&self) -> Vec<u64> { self.connects.lock().unwrap().clone() }
  }

  impl EventSource for ScriptedSource {
    type Stream = BoxStream<'static, Result<CreateEvent>>;

    async fn connect(&self, cursor: u64) -> Result<Self::Stream> {
      self.connects.lock().unwrap().push(cursor);
      let batch = self
        .batches
        .lock()
        .unwrap()
        .pop_front()
        .ok_or(Error::StreamClosed)?;

      for item in &batch {
        if let Ok(event) = item {
          self.position.record(event.time_us);
        }
      }

      let events = stream::iter(batch);
      if self.hold_open.load(Ordering::Relaxed) {
        Ok(events.chain(stream::pending()).boxed())
      } else {
        Ok(events.boxed())
      }
    }

    fn position(&self) -> Option<u64> { self.position.get() }
  }

  // ── Fixtures ────────────────────────────────────────────────────────

  const SERVICE: &str = "wss://jetstream.test";

  fn filter() -> FilterEngine {
    FilterEngine::new(FilterConfig {
      lookback_days: 7,
      allow_phrases: vec!["✈️🗺️".into()],
      deny_phrases:  vec!["follow back".into()],
      max_tags:      3,
    })
  }

  fn config(reconnect_ms: u64) -> SubscriptionConfig {
    SubscriptionConfig {
      service:             SERVICE.into(),
      reconnect_delay:     Duration::from_millis(reconnect_ms),
      checkpoint_interval: Duration::from_millis(10),
    }
  }

  fn event(rkey: &str, time_us: u64, text: &str) -> CreateEvent {
    CreateEvent {
      did:        "did:plc:abc".into(),
      time_us,
      collection: "app.bsky.feed.post".into(),
      rkey:       rkey.into(),
      cid:        format!("bafy-{rkey}"),
      record:     PostRecord {
        text:       Some(text.into()),
        created_at: Some(Utc::now().to_rfc3339()),
        facets:     Vec::new(),
      },
    }
  }

  async fn store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().await.unwrap())
  }

  // ── handle_event ────────────────────────────────────────────────────

  #[tokio::test]
  async fn accepted_event_is_inserted() {
    let store = store().await;
    handle_event(&filter(), store.as_ref(), event("1", 10, "✈️🗺️ amazing trip"))
      .await
      .unwrap();

    let posts = store.list_recent(10).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].uri, "at://did:plc:abc/app.bsky.feed.post/1");
  }

  #[tokio::test]
  async fn rejected_event_is_not_inserted() {
    let store = store().await;
    handle_event(
      &filter(),
      store.as_ref(),
      event("1", 10, "✈️🗺️ trip, follow back!"),
    )
    .await
    .unwrap();

    assert!(store.list_recent(10).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn redelivered_event_leaves_a_single_row() {
    let store = store().await;
    let ev = event("1", 10, "✈️🗺️ amazing trip");

    handle_event(&filter(), store.as_ref(), ev.clone()).await.unwrap();
    handle_event(&filter(), store.as_ref(), ev).await.unwrap();

    assert_eq!(store.list_recent(10).await.unwrap().len(), 1);
  }

  // ── Cursor selection ────────────────────────────────────────────────

  #[tokio::test]
  async fn resumes_from_stored_cursor() {
    let store = store().await;
    store.write_cursor(SERVICE, 1_234_567).await.unwrap();

    let source = Arc::new(ScriptedSource::new(vec![vec![]]));
    let manager =
      SubscriptionManager::new(source.clone(), store, filter(), config(5));

    let _ = manager.run_once().await;
    assert_eq!(source.connects(), vec![1_234_567]);
  }

  #[tokio::test]
  async fn cold_start_uses_lookback_fallback() {
    let store = store().await;
    let source = Arc::new(ScriptedSource::new(vec![vec![]]));
    let manager =
      SubscriptionManager::new(source.clone(), store, filter(), config(5));

    let before = fallback_cursor(chrono::Duration::days(7), Utc::now());
    let _ = manager.run_once().await;
    let after = fallback_cursor(chrono::Duration::days(7), Utc::now());

    let connects = source.connects();
    assert_eq!(connects.len(), 1);
    assert!(connects[0] >= before && connects[0] <= after);
  }

  #[test]
  fn fallback_cursor_is_now_minus_lookback() {
    let now = DateTime::parse_from_rfc3339("2024-01-08T00:00:00Z")
      .unwrap()
      .with_timezone(&Utc);
    let cursor = fallback_cursor(chrono::Duration::days(7), now);

    let week_earlier = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
      .unwrap()
      .with_timezone(&Utc);
    assert_eq!(cursor, week_earlier.timestamp_micros() as u64);
  }

  // ── Streaming and reconnection ──────────────────────────────────────

  #[tokio::test]
  async fn events_flow_into_the_store() {
    let store = store().await;
    let source = Arc::new(ScriptedSource::new(vec![vec![
      Ok(event("1", 10, "✈️🗺️ amazing trip")),
      Ok(event("2", 20, "nothing relevant here")),
      Ok(event("3", 30, "✈️🗺️ another trip")),
    ]]));
    let manager = SubscriptionManager::new(
      source.clone(),
      store.clone(),
      filter(),
      config(5),
    );

    let _ = manager.run_once().await;
    // Handlers run on their own tasks; give them a beat to finish.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let posts = store.list_recent(10).await.unwrap();
    assert_eq!(posts.len(), 2);
  }

  #[tokio::test]
  async fn end_of_stream_reports_closed() {
    let store = store().await;
    let source = Arc::new(ScriptedSource::new(vec![vec![]]));
    let manager =
      SubscriptionManager::new(source, store, filter(), config(5));

    let outcome = manager.run_once().await;
    assert!(matches!(outcome, Err(Error::StreamClosed)));
  }

  #[tokio::test]
  async fn run_reconnects_after_failures() {
    let store = store().await;
    // Three empty batches, then connect() itself starts failing; run()
    // must keep retrying through both failure modes.
    let source =
      Arc::new(ScriptedSource::new(vec![vec![], vec![], vec![]]));
    let manager = Arc::new(SubscriptionManager::new(
      source.clone(),
      store,
      filter(),
      config(5),
    ));

    let runner = {
      let manager = manager.clone();
      tokio::spawn(async move { manager.run().await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    runner.abort();

    assert!(source.connects().len() >= 3);
  }

  #[tokio::test]
  async fn reconnect_rereads_the_stored_cursor() {
    let store = store().await;
    store.write_cursor(SERVICE, 100).await.unwrap();

    let source = Arc::new(ScriptedSource::new(vec![vec![], vec![]]));
    let manager =
      SubscriptionManager::new(source.clone(), store.clone(), filter(), config(5));

    let _ = manager.run_once().await;
    // A checkpoint (or another writer) may advance the cursor between
    // attempts; the next connect must see the newer value.
    store.write_cursor(SERVICE, 200).await.unwrap();
    let _ = manager.run_once().await;

    assert_eq!(source.connects(), vec![100, 200]);
  }

  // ── Checkpointing ───────────────────────────────────────────────────

  #[tokio::test]
  async fn checkpoint_timer_persists_the_position() {
    let store = store().await;
    let source = Arc::new(ScriptedSource::new(vec![vec![Ok(event(
      "1",
      777_000,
      "✈️🗺️ amazing trip",
    ))]]));
    source.hold_open.store(true, Ordering::Relaxed);

    let manager = Arc::new(SubscriptionManager::new(
      source,
      store.clone(),
      filter(),
      config(5),
    ));

    let runner = {
      let manager = manager.clone();
      tokio::spawn(async move { manager.run_once().await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    runner.abort();

    assert_eq!(store.read_cursor(SERVICE).await.unwrap(), Some(777_000));
  }

  #[tokio::test]
  async fn no_checkpoint_before_the_first_event() {
    let store = store().await;
    let source = Arc::new(ScriptedSource::new(vec![vec![]]));
    source.hold_open.store(true, Ordering::Relaxed);

    let manager = Arc::new(SubscriptionManager::new(
      source,
      store.clone(),
      filter(),
      config(5),
    ));

    let runner = {
      let manager = manager.clone();
      tokio::spawn(async move { manager.run_once().await })
    };

    tokio::time::sleep(Duration::from_millis(60)).await;
    runner.abort();

    // The timer ticked several times but had no position to write, and the
    // fallback cursor must not be checkpointed as if it were progress.
    assert_eq!(store.read_cursor(SERVICE).await.unwrap(), None);
  }
}
