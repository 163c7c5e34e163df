//! [`JetstreamClient`] — the websocket implementation of [`EventSource`].
//!
//! Connects to a Jetstream endpoint filtered to a single collection and
//! adapts the inbound frames into the pull-style [`CreateEvent`] stream.
//! Frames this crate cannot decode are logged and skipped; transport
//! failures surface as stream errors and end the connection.

use futures::StreamExt as _;
use futures::stream::BoxStream;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info};

use crate::{
  Error, Result,
  event::{CommitOperation, CreateEvent, EventKind, JetstreamEvent},
  source::{EventSource, PositionCell},
};

// ─── Client ──────────────────────────────────────────────────────────────────

/// A Jetstream subscription for one wanted collection.
pub struct JetstreamClient {
  endpoint:   String,
  collection: String,
  position:   PositionCell,
}

impl JetstreamClient {
  /// `endpoint` is the websocket base URL (e.g.
  /// `wss://jetstream1.us-east.bsky.network`); `collection` the single
  /// wanted record type (e.g. `app.bsky.feed.post`).
  pub fn new(endpoint: impl Into<String>, collection: impl Into<String>) -> Self {
    Self {
      endpoint:   endpoint.into(),
      collection: collection.into(),
      position:   PositionCell::new(),
    }
  }
}

impl EventSource for JetstreamClient {
  type Stream = BoxStream<'static, Result<CreateEvent>>;

  async fn connect(&self, cursor: u64) -> Result<Self::Stream> {
    let url = format!(
      "{}/subscribe?wantedCollections={}&cursor={}",
      self.endpoint, self.collection, cursor
    );

    let (ws, _response) = connect_async(url.as_str()).await?;
    info!(endpoint = %self.endpoint, cursor, "jetstream connection open");

    let position = self.position.clone();
    let collection = self.collection.clone();

    let stream = ws
      .filter_map(move |frame| {
        let position = position.clone();
        let collection = collection.clone();
        async move {
          match frame {
            Ok(Message::Text(text)) => {
              decode_frame(text.as_str(), &collection, &position)
            }
            Ok(Message::Close(_)) => Some(Err(Error::StreamClosed)),
            // Pings and pongs are handled by tungstenite itself.
            Ok(_) => None,
            Err(e) => Some(Err(Error::Transport(e))),
          }
        }
      })
      .boxed();

    Ok(stream)
  }

  fn position(&self) -> Option<u64> { self.position.get() }
}

// ─── Frame decoding ──────────────────────────────────────────────────────────

/// Decode one text frame. Records the position marker for *every* parseable
/// frame (identity and account events advance the cursor too), but only
/// yields creation events for the wanted collection.
fn decode_frame(
  text: &str,
  collection: &str,
  position: &PositionCell,
) -> Option<Result<CreateEvent>> {
  let event: JetstreamEvent = match serde_json::from_str(text) {
    Ok(event) => event,
    Err(e) => {
      debug!(error = %e, "skipping undecodable jetstream frame");
      return None;
    }
  };

  position.record(event.time_us);

  if event.kind != EventKind::Commit {
    return None;
  }
  let commit = event.commit?;
  if commit.operation != CommitOperation::Create || commit.collection != collection
  {
    return None;
  }
  let cid = commit.cid?;
  let record = commit.record?;

  Some(Ok(CreateEvent {
    did: event.did,
    time_us: event.time_us,
    collection: commit.collection,
    rkey: commit.rkey,
    cid,
    record,
  }))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
