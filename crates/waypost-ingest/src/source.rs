//! The [`EventSource`] trait and the shared position marker.
//!
//! Upstream transports deliver events by callback or push; this crate
//! abstracts them behind a pull-style stream — a lazily produced, unbounded,
//! non-restartable sequence of creation events — so the subscription manager
//! can be driven by a scripted source in tests.

use std::{
  future::Future,
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
};

use futures::Stream;

use crate::{Result, event::CreateEvent};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A connectable source of record-creation events for one collection.
///
/// Retry policy lives in the subscription manager, not here: a transport
/// failure surfaces as an `Err` item (or end of stream) and the source is
/// simply connected again.
pub trait EventSource: Send + Sync + 'static {
  type Stream: Stream<Item = Result<CreateEvent>> + Send + Unpin;

  /// Establish a connection delivering events from `cursor` onwards.
  fn connect(
    &self,
    cursor: u64,
  ) -> impl Future<Output = Result<Self::Stream>> + Send + '_;

  /// The latest position marker observed on the connection, used for
  /// checkpointing. `None` before the first event.
  fn position(&self) -> Option<u64>;
}

// ─── Position cell ───────────────────────────────────────────────────────────

/// Lock-free "latest position" shared between the event-delivery path
/// (writer) and the checkpoint timer (reader).
///
/// Positions are microsecond epoch timestamps, so `0` doubles as the
/// "nothing observed yet" sentinel. Recording is monotonic: a stale write
/// can never move the position backwards.
#[derive(Debug, Clone, Default)]
pub struct PositionCell(Arc<AtomicU64>);

impl PositionCell {
  pub fn new() -> Self { Self::default() }

  pub fn record(&self, time_us: u64) {
    self.0.fetch_max(time_us, Ordering::Relaxed);
  }

  pub fn get(&self) -> Option<u64> {
    match self.0.load(Ordering::Relaxed) {
      0 => None,
      time_us => Some(time_us),
    }
  }
}
