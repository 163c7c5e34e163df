//! The `FeedStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `waypost-store-sqlite`). Higher layers (`waypost-ingest`, `waypost-api`)
//! depend on this abstraction, not on any concrete backend.
//!
//! It covers the two persistence concerns of the ingestion core: the
//! idempotent post index, and the per-service subscription cursor.

use std::future::Future;

use crate::post::{NewPost, Post};

/// Abstraction over a Waypost storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait FeedStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Post index ────────────────────────────────────────────────────────

  /// Idempotent durable insert. Returns `true` if a new row was created,
  /// `false` if a row with the same `uri` already existed (silent no-op —
  /// no error, no duplicate, no update). `indexed_at` is set by the store.
  ///
  /// The no-op duplicate policy makes redelivery safe under at-least-once
  /// stream semantics.
  fn insert_post(
    &self,
    post: NewPost,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// The most recently indexed posts, newest first (`indexed_at` then `cid`
  /// as a tiebreak). Consumed by the feed-skeleton read path; the ingestion
  /// core never calls this.
  fn list_recent(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + '_;

  // ── Subscription cursor ───────────────────────────────────────────────

  /// Last checkpointed stream position for `service`. `None` on first run.
  fn read_cursor<'a>(
    &'a self,
    service: &'a str,
  ) -> impl Future<Output = Result<Option<u64>, Self::Error>> + Send + 'a;

  /// Upsert the cursor row for `service` — insert if no row exists, update
  /// in place otherwise. At most one row per service.
  fn write_cursor<'a>(
    &'a self,
    service: &'a str,
    cursor: u64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
