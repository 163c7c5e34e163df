//! XRPC surface for the Waypost feed generator.
//!
//! Exposes an axum [`Router`] backed by any [`waypost_core::store::FeedStore`]:
//! the feed skeleton, generator description, and `did:web` discovery
//! endpoints. This layer only reads from the store; all writes happen in
//! `waypost-ingest`.

pub mod error;
pub mod feed;
pub mod well_known;

use std::sync::Arc;

use axum::{Router, routing::get};
use waypost_core::store::FeedStore;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Identity strings the XRPC surface publishes.
#[derive(Debug, Clone)]
pub struct FeedGeneratorConfig {
  /// Public hostname this service is reachable at.
  pub hostname:      String,
  /// DID of this service (normally `did:web:{hostname}`).
  pub service_did:   String,
  /// DID of the account publishing the feed record.
  pub publisher_did: String,
  /// Record key of the published feed (max 15 characters per the lexicon).
  pub feed_name:     String,
}

impl FeedGeneratorConfig {
  /// The `at://` URI under which the feed is published.
  pub fn feed_uri(&self) -> String {
    format!(
      "at://{}/app.bsky.feed.generator/{}",
      self.publisher_did, self.feed_name
    )
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct ApiState<S: FeedStore> {
  pub store:  Arc<S>,
  pub config: Arc<FeedGeneratorConfig>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the feed-generator router.
pub fn router<S>(state: ApiState<S>) -> Router
where
  S: FeedStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route(
      "/xrpc/app.bsky.feed.getFeedSkeleton",
      get(feed::feed_skeleton::<S>),
    )
    .route(
      "/xrpc/app.bsky.feed.describeFeedGenerator",
      get(feed::describe_feed_generator::<S>),
    )
    .route("/.well-known/did.json", get(well_known::did_document::<S>))
    .with_state(state)
}
