//! Handlers for the feed XRPC endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/xrpc/app.bsky.feed.getFeedSkeleton` | `?feed` required; optional `limit` (1..=100, default 50) |
//! | `GET`  | `/xrpc/app.bsky.feed.describeFeedGenerator` | Service DID + published feed URIs |

use axum::{
  Json,
  extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use waypost_core::store::FeedStore;

use crate::{ApiState, error::ApiError};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 100;

// ─── Feed skeleton ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SkeletonParams {
  /// The `at://` URI of the requested feed; must be one we publish.
  pub feed:  String,
  pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SkeletonItem {
  pub post: String,
}

#[derive(Debug, Serialize)]
pub struct SkeletonOutput {
  pub feed: Vec<SkeletonItem>,
}

/// `GET /xrpc/app.bsky.feed.getFeedSkeleton?feed=<uri>[&limit=N]`
///
/// Returns post URIs newest first. No pagination cursor: clients get the
/// freshest window of the feed on every call.
pub async fn feed_skeleton<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<SkeletonParams>,
) -> Result<Json<SkeletonOutput>, ApiError>
where
  S: FeedStore + Clone + Send + Sync + 'static,
{
  if params.feed != state.config.feed_uri() {
    return Err(ApiError::UnknownFeed(params.feed));
  }

  let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
  let posts = state
    .store
    .list_recent(limit)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok(Json(SkeletonOutput {
    feed: posts
      .into_iter()
      .map(|p| SkeletonItem { post: p.uri })
      .collect(),
  }))
}

// ─── Generator description ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct FeedRef {
  pub uri: String,
}

#[derive(Debug, Serialize)]
pub struct DescribeOutput {
  pub did:   String,
  pub feeds: Vec<FeedRef>,
}

/// `GET /xrpc/app.bsky.feed.describeFeedGenerator`
pub async fn describe_feed_generator<S>(
  State(state): State<ApiState<S>>,
) -> Json<DescribeOutput>
where
  S: FeedStore + Clone + Send + Sync + 'static,
{
  Json(DescribeOutput {
    did:   state.config.service_did.clone(),
    feeds: vec![FeedRef {
      uri: state.config.feed_uri(),
    }],
  })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
