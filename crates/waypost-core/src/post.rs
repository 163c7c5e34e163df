//! Post — the unit of accepted content.
//!
//! A post row is created exactly once, on the first successful filter pass
//! for its `uri`. It is never updated and never deleted by the ingestion
//! core; retention is somebody else's problem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An accepted post as persisted in the `post` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
  /// `at://` URI of the source record; globally unique, primary key.
  pub uri:        String,
  /// Content-addressed hash of the record at indexing time.
  pub cid:        String,
  /// When this system accepted the post; assigned by the store.
  pub indexed_at: DateTime<Utc>,
  /// The timestamp the original author put on the record.
  pub created_at: DateTime<Utc>,
}

/// A candidate row for [`FeedStore::insert_post`](crate::store::FeedStore).
/// The `indexed_at` timestamp is set by the store, not the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
  pub uri:        String,
  pub cid:        String,
  pub created_at: DateTime<Utc>,
}

impl NewPost {
  /// Build the `at://` record URI from its components.
  pub fn record_uri(did: &str, collection: &str, rkey: &str) -> String {
    format!("at://{did}/{collection}/{rkey}")
  }
}
