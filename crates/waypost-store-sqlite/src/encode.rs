//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Cursors are stored as
//! SQLite INTEGERs (microsecond epoch values fit comfortably in i64).

use chrono::{DateTime, Utc};
use waypost_core::Post;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Post rows ───────────────────────────────────────────────────────────────

/// A `post` row as read from SQLite, before timestamp decoding.
pub struct RawPost {
  pub uri:        String,
  pub cid:        String,
  pub indexed_at: String,
  pub created_at: String,
}

impl RawPost {
  pub fn into_post(self) -> Result<Post> {
    Ok(Post {
      uri:        self.uri,
      cid:        self.cid,
      indexed_at: decode_dt(&self.indexed_at)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
