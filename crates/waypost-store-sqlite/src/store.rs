//! [`SqliteStore`] — the SQLite implementation of [`FeedStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use waypost_core::{
  post::{NewPost, Post},
  store::FeedStore,
};

use crate::{
  Error, Result,
  encode::{RawPost, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Waypost feed store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. The post
/// insert path and the cursor checkpoint path may run concurrently; they
/// touch disjoint tables and each statement is atomic, so no transactions
/// are needed.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── FeedStore impl ──────────────────────────────────────────────────────────

impl FeedStore for SqliteStore {
  type Error = Error;

  async fn insert_post(&self, post: NewPost) -> Result<bool> {
    let indexed_at_str = encode_dt(Utc::now());
    let created_at_str = encode_dt(post.created_at);
    let uri = post.uri;
    let cid = post.cid;

    let inserted = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT INTO post (uri, cid, indexed_at, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (uri) DO NOTHING",
          rusqlite::params![uri, cid, indexed_at_str, created_at_str],
        )?;
        Ok(changed == 1)
      })
      .await?;

    Ok(inserted)
  }

  async fn list_recent(&self, limit: usize) -> Result<Vec<Post>> {
    let limit_val = limit as i64;

    let raws: Vec<RawPost> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT uri, cid, indexed_at, created_at
           FROM post
           ORDER BY indexed_at DESC, cid DESC
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val], |row| {
            Ok(RawPost {
              uri:        row.get(0)?,
              cid:        row.get(1)?,
              indexed_at: row.get(2)?,
              created_at: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPost::into_post).collect()
  }

  async fn read_cursor(&self, service: &str) -> Result<Option<u64>> {
    let service = service.to_owned();

    let cursor: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT cursor FROM sub_state WHERE service = ?1",
              rusqlite::params![service],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(cursor.map(|c| c as u64))
  }

  async fn write_cursor(&self, service: &str, cursor: u64) -> Result<()> {
    let service = service.to_owned();
    let cursor_val = cursor as i64;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sub_state (service, cursor)
           VALUES (?1, ?2)
           ON CONFLICT (service) DO UPDATE SET cursor = excluded.cursor",
          rusqlite::params![service, cursor_val],
        )?;
        Ok(())
      })
      .await?;

    Ok(())
  }
}
