//! SQL schema for the Waypost SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Accepted posts; append-only from the ingestion core's point of view.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS post (
    uri         TEXT PRIMARY KEY,   -- at:// record URI
    cid         TEXT NOT NULL,      -- content hash at indexing time
    indexed_at  TEXT NOT NULL,      -- ISO 8601 UTC; store-assigned
    created_at  TEXT NOT NULL       -- ISO 8601 UTC; author-assigned
);

-- One row per upstream service; the latest checkpointed stream position.
CREATE TABLE IF NOT EXISTS sub_state (
    service     TEXT PRIMARY KEY,
    cursor      INTEGER NOT NULL    -- microsecond epoch
);

CREATE INDEX IF NOT EXISTS post_indexed_idx ON post(indexed_at);

PRAGMA user_version = 1;
";
