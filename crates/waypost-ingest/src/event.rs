//! Wire model for Jetstream events and the ingestion-facing
//! [`CreateEvent`] the rest of the pipeline consumes.
//!
//! The wire types are deliberately lenient: every record field is optional
//! or defaulted, and unknown enum tags fall through to `Other` variants, so
//! a frame this crate does not understand is skipped rather than fatal.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use waypost_core::{filter::Candidate, post::NewPost};

// ─── Jetstream frames ────────────────────────────────────────────────────────

/// A single Jetstream frame, as decoded from a websocket text message.
#[derive(Debug, Clone, Deserialize)]
pub struct JetstreamEvent {
  /// Author identity (repo DID).
  pub did:     String,
  /// Position marker; microsecond epoch. Monotonically non-decreasing
  /// within a connection.
  pub time_us: u64,
  pub kind:    EventKind,
  #[serde(default)]
  pub commit:  Option<Commit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
  Commit,
  Identity,
  Account,
  #[serde(other)]
  Other,
}

/// The commit payload of a `kind: commit` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
  pub operation:  CommitOperation,
  pub collection: String,
  pub rkey:       String,
  #[serde(default)]
  pub cid:        Option<String>,
  #[serde(default)]
  pub record:     Option<PostRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitOperation {
  Create,
  Update,
  Delete,
  #[serde(other)]
  Other,
}

// ─── Record payload ──────────────────────────────────────────────────────────

/// An `app.bsky.feed.post` record as carried in a commit frame.
///
/// Every field is optional; the filter treats absence as "does not match".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostRecord {
  #[serde(default)]
  pub text:       Option<String>,
  /// Author-assigned creation timestamp, nominally RFC 3339.
  #[serde(default, rename = "createdAt")]
  pub created_at: Option<String>,
  #[serde(default)]
  pub facets:     Vec<Facet>,
}

impl PostRecord {
  /// `createdAt` parsed as RFC 3339; `None` when absent or unparseable.
  pub fn created_at_parsed(&self) -> Option<DateTime<Utc>> {
    self
      .created_at
      .as_deref()
      .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
      .map(|dt| dt.with_timezone(&Utc))
  }

  /// Total number of individual tag features across all facets. A single
  /// facet carrying several tag features contributes all of them.
  pub fn tag_count(&self) -> usize {
    self
      .facets
      .iter()
      .map(|facet| {
        facet
          .features
          .iter()
          .filter(|f| matches!(f, FacetFeature::Tag { .. }))
          .count()
      })
      .sum()
  }

  /// Project the record onto the fields the filter inspects.
  pub fn candidate(&self) -> Candidate<'_> {
    Candidate {
      text:       self.text.as_deref(),
      created_at: self.created_at_parsed(),
      tag_count:  self.tag_count(),
    }
  }
}

/// A rich-text annotation attached to a post.
#[derive(Debug, Clone, Deserialize)]
pub struct Facet {
  #[serde(default)]
  pub features: Vec<FacetFeature>,
}

/// A single facet feature, discriminated by its `$type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "$type")]
pub enum FacetFeature {
  #[serde(rename = "app.bsky.richtext.facet#tag")]
  Tag { tag: String },
  #[serde(rename = "app.bsky.richtext.facet#link")]
  Link { uri: String },
  #[serde(rename = "app.bsky.richtext.facet#mention")]
  Mention { did: String },
  /// Feature types this crate does not know about.
  #[serde(other)]
  Other,
}

// ─── Ingestion event ─────────────────────────────────────────────────────────

/// A record-creation event for the wanted collection, as yielded by an
/// [`EventSource`](crate::source::EventSource) stream.
#[derive(Debug, Clone)]
pub struct CreateEvent {
  pub did:        String,
  pub time_us:    u64,
  pub collection: String,
  pub rkey:       String,
  pub cid:        String,
  pub record:     PostRecord,
}

impl CreateEvent {
  /// The globally unique `at://` URI of the created record.
  pub fn uri(&self) -> String {
    NewPost::record_uri(&self.did, &self.collection, &self.rkey)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_commit_create_frame() {
    let frame = r#"{
      "did": "did:plc:abc",
      "time_us": 1700000000000000,
      "kind": "commit",
      "commit": {
        "rev": "3kxyz",
        "operation": "create",
        "collection": "app.bsky.feed.post",
        "rkey": "3kabc",
        "cid": "bafyreia",
        "record": {
          "$type": "app.bsky.feed.post",
          "text": "✈️🗺️ amazing trip",
          "createdAt": "2024-01-01T12:00:00.000Z",
          "langs": ["en"]
        }
      }
    }"#;

    let event: JetstreamEvent = serde_json::from_str(frame).unwrap();
    assert_eq!(event.kind, EventKind::Commit);
    assert_eq!(event.time_us, 1_700_000_000_000_000);

    let commit = event.commit.unwrap();
    assert_eq!(commit.operation, CommitOperation::Create);
    assert_eq!(commit.collection, "app.bsky.feed.post");

    let record = commit.record.unwrap();
    assert_eq!(record.text.as_deref(), Some("✈️🗺️ amazing trip"));
    assert!(record.created_at_parsed().is_some());
  }

  #[test]
  fn parses_identity_frame_without_commit() {
    let frame = r#"{
      "did": "did:plc:abc",
      "time_us": 42,
      "kind": "identity",
      "identity": { "did": "did:plc:abc", "handle": "alice.example" }
    }"#;

    let event: JetstreamEvent = serde_json::from_str(frame).unwrap();
    assert_eq!(event.kind, EventKind::Identity);
    assert!(event.commit.is_none());
  }

  #[test]
  fn unknown_event_kind_is_tolerated() {
    let frame = r#"{ "did": "did:plc:abc", "time_us": 1, "kind": "sync" }"#;
    let event: JetstreamEvent = serde_json::from_str(frame).unwrap();
    assert_eq!(event.kind, EventKind::Other);
  }

  #[test]
  fn tag_count_counts_features_not_facets() {
    let record: PostRecord = serde_json::from_str(
      r#"{
        "text": "tagged",
        "facets": [
          { "features": [
            { "$type": "app.bsky.richtext.facet#tag", "tag": "travel" },
            { "$type": "app.bsky.richtext.facet#tag", "tag": "europe" }
          ]},
          { "features": [
            { "$type": "app.bsky.richtext.facet#link", "uri": "https://example.com" }
          ]}
        ]
      }"#,
    )
    .unwrap();

    // One facet carrying two tag features counts as two tags.
    assert_eq!(record.tag_count(), 2);
  }

  #[test]
  fn unknown_facet_feature_does_not_fail_parsing() {
    let record: PostRecord = serde_json::from_str(
      r#"{
        "text": "hi",
        "facets": [
          { "features": [ { "$type": "com.example.future#thing", "x": 1 } ] }
        ]
      }"#,
    )
    .unwrap();

    assert_eq!(record.tag_count(), 0);
  }

  #[test]
  fn missing_fields_yield_empty_candidate() {
    let record: PostRecord = serde_json::from_str("{}").unwrap();
    let candidate = record.candidate();
    assert!(candidate.text.is_none());
    assert!(candidate.created_at.is_none());
    assert_eq!(candidate.tag_count, 0);
  }

  #[test]
  fn unparseable_created_at_is_none() {
    let record: PostRecord =
      serde_json::from_str(r#"{ "createdAt": "not a date" }"#).unwrap();
    assert!(record.created_at_parsed().is_none());
  }

  #[test]
  fn create_event_uri_concatenation() {
    let event = CreateEvent {
      did:        "did:plc:abc".into(),
      time_us:    1,
      collection: "app.bsky.feed.post".into(),
      rkey:       "3kabc".into(),
      cid:        "bafyreia".into(),
      record:     PostRecord::default(),
    };
    assert_eq!(event.uri(), "at://did:plc:abc/app.bsky.feed.post/3kabc");
  }
}
