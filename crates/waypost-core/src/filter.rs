//! The content filter — a pure predicate over candidate posts.
//!
//! All sub-checks are combined by logical AND: a post is accepted only if it
//! is recent enough, matches at least one allow phrase, matches no deny
//! phrase, and carries no more than the configured number of tags. The
//! filter never errors; a missing field simply fails to match.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Tunables for [`FilterEngine`], injected as static configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
  /// Maximum post age in days; posts whose `created_at` is older than this
  /// (measured from wall-clock now at evaluation time) are rejected.
  pub lookback_days: i64,
  /// At least one of these must appear, case-insensitively, in the text.
  pub allow_phrases: Vec<String>,
  /// Any of these appearing, case-insensitively, rejects the post outright.
  pub deny_phrases:  Vec<String>,
  /// Maximum number of tag facet features before a post counts as spam.
  pub max_tags:      usize,
}

// ─── Candidate ───────────────────────────────────────────────────────────────

/// The fields of an inbound record the filter looks at.
///
/// Absent fields are represented as `None`/zero and are treated as "does not
/// match", never as an error.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
  pub text:       Option<&'a str>,
  pub created_at: Option<DateTime<Utc>>,
  /// Count of individual tag features across all facets.
  pub tag_count:  usize,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Stateless accept/reject decision function.
///
/// Phrase lists are lowercased once at construction so each evaluation only
/// lowercases the candidate text.
#[derive(Debug, Clone)]
pub struct FilterEngine {
  lookback:      Duration,
  allow_phrases: Vec<String>,
  deny_phrases:  Vec<String>,
  max_tags:      usize,
}

impl FilterEngine {
  pub fn new(config: FilterConfig) -> Self {
    Self {
      lookback:      Duration::days(config.lookback_days),
      allow_phrases: config
        .allow_phrases
        .iter()
        .map(|p| p.to_lowercase())
        .collect(),
      deny_phrases:  config
        .deny_phrases
        .iter()
        .map(|p| p.to_lowercase())
        .collect(),
      max_tags:      config.max_tags,
    }
  }

  /// The sliding recency window. Also used by the subscription layer to
  /// compute the cold-start cursor fallback.
  pub fn lookback(&self) -> Duration { self.lookback }

  /// Evaluate the full predicate chain against `candidate` at time `now`.
  pub fn accept(&self, candidate: &Candidate, now: DateTime<Utc>) -> bool {
    self.is_recent(candidate, now)
      && self.matches_allow(candidate)
      && !self.matches_deny(candidate)
      && candidate.tag_count <= self.max_tags
  }

  /// `created_at` must fall within the lookback window. The window slides
  /// with wall-clock time; future timestamps pass.
  fn is_recent(&self, candidate: &Candidate, now: DateTime<Utc>) -> bool {
    match candidate.created_at {
      Some(created_at) => created_at >= now - self.lookback,
      None => false,
    }
  }

  fn matches_allow(&self, candidate: &Candidate) -> bool {
    let Some(text) = candidate.text else {
      return false;
    };
    let text = text.to_lowercase();
    self.allow_phrases.iter().any(|p| text.contains(p.as_str()))
  }

  fn matches_deny(&self, candidate: &Candidate) -> bool {
    let Some(text) = candidate.text else {
      return false;
    };
    let text = text.to_lowercase();
    self.deny_phrases.iter().any(|p| text.contains(p.as_str()))
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
