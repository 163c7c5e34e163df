//! Runtime server configuration, deserialised from `config.toml` and
//! `WAYPOST_`-prefixed environment variables.
//!
//! Every field has a default so the server starts with no config at all;
//! the defaults describe a travel-themed feed.

use std::path::PathBuf;

use serde::Deserialize;
use waypost_core::filter::FilterConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Network listen address.
  #[serde(default = "default_listenhost")]
  pub listenhost: String,

  #[serde(default = "default_port")]
  pub port: u16,

  /// Public hostname; also the basis of the default `did:web` identity.
  #[serde(default = "default_hostname")]
  pub hostname: String,

  #[serde(default = "default_sqlite_location")]
  pub sqlite_location: PathBuf,

  /// Explicit service DID; defaults to `did:web:{hostname}` when unset.
  #[serde(default)]
  pub service_did: Option<String>,

  /// DID of the account the feed record is published under.
  #[serde(default = "default_publisher_did")]
  pub publisher_did: String,

  /// Jetstream websocket base URL.
  #[serde(default = "default_jetstream_url")]
  pub jetstream_url: String,

  /// Delay before a failed subscription reconnects, in milliseconds.
  #[serde(default = "default_reconnect_delay_ms")]
  pub subscription_reconnect_delay_ms: u64,

  /// Record key of the published feed; max 15 characters.
  #[serde(default = "default_feed_name")]
  pub feed_name: String,

  // ── Filter tunables ───────────────────────────────────────────────────
  #[serde(default = "default_lookback_days")]
  pub lookback_days: i64,

  /// Phrases that flag a post for inclusion.
  #[serde(default = "default_allow_phrases")]
  pub allow_phrases: Vec<String>,

  /// Phrases that make an otherwise eligible post ineligible.
  #[serde(default = "default_deny_phrases")]
  pub deny_phrases: Vec<String>,

  /// Posts with more tags than this are treated as spam.
  #[serde(default = "default_max_tags")]
  pub max_tags: usize,
}

impl Config {
  pub fn service_did(&self) -> String {
    self
      .service_did
      .clone()
      .unwrap_or_else(|| format!("did:web:{}", self.hostname))
  }

  pub fn filter_config(&self) -> FilterConfig {
    FilterConfig {
      lookback_days: self.lookback_days,
      allow_phrases: self.allow_phrases.clone(),
      deny_phrases:  self.deny_phrases.clone(),
      max_tags:      self.max_tags,
    }
  }
}

// ─── Defaults ────────────────────────────────────────────────────────────────

fn default_listenhost() -> String { "localhost".into() }

fn default_port() -> u16 { 3000 }

fn default_hostname() -> String { "example.com".into() }

fn default_sqlite_location() -> PathBuf { PathBuf::from("waypost.sqlite") }

fn default_publisher_did() -> String { "did:example:alice".into() }

fn default_jetstream_url() -> String {
  "wss://jetstream1.us-east.bsky.network".into()
}

fn default_reconnect_delay_ms() -> u64 { 3000 }

fn default_feed_name() -> String { "travel".into() }

fn default_lookback_days() -> i64 { 7 }

fn default_allow_phrases() -> Vec<String> { vec!["✈️🗺️".into()] }

fn default_deny_phrases() -> Vec<String> {
  vec![
    "let's connect".into(),
    "follow back".into(),
    "follow me".into(),
    "all-inclusive".into(),
    "all inclusive".into(),
  ]
}

fn default_max_tags() -> usize { 3 }
