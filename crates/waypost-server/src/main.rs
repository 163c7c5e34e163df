//! waypost server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, starts the Jetstream subscription in the
//! background, and serves the feed-generator XRPC endpoints over HTTP.

mod config;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use waypost_api::{ApiState, FeedGeneratorConfig};
use waypost_core::FilterEngine;
use waypost_ingest::{JetstreamClient, SubscriptionConfig, SubscriptionManager};
use waypost_store_sqlite::SqliteStore;

use crate::config::Config;

/// The single record type this service subscribes to.
const WANTED_COLLECTION: &str = "app.bsky.feed.post";

/// Fixed interval between cursor checkpoints.
const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(author, version, about = "Waypost feed generator")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration. `::config` is the config crate; `crate::config`
  // holds our own Config struct.
  let settings = ::config::Config::builder()
    .add_source(::config::File::from(cli.config).required(false))
    .add_source(::config::Environment::with_prefix("WAYPOST"))
    .build()
    .context("failed to read config file")?;
  let cfg: Config = settings
    .try_deserialize()
    .context("failed to deserialise Config")?;

  // Open SQLite store.
  let store = SqliteStore::open(&cfg.sqlite_location)
    .await
    .with_context(|| {
      format!("failed to open store at {:?}", cfg.sqlite_location)
    })?;
  let store = Arc::new(store);

  // Start the stream subscription in the background. It reconnects
  // indefinitely and only stops with the process.
  let filter = FilterEngine::new(cfg.filter_config());
  let source = Arc::new(JetstreamClient::new(
    cfg.jetstream_url.clone(),
    WANTED_COLLECTION,
  ));
  let subscription_config = SubscriptionConfig {
    service:             cfg.jetstream_url.clone(),
    reconnect_delay:     Duration::from_millis(
      cfg.subscription_reconnect_delay_ms,
    ),
    checkpoint_interval: CHECKPOINT_INTERVAL,
  };
  let manager =
    SubscriptionManager::new(source, store.clone(), filter, subscription_config);
  tokio::spawn(async move { manager.run().await });

  // Serve the XRPC surface.
  let state = ApiState {
    store,
    config: Arc::new(FeedGeneratorConfig {
      hostname:      cfg.hostname.clone(),
      service_did:   cfg.service_did(),
      publisher_did: cfg.publisher_did.clone(),
      feed_name:     cfg.feed_name.clone(),
    }),
  };
  let app = waypost_api::router(state).layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", cfg.listenhost, cfg.port);
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
