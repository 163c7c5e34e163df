//! Error type for `waypost-ingest`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("websocket transport error: {0}")]
  Transport(#[from] tokio_tungstenite::tungstenite::Error),

  /// The upstream closed the connection (cleanly or abruptly). The
  /// subscription manager treats this the same as a transport error:
  /// reconnect after the configured delay.
  #[error("upstream closed the event stream")]
  StreamClosed,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
