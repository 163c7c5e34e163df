//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Error bodies follow the XRPC convention: `{"error": ..., "message": ...}`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// The requested feed URI is not one this generator publishes.
  #[error("unknown feed: {0}")]
  UnknownFeed(String),

  /// This service is not addressed by a `did:web` identity, so there is no
  /// DID document to serve.
  #[error("no did:web document available")]
  NoDidDocument,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, error, message) = match &self {
      ApiError::UnknownFeed(m) => {
        (StatusCode::BAD_REQUEST, "UnsupportedAlgorithm", m.clone())
      }
      ApiError::NoDidDocument => {
        (StatusCode::NOT_FOUND, "NotFound", self.to_string())
      }
      ApiError::Store(e) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", e.to_string())
      }
    };
    (status, Json(json!({ "error": error, "message": message })))
      .into_response()
  }
}
