//! `did:web` discovery — `GET /.well-known/did.json`.

use axum::{Json, extract::State};
use serde_json::{Value, json};
use waypost_core::store::FeedStore;

use crate::{ApiState, error::ApiError};

/// Serve the DID document for this service's `did:web` identity.
///
/// Only meaningful when the service DID is actually a `did:web`; other DID
/// methods are resolved elsewhere and get a 404 here.
pub async fn did_document<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Value>, ApiError>
where
  S: FeedStore + Clone + Send + Sync + 'static,
{
  let service_did = &state.config.service_did;
  if !service_did.starts_with("did:web:") {
    return Err(ApiError::NoDidDocument);
  }

  Ok(Json(json!({
    "@context": ["https://www.w3.org/ns/did/v1"],
    "id": service_did,
    "service": [{
      "id": "#bsky_fg",
      "type": "BskyFeedGenerator",
      "serviceEndpoint": format!("https://{}", state.config.hostname),
    }],
  })))
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::util::ServiceExt as _;
  use waypost_store_sqlite::SqliteStore;

  use crate::{ApiState, FeedGeneratorConfig, router};

  async fn state(service_did: &str) -> ApiState<SqliteStore> {
    ApiState {
      store:  Arc::new(SqliteStore::open_in_memory().await.unwrap()),
      config: Arc::new(FeedGeneratorConfig {
        hostname:      "feed.example.com".into(),
        service_did:   service_did.into(),
        publisher_did: "did:plc:publisher".into(),
        feed_name:     "travel".into(),
      }),
    }
  }

  #[tokio::test]
  async fn serves_did_web_document() {
    let response = router(state("did:web:feed.example.com").await)
      .oneshot(
        Request::get("/.well-known/did.json")
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
      .await
      .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["id"], "did:web:feed.example.com");
    assert_eq!(body["service"][0]["type"], "BskyFeedGenerator");
    assert_eq!(
      body["service"][0]["serviceEndpoint"],
      "https://feed.example.com"
    );
  }

  #[tokio::test]
  async fn non_did_web_identity_is_not_found() {
    let response = router(state("did:plc:abcdef").await)
      .oneshot(
        Request::get("/.well-known/did.json")
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
  }
}
