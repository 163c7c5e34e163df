//! Stream ingestion for Waypost.
//!
//! Consumes the Jetstream firehose, routes post-creation events through the
//! content filter, and writes accepted posts to the feed store. The transport
//! is abstracted behind the pull-style [`EventSource`] trait so the
//! subscription logic is testable without a live websocket.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod event;
pub mod jetstream;
pub mod manager;
pub mod source;

pub use error::{Error, Result};
pub use event::CreateEvent;
pub use jetstream::JetstreamClient;
pub use manager::{SubscriptionConfig, SubscriptionManager};
pub use source::{EventSource, PositionCell};
