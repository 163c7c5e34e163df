//! Core types and trait definitions for the Waypost feed generator.
//!
//! This crate is deliberately free of HTTP, websocket and database
//! dependencies. All other crates depend on it; it depends on nothing
//! proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod filter;
pub mod post;
pub mod store;

pub use filter::{Candidate, FilterConfig, FilterEngine};
pub use post::{NewPost, Post};
