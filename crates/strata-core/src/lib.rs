//! Core types and trait definitions for the Strata versioned-hierarchy store.
//!
//! This crate is deliberately free of database dependencies. All other crates
//! depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod detail;
pub mod error;
pub mod period;
pub mod record;
pub mod root;
pub mod store;
pub mod view;

pub use error::{Error, Result};
