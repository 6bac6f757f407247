//! SQLite backend for the Strata versioned-hierarchy store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. System versioning is emulated
//! with explicit `valid_from`/`valid_to` period columns; mutations close and
//! reopen rows inside a single transaction.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
