//! SQLite backend for the COPD lineage store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Parent → child edges are enforced with
//! foreign keys, so a cascade that misses a child fails as a whole.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
