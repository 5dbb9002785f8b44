//! SQLite quote history backend for Stockpile.
//!
//! This crate implements the `QuoteReader` and `QuoteWriter` traits from
//! `stockpile-core` on a single SQLite table through Diesel. It contains:
//! - Database initialization, connection pooling and the single writer task
//! - The `quotes` table schema and its row types
//! - `SqliteQuoteStore`, the atomic-policy store
//!
//! ```text
//! poller ──set_quotes──▶ WriteHandle ──▶ writer task (1 connection)
//!                                              │
//! readers ──get_quotes──▶ r2d2 pool ───────────┴──▶ SQLite file
//! ```
//!
//! Diesel only appears in this crate; `stockpile-core` stays storage-agnostic.

mod config;
pub mod db;
pub mod errors;
pub mod quotes;
pub mod schema;
mod utils;

pub use config::{SqliteStoreConfig, DEFAULT_DATABASE_FILE};
pub use db::{create_pool, get_connection, init, DbConnection, DbPool, WriteHandle};
pub use errors::{IntoCore, StorageError};
pub use quotes::SqliteQuoteStore;

pub use stockpile_core::errors::{DatabaseError, Error, Result};
