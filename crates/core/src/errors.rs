//! Core error types for Stockpile.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage layer.

use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for quote history operations.
///
/// The presentation layer is expected to tell `NotFound` apart from every
/// other variant, which it should treat as an internal failure.
#[derive(Error, Debug)]
pub enum Error {
    /// The queried symbol, or the whole requested batch, yields no quotes.
    #[error("Quotes not found: {0}")]
    NotFound(String),

    /// A best-effort write skipped records for symbols outside the allowlist.
    #[error("{}", format_unknown_symbols(.0))]
    UnknownSymbols(Vec<String>),

    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Quote source failed: {0}")]
    Source(String),

    #[error("Quote store is closed")]
    Closed,

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Returns true when the error means "no quotes", as opposed to a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

fn format_unknown_symbols(symbols: &[String]) -> String {
    symbols
        .iter()
        .map(|symbol| format!("symbol {:?} not found", symbol))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Database-agnostic error type for storage operations.
///
/// This enum uses `String` for all error details, allowing the storage layer
/// to convert storage-specific errors (Diesel, SQLite, etc.) into this format.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// Failed to remove or create the database file and schema.
    #[error("Failed to initialize database: {0}")]
    InitializationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// A database transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Database(DatabaseError::InitializationFailed(err.to_string()))
    }
}
