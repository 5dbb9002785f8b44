//! Storage-specific error types for SQLite operations.
//!
//! Diesel and r2d2 errors are wrapped here and converted to the
//! database-agnostic types of `stockpile_core` before leaving the crate.

use diesel::result::Error as DieselError;
use stockpile_core::errors::{DatabaseError, Error};
use thiserror::Error;

/// Storage-specific errors that wrap Diesel and r2d2 types.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Query execution failed: {0}")]
    QueryFailed(#[from] DieselError),

    /// A core error raised inside a writer job; passed through unchanged.
    #[error(transparent)]
    Core(#[from] Error),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConnectionFailed(e) => {
                Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
            }
            StorageError::PoolError(e) => {
                Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
            }
            StorageError::QueryFailed(DieselError::RollbackTransaction) => {
                Error::Database(DatabaseError::TransactionFailed(
                    "transaction rolled back".to_string(),
                ))
            }
            StorageError::QueryFailed(e @ DieselError::AlreadyInTransaction)
            | StorageError::QueryFailed(e @ DieselError::BrokenTransactionManager) => {
                Error::Database(DatabaseError::TransactionFailed(e.to_string()))
            }
            StorageError::QueryFailed(e) => {
                Error::Database(DatabaseError::QueryFailed(e.to_string()))
            }
            StorageError::Core(e) => e,
        }
    }
}

/// Extension trait for converting Diesel and r2d2 results to core results.
///
/// Since `From<DieselError> for Error` would break the orphan rule, this
/// provides `.into_core()` on any such `Result`, going through `StorageError`.
pub trait IntoCore<T> {
    fn into_core(self) -> stockpile_core::Result<T>;
}

impl<T> IntoCore<T> for std::result::Result<T, DieselError> {
    fn into_core(self) -> stockpile_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

impl<T> IntoCore<T> for std::result::Result<T, r2d2::Error> {
    fn into_core(self) -> stockpile_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

impl<T> IntoCore<T> for std::result::Result<T, diesel::ConnectionError> {
    fn into_core(self) -> stockpile_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}
