//! Quote storage traits.
//!
//! This module defines the read and write capabilities every quote history
//! backend implements. They are separate traits so a consumer can be handed
//! only the half it needs: the poller writes, the presentation layer reads.
//!
//! # Ordering
//!
//! Every read returns records newest first by *insertion* order. The `time`
//! field of a record plays no part in ordering, so a source that delivers
//! out-of-order timestamps is still read back in the order it was written.
//!
//! # Depth
//!
//! `last` is the number of records wanted per symbol. Values below one are
//! treated as one, values above the stored count return everything stored.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::model::{QuoteBatch, QuoteRecord};
use crate::errors::Result;

// =============================================================================
// Write Policy
// =============================================================================

/// How a writer handles records it cannot store.
///
/// Both policies conform to the `QuoteWriter` contract; callers must not
/// assume either one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Apply every record that can be applied, skip the rest and return one
    /// aggregated error naming the skipped symbols.
    BestEffort,
    /// Treat the batch as a single transaction: the first failure rolls back
    /// every record and is returned.
    Atomic,
}

// =============================================================================
// Quote Reader
// =============================================================================

/// Read side of a quote history store.
pub trait QuoteReader: Send + Sync {
    /// Gets up to `last` most recently inserted quotes for `symbol`, newest first.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if the symbol is unknown to the store.
    fn get_quotes(&self, symbol: &str, last: i64) -> Result<Vec<QuoteRecord>>;

    /// Gets up to `last` most recent quotes for each symbol in one call.
    ///
    /// An empty `symbols` slice means every symbol the store knows. Symbols
    /// that are known but have no quotes are left out of the map.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` when the batch cannot be answered. See the backend
    /// documentation for exactly which inputs trigger it.
    fn get_quotes_batch(&self, symbols: &[String], last: i64) -> Result<QuoteBatch>;
}

// =============================================================================
// Quote Writer
// =============================================================================

/// Write side of a quote history store.
#[async_trait]
pub trait QuoteWriter: Send + Sync {
    /// The failure policy `set_quotes` follows.
    fn write_policy(&self) -> WritePolicy;

    /// Inserts each quote at the head of its symbol's history.
    ///
    /// There is no deduplication: writing an identical quote twice stores it
    /// twice. Partial failure handling follows `write_policy()`.
    async fn set_quotes(&self, quotes: &[QuoteRecord]) -> Result<()>;

    /// Releases the resources held by the store.
    ///
    /// Safe to call more than once; later calls succeed without doing
    /// anything. Reads and writes issued after close fail with `Error::Closed`.
    async fn close(&self) -> Result<()>;
}

/// A backend that can be both read and written.
pub trait QuoteStore: QuoteReader + QuoteWriter {}

impl<T: QuoteReader + QuoteWriter> QuoteStore for T {}
