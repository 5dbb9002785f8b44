//! Quote source capability.

use async_trait::async_trait;

use super::model::QuoteRecord;
use crate::errors::Result;

/// External collaborator that supplies fresh quotes.
///
/// Transport, retries and rate limiting are the implementation's business.
/// The poller calls `fetch` once per tick and never interrupts it, so an
/// implementation that can hang should enforce its own timeout.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetches the current quote for each of `symbols`.
    async fn fetch(&self, symbols: &[String]) -> Result<Vec<QuoteRecord>>;
}
