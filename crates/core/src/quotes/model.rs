//! Quote domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Quote Record
// =============================================================================

/// One observation of a symbol's price at a point in time.
///
/// Price and time are kept verbatim: there is no non-negativity or
/// monotonic-time validation. Two records with identical fields are still
/// distinct entries in a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub symbol: String,
    pub price: f64,
    pub time: DateTime<Utc>,
}

impl QuoteRecord {
    pub fn new(symbol: impl Into<String>, price: f64, time: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            time,
        }
    }

    /// Returns a copy whose symbol is lowercased, the form every store keeps.
    pub fn normalized(&self) -> Self {
        Self {
            symbol: normalize_symbol(&self.symbol),
            price: self.price,
            time: self.time,
        }
    }
}

/// Newest-first quotes per lowercase symbol.
pub type QuoteBatch = HashMap<String, Vec<QuoteRecord>>;

// =============================================================================
// Helpers
// =============================================================================

/// Lowercases a symbol; stores and lookups only ever see this form.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.to_lowercase()
}

/// Clamps a requested history depth to at least one record.
pub fn clamp_last(last: i64) -> usize {
    if last < 1 {
        1
    } else {
        usize::try_from(last).unwrap_or(usize::MAX)
    }
}
