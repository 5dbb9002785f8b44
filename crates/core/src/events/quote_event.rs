//! Quote event types.

use serde::{Deserialize, Serialize};

/// Facts about polling and storage activity.
///
/// Events describe what already happened; emitting one never changes the
/// outcome of the operation that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuoteEvent {
    /// The source returned a batch of quotes.
    QuotesFetched { count: usize },

    /// The source call failed; the tick is skipped.
    FetchFailed { message: String },

    /// A backend accepted quotes.
    QuotesStored { count: usize },

    /// A best-effort backend skipped quotes for symbols outside its allowlist.
    QuotesRejected { symbols: Vec<String> },

    /// Writing a fetched batch failed.
    WriteFailed { message: String },

    /// The poller observed cancellation and stopped.
    PollerStopped,
}

impl QuoteEvent {
    /// Creates a FetchFailed event from any displayable error.
    pub fn fetch_failed(err: impl std::fmt::Display) -> Self {
        Self::FetchFailed {
            message: err.to_string(),
        }
    }

    /// Creates a WriteFailed event from any displayable error.
    pub fn write_failed(err: impl std::fmt::Display) -> Self {
        Self::WriteFailed {
            message: err.to_string(),
        }
    }
}
