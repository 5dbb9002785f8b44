//! Quote poller.
//!
//! Copies quotes from a [`QuoteSource`] into a [`QuoteWriter`] on a fixed
//! interval until cancelled. The loop is sequential: a fetch and the write
//! that follows it block the task for their whole duration, and cancellation
//! is only observed while waiting for the next tick.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::source::QuoteSource;
use super::store::QuoteWriter;
use crate::constants::{default_symbols, DEFAULT_POLL_INTERVAL};
use crate::events::{QuoteEvent, QuoteEventSink};

// =============================================================================
// Configuration
// =============================================================================

/// What the poller does after a failed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteRetry {
    /// Wait for the next tick before fetching again.
    #[default]
    NextTick,
    /// Fetch again straight away without waiting for a tick. A writer that
    /// keeps failing turns this into a tight loop; it only ends once the
    /// cancellation token fires.
    Immediate,
}

/// Poller settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Time between two fetches. Zero falls back to one minute.
    pub interval: Duration,
    /// Symbols requested from the source on every tick.
    pub symbols: Vec<String>,
    pub write_retry: WriteRetry,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            symbols: default_symbols(),
            write_retry: WriteRetry::default(),
        }
    }
}

impl PollerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_symbols<S: Into<String>>(mut self, symbols: impl IntoIterator<Item = S>) -> Self {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_write_retry(mut self, write_retry: WriteRetry) -> Self {
        self.write_retry = write_retry;
        self
    }

    /// Interval with invalid values replaced by the default.
    ///
    /// Zero is invalid, and so is any interval too long to schedule the next
    /// two ticks from now.
    fn effective_interval(&self) -> Duration {
        let schedulable = self
            .interval
            .checked_mul(2)
            .and_then(|span| Instant::now().checked_add(span))
            .is_some();
        if self.interval.is_zero() || !schedulable {
            warn!(
                "Invalid poll interval {:?}; using default {:?}",
                self.interval, DEFAULT_POLL_INTERVAL
            );
            DEFAULT_POLL_INTERVAL
        } else {
            self.interval
        }
    }
}

// =============================================================================
// Quote Poller
// =============================================================================

/// Timer-driven bridge between a quote source and a quote writer.
///
/// Fetch and write errors are logged and reported to the event sink, never
/// returned: only cancellation stops [`QuotePoller::poll`].
pub struct QuotePoller {
    source: Arc<dyn QuoteSource>,
    writer: Arc<dyn QuoteWriter>,
    events: Arc<dyn QuoteEventSink>,
}

impl QuotePoller {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        writer: Arc<dyn QuoteWriter>,
        events: Arc<dyn QuoteEventSink>,
    ) -> Self {
        Self {
            source,
            writer,
            events,
        }
    }

    /// Polls until `cancel` fires.
    ///
    /// The first fetch happens immediately. If a tick is missed because a
    /// fetch or write ran long, exactly one catch-up poll follows; ticks are
    /// never queued up.
    pub async fn poll(&self, cancel: CancellationToken, config: PollerConfig) {
        if config.symbols.is_empty() {
            warn!("No symbols to poll");
            return;
        }
        let period = config.effective_interval();

        info!("Polling interval: {:?}", period);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if !self.poll_once(&config.symbols).await
                && config.write_retry == WriteRetry::Immediate
            {
                if cancel.is_cancelled() {
                    break;
                }
                // A source and writer that never suspend would otherwise
                // starve whichever task is meant to cancel us.
                tokio::task::yield_now().await;
                continue;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
        }

        debug!("Stopping poller");
        self.events.emit(QuoteEvent::PollerStopped);
    }

    /// Runs one fetch-then-write step. Returns false only when the write failed.
    async fn poll_once(&self, symbols: &[String]) -> bool {
        let quotes = match self.source.fetch(symbols).await {
            Ok(quotes) => quotes,
            Err(e) => {
                error!("Polling quote source: {}", e);
                self.events.emit(QuoteEvent::fetch_failed(&e));
                return true;
            }
        };

        debug!("Received {} quotes: {:?}", quotes.len(), quotes);
        self.events.emit(QuoteEvent::QuotesFetched {
            count: quotes.len(),
        });

        match self.writer.set_quotes(&quotes).await {
            Ok(()) => {
                debug!("Stored {} quotes", quotes.len());
                true
            }
            Err(e) => {
                error!("Updating quote history: {}", e);
                self.events.emit(QuoteEvent::write_failed(&e));
                false
            }
        }
    }
}
