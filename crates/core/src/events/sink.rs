//! Quote event sink trait and implementations.

use std::sync::{Arc, Mutex};

use super::QuoteEvent;

/// Trait for receiving quote events.
///
/// The poller and the store backends take a sink at construction time and
/// emit through it after each fetch, write or rejection.
///
/// # Design Rules
///
/// - `emit()` must be fast and non-blocking (no network calls, no DB writes)
/// - Failure to emit must not affect polling or storage (best-effort)
pub trait QuoteEventSink: Send + Sync {
    /// Emit a single quote event.
    fn emit(&self, event: QuoteEvent);

    /// Emit multiple quote events.
    ///
    /// Default implementation calls `emit()` for each event.
    fn emit_batch(&self, events: Vec<QuoteEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

/// No-op implementation for tests or hosts that don't collect events.
#[derive(Clone, Default)]
pub struct NoOpQuoteEventSink;

impl QuoteEventSink for NoOpQuoteEventSink {
    fn emit(&self, _event: QuoteEvent) {}
}

/// Mock sink for testing - collects emitted events.
#[derive(Clone, Default)]
pub struct MockQuoteEventSink {
    events: Arc<Mutex<Vec<QuoteEvent>>>,
}

impl MockQuoteEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    pub fn events(&self) -> Vec<QuoteEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Returns the number of collected events.
    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    /// Returns true if no events have been collected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl QuoteEventSink for MockQuoteEventSink {
    fn emit(&self, event: QuoteEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_sink_collects_in_emit_order() {
        let sink = MockQuoteEventSink::new();
        assert!(sink.is_empty());

        sink.emit(QuoteEvent::QuotesFetched { count: 2 });
        sink.emit_batch(vec![
            QuoteEvent::QuotesStored { count: 2 },
            QuoteEvent::PollerStopped,
        ]);

        assert_eq!(
            sink.events(),
            vec![
                QuoteEvent::QuotesFetched { count: 2 },
                QuoteEvent::QuotesStored { count: 2 },
                QuoteEvent::PollerStopped,
            ]
        );
        assert_eq!(sink.len(), 3);
    }
}
