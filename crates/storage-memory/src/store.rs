use async_trait::async_trait;
use log::{debug, warn};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use stockpile_core::events::{NoOpQuoteEventSink, QuoteEvent, QuoteEventSink};
use stockpile_core::quotes::{
    clamp_last, normalize_symbol, QuoteBatch, QuoteReader, QuoteRecord, QuoteWriter, WritePolicy,
};
use stockpile_core::{Error, Result};

use crate::config::MemoryStoreConfig;

type QuoteLogs = HashMap<String, VecDeque<QuoteRecord>>;

/// Quote history kept in process memory.
///
/// Each allowlisted symbol maps to a log with the newest quote at the front.
/// Reads share the lock, writes take it exclusively, so the store can be used
/// from any number of tasks at once.
pub struct MemoryQuoteStore {
    quotes: RwLock<QuoteLogs>,
    /// Allowlist in configuration order, answered by an empty batch request.
    symbols: Vec<String>,
    closed: AtomicBool,
    events: Arc<dyn QuoteEventSink>,
}

impl Default for MemoryQuoteStore {
    fn default() -> Self {
        Self::new(MemoryStoreConfig::default(), Arc::new(NoOpQuoteEventSink))
    }
}

impl MemoryQuoteStore {
    pub fn new(config: MemoryStoreConfig, events: Arc<dyn QuoteEventSink>) -> Self {
        let mut symbols: Vec<String> = Vec::with_capacity(config.symbols.len());
        let mut quotes = QuoteLogs::with_capacity(config.symbols.len());

        for symbol in &config.symbols {
            let symbol = normalize_symbol(symbol);
            if !quotes.contains_key(&symbol) {
                quotes.insert(symbol.clone(), VecDeque::new());
                symbols.push(symbol);
            }
        }
        debug!("Memory quote store tracking {} symbols", symbols.len());

        Self {
            quotes: RwLock::new(quotes),
            symbols,
            closed: AtomicBool::new(false),
            events,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, QuoteLogs>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        self.quotes
            .read()
            .map_err(|e| Error::Unexpected(format!("Quote store lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, QuoteLogs>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        self.quotes
            .write()
            .map_err(|e| Error::Unexpected(format!("Quote store lock poisoned: {}", e)))
    }
}

/// Copies the newest `last` quotes out of a log.
fn newest(log: &VecDeque<QuoteRecord>, last: usize) -> Vec<QuoteRecord> {
    log.iter().take(last).cloned().collect()
}

impl QuoteReader for MemoryQuoteStore {
    fn get_quotes(&self, symbol: &str, last: i64) -> Result<Vec<QuoteRecord>> {
        let quotes = self.read()?;
        let log = quotes
            .get(&normalize_symbol(symbol))
            .ok_or_else(|| Error::NotFound(symbol.to_string()))?;

        Ok(newest(log, clamp_last(last)))
    }

    /// Fails with `NotFound` as soon as one requested symbol is outside the
    /// allowlist; no partial map is ever returned.
    fn get_quotes_batch(&self, symbols: &[String], last: i64) -> Result<QuoteBatch> {
        let symbols = if symbols.is_empty() {
            &self.symbols
        } else {
            symbols
        };
        let last = clamp_last(last);
        let quotes = self.read()?;

        let mut batch = QuoteBatch::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = normalize_symbol(symbol);
            let log = quotes
                .get(&symbol)
                .ok_or_else(|| Error::NotFound(symbol.clone()))?;
            if log.is_empty() {
                continue;
            }
            batch.insert(symbol, newest(log, last));
        }

        Ok(batch)
    }
}

#[async_trait]
impl QuoteWriter for MemoryQuoteStore {
    fn write_policy(&self) -> WritePolicy {
        WritePolicy::BestEffort
    }

    async fn set_quotes(&self, input_quotes: &[QuoteRecord]) -> Result<()> {
        let mut rejected: Vec<String> = Vec::new();
        let mut stored = 0;

        {
            let mut quotes = self.write()?;
            for quote in input_quotes {
                let quote = quote.normalized();
                match quotes.get_mut(&quote.symbol) {
                    Some(log) => {
                        log.push_front(quote);
                        stored += 1;
                    }
                    None => rejected.push(quote.symbol),
                }
            }
        }

        if stored > 0 {
            self.events.emit(QuoteEvent::QuotesStored { count: stored });
        }
        if rejected.is_empty() {
            return Ok(());
        }

        warn!(
            "Skipped {} quotes for unknown symbols: {:?}",
            rejected.len(),
            rejected
        );
        self.events.emit(QuoteEvent::QuotesRejected {
            symbols: rejected.clone(),
        });
        Err(Error::UnknownSymbols(rejected))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Ok(mut quotes) = self.quotes.write() {
            quotes.clear();
        }
        debug!("Memory quote store closed");
        Ok(())
    }
}
