//! In-memory storage implementation for Stockpile.
//!
//! The reference quote history backend: every symbol in a fixed allowlist
//! owns a newest-first log of quotes held behind one reader/writer lock.
//! Nothing survives the process.
//!
//! Writes follow [`WritePolicy::BestEffort`]: quotes for symbols outside the
//! allowlist are skipped and reported together after the rest are stored.
//!
//! [`WritePolicy::BestEffort`]: stockpile_core::quotes::WritePolicy::BestEffort

mod config;
mod store;

pub use config::MemoryStoreConfig;
pub use store::MemoryQuoteStore;
