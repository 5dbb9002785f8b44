//! Stockpile Core - quote history contracts, domain types and the poller.
//!
//! This crate is storage-agnostic. It defines the read/write traits that the
//! `storage-memory` and `storage-sqlite` crates implement, the external
//! quote source capability, and the scheduler that copies source output into
//! a store.

pub mod constants;
pub mod errors;
pub mod events;
pub mod quotes;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
