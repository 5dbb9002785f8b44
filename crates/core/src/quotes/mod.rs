//! Quote history module.
//!
//! - [`model`] - The quote record and batch types
//! - [`store`] - Read/write traits implemented by every storage backend
//! - [`source`] - The external quote source capability
//! - [`poller`] - Timer-driven task copying source output into a store
//!
//! ```text
//! QuotePoller → QuoteSource (external)
//!      ↓
//! QuoteWriter ← storage-memory / storage-sqlite → QuoteReader → presentation
//! ```

pub mod model;
pub mod poller;
pub mod source;
pub mod store;

pub use model::{clamp_last, normalize_symbol, QuoteBatch, QuoteRecord};
pub use poller::{PollerConfig, QuotePoller, WriteRetry};
pub use source::QuoteSource;
pub use store::{QuoteReader, QuoteStore, QuoteWriter, WritePolicy};
