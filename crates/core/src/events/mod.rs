//! Quote events module.
//!
//! Provides the event types emitted by the poller and the store backends, and
//! the sink trait they are emitted through. Hosts implement the sink to feed
//! metrics or other side channels; nothing is registered globally.

mod quote_event;
mod sink;

pub use quote_event::*;
pub use sink::*;
