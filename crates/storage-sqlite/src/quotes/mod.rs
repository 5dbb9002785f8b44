mod model;
mod repository;

pub use model::{NewQuoteRow, QuoteRow};
pub use repository::SqliteQuoteStore;
