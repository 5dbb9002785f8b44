//! Database models for quotes.

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;

use stockpile_core::quotes::QuoteRecord;

/// A stored quote. `id` orders rows by insertion.
#[derive(Queryable, Selectable, QueryableByName, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::quotes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct QuoteRow {
    pub id: i64,
    pub symbol: String,
    pub price: f64,
    /// UTC wall-clock time of the observation.
    pub datetime: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::quotes)]
pub struct NewQuoteRow {
    pub symbol: String,
    pub price: f64,
    pub datetime: NaiveDateTime,
}

impl From<&QuoteRecord> for NewQuoteRow {
    fn from(quote: &QuoteRecord) -> Self {
        let quote = quote.normalized();
        Self {
            symbol: quote.symbol,
            price: quote.price,
            datetime: quote.time.naive_utc(),
        }
    }
}

impl From<QuoteRow> for QuoteRecord {
    fn from(row: QuoteRow) -> Self {
        QuoteRecord::new(
            row.symbol,
            row.price,
            DateTime::<Utc>::from_naive_utc_and_offset(row.datetime, Utc),
        )
    }
}
