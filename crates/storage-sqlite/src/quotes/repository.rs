use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use diesel::sqlite::Sqlite;
use log::{debug, info};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;

use super::model::{NewQuoteRow, QuoteRow};
use crate::config::SqliteStoreConfig;
use crate::db::{create_pool, get_connection, init, spawn_writer, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::quotes::dsl as quotes_dsl;
use crate::utils::{chunk_for_sqlite, placeholders};
use stockpile_core::errors::{DatabaseError, Error, Result};
use stockpile_core::events::{QuoteEvent, QuoteEventSink};
use stockpile_core::quotes::{
    normalize_symbol, QuoteBatch, QuoteReader, QuoteRecord, QuoteWriter, WritePolicy,
};

/// Everything `close` releases.
struct Connections {
    pool: DbPool,
    writer: WriteHandle,
    writer_task: JoinHandle<()>,
}

/// Quote history in a single SQLite table.
///
/// Reads go through the connection pool; writes are serialized through the
/// writer task and each `set_quotes` call is one transaction.
pub struct SqliteQuoteStore {
    connections: RwLock<Option<Connections>>,
    /// Answered by a batch request that names no symbols.
    symbols: Vec<String>,
    database_file: PathBuf,
    events: Arc<dyn QuoteEventSink>,
}

impl SqliteQuoteStore {
    /// Opens a store on a freshly created database.
    ///
    /// Any database already at the configured path is deleted. Must be called
    /// from within a Tokio runtime, which hosts the writer task.
    pub fn new(config: SqliteStoreConfig, events: Arc<dyn QuoteEventSink>) -> Result<Self> {
        let config = config.sanitized();
        let db_url = init(&config.database_file)?;
        let pool = create_pool(&db_url, &config)?;
        let (writer, writer_task) = spawn_writer(&pool)?;

        info!(
            "Quote database ready at {} (max {} connections, {} idle)",
            db_url, config.max_connections, config.max_idle_connections
        );

        Ok(Self {
            connections: RwLock::new(Some(Connections {
                pool,
                writer,
                writer_task,
            })),
            symbols: unique_symbols(&config.symbols),
            database_file: config.database_file,
            events,
        })
    }

    pub fn database_file(&self) -> &Path {
        &self.database_file
    }

    fn pool(&self) -> Result<DbPool> {
        self.connections
            .read()
            .map_err(|e| Error::Unexpected(format!("Quote store lock poisoned: {}", e)))?
            .as_ref()
            .map(|c| c.pool.clone())
            .ok_or(Error::Closed)
    }

    fn writer(&self) -> Result<WriteHandle> {
        self.connections
            .read()
            .map_err(|e| Error::Unexpected(format!("Quote store lock poisoned: {}", e)))?
            .as_ref()
            .map(|c| c.writer.clone())
            .ok_or(Error::Closed)
    }
}

/// Lowercases symbols and drops repeats, keeping first-seen order.
fn unique_symbols<S: AsRef<str>>(symbols: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(symbols.len());
    symbols
        .iter()
        .map(|s| normalize_symbol(s.as_ref()))
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

impl QuoteReader for SqliteQuoteStore {
    /// Fails with `NotFound` whenever no rows match, whether or not the
    /// symbol is configured.
    fn get_quotes(&self, symbol: &str, last: i64) -> Result<Vec<QuoteRecord>> {
        let symbol = normalize_symbol(symbol);
        let pool = self.pool()?;
        let mut conn = get_connection(&pool)?;

        let rows = quotes_dsl::quotes
            .filter(quotes_dsl::symbol.eq(&symbol))
            .order(quotes_dsl::id.desc())
            .limit(last.max(1))
            .select(QuoteRow::as_select())
            .load::<QuoteRow>(&mut conn)
            .into_core()?;

        if rows.is_empty() {
            return Err(Error::NotFound(symbol));
        }
        Ok(rows.into_iter().map(QuoteRecord::from).collect())
    }

    /// Requested symbols without rows are left out of the map. Only an
    /// entirely empty result is `NotFound`, so unknown symbols do not abort
    /// the call.
    fn get_quotes_batch(&self, symbols: &[String], last: i64) -> Result<QuoteBatch> {
        let requested = if symbols.is_empty() {
            self.symbols.clone()
        } else {
            unique_symbols(symbols)
        };
        let last = last.max(1);
        let pool = self.pool()?;
        let mut conn = get_connection(&pool)?;

        let mut batch = QuoteBatch::new();
        for chunk in chunk_for_sqlite(&requested) {
            let sql = format!(
                "WITH ranked_quotes AS ( \
                    SELECT \
                        id, symbol, price, datetime, \
                        ROW_NUMBER() OVER (PARTITION BY symbol ORDER BY id DESC) AS rn \
                    FROM quotes WHERE symbol IN ({}) \
                ) \
                SELECT id, symbol, price, datetime \
                FROM ranked_quotes \
                WHERE rn <= ? \
                ORDER BY symbol, rn",
                placeholders(chunk.len())
            );

            let mut query_builder = sql_query(sql).into_boxed::<Sqlite>();
            for symbol in chunk {
                query_builder = query_builder.bind::<Text, _>(symbol.as_str());
            }
            query_builder = query_builder.bind::<BigInt, _>(last);

            let rows: Vec<QuoteRow> = query_builder.load::<QuoteRow>(&mut conn).into_core()?;
            for row in rows {
                batch
                    .entry(row.symbol.clone())
                    .or_default()
                    .push(QuoteRecord::from(row));
            }
        }

        if batch.is_empty() {
            return Err(Error::NotFound(format!(
                "no quotes for any of {} requested symbols",
                requested.len()
            )));
        }
        Ok(batch)
    }
}

#[async_trait]
impl QuoteWriter for SqliteQuoteStore {
    fn write_policy(&self) -> WritePolicy {
        WritePolicy::Atomic
    }

    async fn set_quotes(&self, input_quotes: &[QuoteRecord]) -> Result<()> {
        let writer = self.writer()?;
        if input_quotes.is_empty() {
            return Ok(());
        }

        let rows: Vec<NewQuoteRow> = input_quotes.iter().map(NewQuoteRow::from).collect();
        let stored = writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                for row in &rows {
                    diesel::insert_into(quotes_dsl::quotes)
                        .values(row)
                        .execute(conn)
                        .map_err(|e| {
                            Error::Database(DatabaseError::QueryFailed(format!(
                                "inserting {} quote at {}: {}",
                                row.symbol, row.datetime, e
                            )))
                        })?;
                }
                Ok(rows.len())
            })
            .await?;

        debug!("Stored {} quotes", stored);
        self.events.emit(QuoteEvent::QuotesStored { count: stored });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let connections = self
            .connections
            .write()
            .map_err(|e| Error::Unexpected(format!("Quote store lock poisoned: {}", e)))?
            .take();

        let Some(Connections {
            pool,
            writer,
            writer_task,
        }) = connections
        else {
            return Ok(());
        };

        // The task exits once its last handle is gone, returning its connection.
        drop(writer);
        writer_task
            .await
            .map_err(|e| Error::Unexpected(format!("writer task failed: {}", e)))?;
        drop(pool);

        info!("Closed quote database {}", self.database_file.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use diesel::connection::SimpleConnection;
    use stockpile_core::events::{MockQuoteEventSink, NoOpQuoteEventSink};
    use tempfile::tempdir;

    fn t(offset_secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, 4, 14, 30, 0).unwrap() + Duration::seconds(offset_secs)
    }

    fn quote(symbol: &str, price: f64, offset_secs: i64) -> QuoteRecord {
        QuoteRecord::new(symbol, price, t(offset_secs))
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn test_config(temp_dir: &tempfile::TempDir) -> SqliteStoreConfig {
        SqliteStoreConfig::default().with_database_file(temp_dir.path().join("quotes.sqlite"))
    }

    /// Creates a store on a temp database.
    /// Returns the store, its event sink and the temp dir (to keep it alive).
    fn create_test_store() -> (SqliteQuoteStore, MockQuoteEventSink, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let sink = MockQuoteEventSink::new();
        let store = SqliteQuoteStore::new(test_config(&temp_dir), Arc::new(sink.clone()))
            .expect("Failed to create store");
        (store, sink, temp_dir)
    }

    #[tokio::test]
    async fn test_get_quotes_returns_newest_first() {
        let (store, _sink, _temp_dir) = create_test_store();
        store
            .set_quotes(&[
                quote("fb", 123.45, 0),
                quote("fb", 123.42, 1),
                quote("fb", 123.40, 2),
            ])
            .await
            .unwrap();

        let actual = store.get_quotes("fb", 2).unwrap();
        assert_eq!(actual, vec![quote("fb", 123.40, 2), quote("fb", 123.42, 1)]);
    }

    #[tokio::test]
    async fn test_get_quotes_clamps_depth() {
        let (store, _sink, _temp_dir) = create_test_store();
        store
            .set_quotes(&[quote("fb", 123.45, 0), quote("fb", 123.42, 0)])
            .await
            .unwrap();

        assert_eq!(store.get_quotes("fb", 0).unwrap(), vec![quote("fb", 123.42, 0)]);
        assert_eq!(store.get_quotes("fb", -7).unwrap().len(), 1);
        assert_eq!(store.get_quotes("fb", 50).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_quotes_orders_by_insertion_not_time() {
        let (store, _sink, _temp_dir) = create_test_store();
        store.set_quotes(&[quote("fb", 2.0, 60)]).await.unwrap();
        store.set_quotes(&[quote("fb", 1.0, 0)]).await.unwrap();

        let actual = store.get_quotes("fb", 5).unwrap();
        assert_eq!(actual, vec![quote("fb", 1.0, 0), quote("fb", 2.0, 60)]);
    }

    #[tokio::test]
    async fn test_get_quotes_without_rows_is_not_found() {
        let (store, _sink, _temp_dir) = create_test_store();

        assert!(store.get_quotes("doesnotexist", 1).unwrap_err().is_not_found());
        assert!(store.get_quotes("fb", 1).unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_symbols_are_case_insensitive() {
        let (store, _sink, _temp_dir) = create_test_store();
        store.set_quotes(&[quote("FB", 123.45, 0)]).await.unwrap();

        assert_eq!(store.get_quotes("Fb", 1).unwrap(), vec![quote("fb", 123.45, 0)]);
    }

    #[tokio::test]
    async fn test_timestamps_round_trip_as_utc() {
        let (store, _sink, _temp_dir) = create_test_store();
        let observed = DateTime::parse_from_rfc3339("2021-03-04T10:30:00.123456789-05:00")
            .unwrap()
            .with_timezone(&Utc);
        store
            .set_quotes(&[QuoteRecord::new("fb", 123.45, observed)])
            .await
            .unwrap();

        let actual = store.get_quotes("fb", 1).unwrap();
        assert_eq!(actual[0].time, observed);
        assert_eq!(
            actual[0].time.to_rfc3339(),
            "2021-03-04T15:30:00.123456789+00:00"
        );
    }

    #[tokio::test]
    async fn test_get_quotes_batch() {
        let (store, _sink, _temp_dir) = create_test_store();
        store
            .set_quotes(&[
                quote("fb", 123.45, 0),
                quote("fb", 123.42, 1),
                quote("fb", 123.40, 2),
                quote("goog", 234.56, 0),
                quote("goog", 234.51, 1),
            ])
            .await
            .unwrap();

        let batch = store.get_quotes_batch(&symbols(&["fb", "goog"]), 2).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(
            batch["fb"],
            vec![quote("fb", 123.40, 2), quote("fb", 123.42, 1)]
        );
        assert_eq!(
            batch["goog"],
            vec![quote("goog", 234.51, 1), quote("goog", 234.56, 0)]
        );
    }

    #[tokio::test]
    async fn test_get_quotes_batch_omits_symbols_without_rows() {
        let (store, _sink, _temp_dir) = create_test_store();
        store.set_quotes(&[quote("fb", 123.45, 0)]).await.unwrap();

        let batch = store
            .get_quotes_batch(&symbols(&["fb", "goog", "doesnotexist"]), 1)
            .unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch["fb"], vec![quote("fb", 123.45, 0)]);
    }

    #[tokio::test]
    async fn test_get_quotes_batch_empty_result_is_not_found() {
        let (store, _sink, _temp_dir) = create_test_store();
        store.set_quotes(&[quote("fb", 123.45, 0)]).await.unwrap();

        let err = store
            .get_quotes_batch(&symbols(&["goog", "doesnotexist"]), 1)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_quotes_batch_defaults_to_configured_symbols() {
        let temp_dir = tempdir().unwrap();
        let config = test_config(&temp_dir).with_symbols(["FB", "aapl"]);
        let store = SqliteQuoteStore::new(config, Arc::new(NoOpQuoteEventSink)).unwrap();
        store
            .set_quotes(&[
                quote("fb", 123.45, 0),
                quote("aapl", 130.0, 0),
                quote("goog", 234.56, 0),
            ])
            .await
            .unwrap();

        let batch = store.get_quotes_batch(&[], 1).unwrap();

        let mut keys: Vec<_> = batch.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, symbols(&["aapl", "fb"]));
    }

    #[tokio::test]
    async fn test_get_quotes_batch_spans_chunks() {
        let temp_dir = tempdir().unwrap();
        let many: Vec<String> = (0..1200).map(|i| format!("sym{}", i)).collect();
        let config = test_config(&temp_dir).with_symbols(many);
        let store = SqliteQuoteStore::new(config, Arc::new(NoOpQuoteEventSink)).unwrap();
        store
            .set_quotes(&[quote("sym0", 1.0, 0), quote("sym1199", 2.0, 0)])
            .await
            .unwrap();

        let batch = store.get_quotes_batch(&[], 3).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch["sym0"], vec![quote("sym0", 1.0, 0)]);
        assert_eq!(batch["sym1199"], vec![quote("sym1199", 2.0, 0)]);
    }

    #[tokio::test]
    async fn test_set_quotes_is_atomic() {
        let (store, sink, _temp_dir) = create_test_store();
        {
            let pool = store.pool().unwrap();
            let mut conn = get_connection(&pool).unwrap();
            conn.batch_execute(
                "CREATE TRIGGER reject_negative_price BEFORE INSERT ON quotes \
                 WHEN NEW.price < 0 \
                 BEGIN SELECT RAISE(ABORT, 'negative price'); END;",
            )
            .unwrap();
        }

        let err = store
            .set_quotes(&[
                quote("fb", 123.45, 0),
                quote("fb", -1.0, 1),
                quote("goog", 234.56, 0),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Database(DatabaseError::QueryFailed(_))));
        assert!(store.get_quotes("fb", 5).unwrap_err().is_not_found());
        assert!(store.get_quotes("goog", 5).unwrap_err().is_not_found());
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_set_quotes_has_no_allowlist() {
        let (store, sink, _temp_dir) = create_test_store();
        store
            .set_quotes(&[quote("tsla", 700.0, 0), quote("tsla", 700.0, 0)])
            .await
            .unwrap();

        assert_eq!(store.get_quotes("tsla", 5).unwrap().len(), 2);
        assert_eq!(sink.events(), vec![QuoteEvent::QuotesStored { count: 2 }]);
    }

    #[tokio::test]
    async fn test_write_policy_is_atomic() {
        let (store, _sink, _temp_dir) = create_test_store();
        assert_eq!(store.write_policy(), WritePolicy::Atomic);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_rejects_later_calls() {
        let (store, _sink, _temp_dir) = create_test_store();
        store.set_quotes(&[quote("fb", 123.45, 0)]).await.unwrap();

        store.close().await.unwrap();
        store.close().await.unwrap();

        assert!(matches!(store.get_quotes("fb", 1), Err(Error::Closed)));
        assert!(matches!(store.get_quotes_batch(&[], 1), Err(Error::Closed)));
        assert!(matches!(store.set_quotes(&[]).await, Err(Error::Closed)));
    }

    #[tokio::test]
    async fn test_reopen_starts_empty() {
        let temp_dir = tempdir().unwrap();
        let store = SqliteQuoteStore::new(test_config(&temp_dir), Arc::new(NoOpQuoteEventSink))
            .unwrap();
        store.set_quotes(&[quote("fb", 123.45, 0)]).await.unwrap();
        store.close().await.unwrap();

        let reopened =
            SqliteQuoteStore::new(test_config(&temp_dir), Arc::new(NoOpQuoteEventSink)).unwrap();

        assert_eq!(reopened.database_file(), store.database_file());
        assert!(reopened.get_quotes("fb", 1).unwrap_err().is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reads_during_writes() {
        let (store, _sink, _temp_dir) = create_test_store();
        let store = Arc::new(store);

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 0..50 {
                    store.set_quotes(&[quote("fb", i as f64, i)]).await.unwrap();
                }
            })
        };
        let readers: Vec<_> = (0..3)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::task::spawn_blocking(move || {
                    for _ in 0..50 {
                        match store.get_quotes("fb", 10) {
                            Ok(quotes) => {
                                assert!(quotes.windows(2).all(|w| w[0].price > w[1].price))
                            }
                            Err(e) => assert!(e.is_not_found()),
                        }
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(store.get_quotes("fb", 100).unwrap().len(), 50);
    }
}
