use log::{debug, info};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use diesel::connection::{Connection, SimpleConnection};
use diesel::r2d2::{self, ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;

use crate::config::SqliteStoreConfig;
use crate::errors::IntoCore;
use stockpile_core::errors::{DatabaseError, Error, Result};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

pub mod write_actor;
pub use write_actor::{spawn_writer, WriteHandle};

const CREATE_QUOTES_TABLE: &str = "
    CREATE TABLE quotes (
        id INTEGER NOT NULL CONSTRAINT quotes_pk PRIMARY KEY AUTOINCREMENT,
        symbol TEXT NOT NULL,
        price REAL NOT NULL,
        datetime TIMESTAMP NOT NULL
    );
";

/// Creates a fresh database at `path` and returns the path as a connection URL.
///
/// Any existing database file (and its WAL/SHM companions) is removed first;
/// quote history never survives a restart.
pub fn init(path: &Path) -> Result<String> {
    let db_url = path
        .to_str()
        .ok_or_else(|| {
            DatabaseError::InitializationFailed(format!(
                "database path {} is not valid UTF-8",
                path.display()
            ))
        })?
        .to_string();

    if let Some(db_dir) = path.parent() {
        if !db_dir.as_os_str().is_empty() && !db_dir.exists() {
            fs::create_dir_all(db_dir)?;
        }
    }

    for file in [
        db_url.clone(),
        format!("{}-wal", db_url),
        format!("{}-shm", db_url),
    ] {
        remove_if_exists(Path::new(&file))?;
    }

    let mut conn = SqliteConnection::establish(&db_url).into_core()?;
    conn.batch_execute("PRAGMA journal_mode = WAL;").into_core()?;
    conn.batch_execute(CREATE_QUOTES_TABLE).map_err(|e| {
        Error::Database(DatabaseError::InitializationFailed(format!(
            "creating quotes table: {}",
            e
        )))
    })?;

    info!("Initialized quote database at {}", db_url);
    Ok(db_url)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Database(DatabaseError::InitializationFailed(
            format!("removing {}: {}", path.display(), e),
        ))),
    }
}

/// Builds the connection pool described by `config` over an initialized database.
pub fn create_pool(db_url: &str, config: &SqliteStoreConfig) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(db_url);
    Pool::builder()
        .max_size(config.max_connections)
        .min_idle(Some(config.max_idle_connections))
        .max_lifetime(config.max_connection_lifetime)
        .connection_timeout(Duration::from_secs(30))
        .connection_customizer(Box::new(ConnectionCustomizer))
        .build(manager)
        .map_err(|e| Error::Database(DatabaseError::PoolCreationFailed(e.to_string())))
}

/// Gets a connection from the pool
pub fn get_connection(pool: &DbPool) -> Result<DbConnection> {
    pool.get().into_core()
}

#[derive(Debug)]
struct ConnectionCustomizer;

impl r2d2::CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), r2d2::Error> {
        conn.batch_execute(
            "
            PRAGMA busy_timeout = 30000;
            PRAGMA synchronous = NORMAL;
        ",
        )
        .map_err(r2d2::Error::QueryError)
    }
}
