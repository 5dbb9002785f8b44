use log::warn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use stockpile_core::constants::default_symbols;

/// Database file used when none is configured.
pub const DEFAULT_DATABASE_FILE: &str = "stockpile.sqlite";

pub const DEFAULT_MAX_IDLE_CONNECTIONS: u32 = 2;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;

/// The writer task keeps one connection for itself; readers need another.
const MIN_CONNECTIONS: u32 = 2;

/// Settings for [`crate::SqliteQuoteStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteStoreConfig {
    /// Database file. Any existing file at this path is replaced on open.
    pub database_file: PathBuf,
    /// Symbols answered by a batch request that names none.
    pub symbols: Vec<String>,
    /// Connections the pool keeps open while idle.
    pub max_idle_connections: u32,
    /// Upper bound on pooled connections, the writer's included.
    pub max_connections: u32,
    /// Maximum age of a pooled connection. `None` keeps connections forever.
    pub max_connection_lifetime: Option<Duration>,
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            database_file: PathBuf::from(DEFAULT_DATABASE_FILE),
            symbols: default_symbols(),
            max_idle_connections: DEFAULT_MAX_IDLE_CONNECTIONS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_connection_lifetime: None,
        }
    }
}

impl SqliteStoreConfig {
    pub fn with_database_file(mut self, database_file: impl Into<PathBuf>) -> Self {
        self.database_file = database_file.into();
        self
    }

    pub fn with_symbols<S: Into<String>>(mut self, symbols: impl IntoIterator<Item = S>) -> Self {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_idle_connections(mut self, max_idle_connections: u32) -> Self {
        self.max_idle_connections = max_idle_connections;
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_max_connection_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.max_connection_lifetime = lifetime;
        self
    }

    /// Replaces values the pool cannot work with, warning about each one.
    pub(crate) fn sanitized(mut self) -> Self {
        if self.database_file.as_os_str().is_empty() {
            warn!(
                "Empty database file configured, using {}",
                DEFAULT_DATABASE_FILE
            );
            self.database_file = PathBuf::from(DEFAULT_DATABASE_FILE);
        }
        if self.max_connections == 0 {
            warn!(
                "Zero max_connections configured, using {}",
                DEFAULT_MAX_CONNECTIONS
            );
            self.max_connections = DEFAULT_MAX_CONNECTIONS;
        } else if self.max_connections < MIN_CONNECTIONS {
            warn!(
                "max_connections {} is too small, using {}",
                self.max_connections, MIN_CONNECTIONS
            );
            self.max_connections = MIN_CONNECTIONS;
        }
        if self.max_idle_connections == 0 {
            warn!(
                "Zero max_idle_connections configured, using {}",
                DEFAULT_MAX_IDLE_CONNECTIONS
            );
            self.max_idle_connections = DEFAULT_MAX_IDLE_CONNECTIONS;
        }
        if self.max_idle_connections > self.max_connections {
            warn!(
                "max_idle_connections {} exceeds max_connections, using {}",
                self.max_idle_connections, self.max_connections
            );
            self.max_idle_connections = self.max_connections;
        }
        if self.max_connection_lifetime == Some(Duration::ZERO) {
            warn!("Zero max_connection_lifetime configured, keeping connections forever");
            self.max_connection_lifetime = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SqliteStoreConfig::default();
        assert_eq!(config.database_file, PathBuf::from("stockpile.sqlite"));
        assert_eq!(config.symbols, default_symbols());
        assert_eq!(config.max_idle_connections, 2);
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.max_connection_lifetime, None);
        assert_eq!(config.clone().sanitized(), config);
    }

    #[test]
    fn sanitized_corrects_unusable_values() {
        let config = SqliteStoreConfig::default()
            .with_database_file("")
            .with_max_connections(0)
            .with_max_idle_connections(0)
            .with_max_connection_lifetime(Some(Duration::ZERO))
            .sanitized();

        assert_eq!(config.database_file, PathBuf::from(DEFAULT_DATABASE_FILE));
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.max_idle_connections, DEFAULT_MAX_IDLE_CONNECTIONS);
        assert_eq!(config.max_connection_lifetime, None);
    }

    #[test]
    fn single_connection_leaves_room_for_readers() {
        let config = SqliteStoreConfig::default()
            .with_max_connections(1)
            .with_max_idle_connections(5)
            .sanitized();

        assert_eq!(config.max_connections, 2);
        assert_eq!(config.max_idle_connections, 2);
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let config: SqliteStoreConfig =
            serde_json::from_str(r#"{"database_file": "/tmp/quotes.sqlite"}"#).unwrap();
        assert_eq!(config.database_file, PathBuf::from("/tmp/quotes.sqlite"));
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }
}
