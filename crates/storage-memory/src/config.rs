use serde::{Deserialize, Serialize};
use stockpile_core::constants::default_symbols;

/// Settings for [`crate::MemoryQuoteStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStoreConfig {
    /// Symbol allowlist. Only these symbols can ever hold quotes.
    pub symbols: Vec<String>,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
        }
    }
}

impl MemoryStoreConfig {
    pub fn with_symbols<S: Into<String>>(mut self, symbols: impl IntoIterator<Item = S>) -> Self {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }
}
