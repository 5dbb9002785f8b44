use std::time::Duration;

/// Symbols tracked when no allowlist is configured.
pub const DEFAULT_SYMBOLS: &[&str] = &["fb", "amzn", "aapl", "nflx", "goog"];

/// Interval between two polls of the quote source.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Returns `DEFAULT_SYMBOLS` as owned strings.
pub fn default_symbols() -> Vec<String> {
    DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
}
