//! Helpers for building SQLite queries.

/// Maximum number of bound values per `IN (...)` list.
///
/// SQLite builds may be compiled with a limit as low as 999 host parameters
/// (`SQLITE_MAX_VARIABLE_NUMBER`). 500 leaves room for the other parameters
/// of the statement.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Splits a slice into chunks that each fit in one `IN (...)` list.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

/// Returns `?, ?, ...` with one placeholder per item.
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
