//! Utility functions for SQLite storage operations.

use chrono::{DateTime, Utc};

/// Upper bound on bound parameters per statement.
///
/// SQLite builds compiled with the historical default reject statements with
/// more than 999 parameters. Staying under it keeps batch inserts portable.
pub const SQLITE_MAX_PARAMS: usize = 999;

/// Chunk rows for a multi-row INSERT so that `columns * rows` never exceeds
/// [`SQLITE_MAX_PARAMS`].
pub fn chunk_rows_for_sqlite<T>(rows: &[T], columns: usize) -> impl Iterator<Item = &[T]> {
    let per_chunk = (SQLITE_MAX_PARAMS / columns.max(1)).max(1);
    rows.chunks(per_chunk)
}

/// Timestamps are stored as RFC 3339 text with full sub-second precision.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339()
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}
