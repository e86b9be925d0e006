//! Database model for exclusion entries.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use signalgate_core::exclusions::ExclusionEntry;
use signalgate_market_data::Symbol;

use crate::errors::StorageError;
use crate::utils::{format_timestamp, parse_timestamp};

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::symbol_exclusions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ExclusionRowDB {
    pub symbol: String,
    pub failure_streak: i32,
    pub excluded_at: Option<String>,
    pub expires_at: Option<String>,
    pub backoff_index: i32,
    pub updated_at: String,
}

impl ExclusionRowDB {
    pub const COLUMNS: usize = 6;

    pub fn from_domain(entry: &ExclusionEntry, updated_at: &DateTime<Utc>) -> Self {
        Self {
            symbol: entry.symbol.to_string(),
            failure_streak: i32::try_from(entry.failure_streak).unwrap_or(i32::MAX),
            excluded_at: entry.excluded_at.as_ref().map(format_timestamp),
            expires_at: entry.expires_at.as_ref().map(format_timestamp),
            backoff_index: i32::try_from(entry.backoff_index).unwrap_or(i32::MAX),
            updated_at: format_timestamp(updated_at),
        }
    }

    fn corrupt(&self, message: String) -> StorageError {
        StorageError::CorruptRow {
            table: "symbol_exclusions",
            symbol: self.symbol.clone(),
            message,
        }
    }

    fn timestamp(&self, raw: &Option<String>) -> Result<Option<DateTime<Utc>>, StorageError> {
        raw.as_deref()
            .map(|value| {
                parse_timestamp(value).map_err(|e| self.corrupt(format!("{}: {}", value, e)))
            })
            .transpose()
    }
}

impl TryFrom<ExclusionRowDB> for ExclusionEntry {
    type Error = StorageError;

    fn try_from(row: ExclusionRowDB) -> Result<Self, Self::Error> {
        let failure_streak = u32::try_from(row.failure_streak)
            .map_err(|_| row.corrupt(format!("negative failure_streak {}", row.failure_streak)))?;
        let backoff_index = u32::try_from(row.backoff_index)
            .map_err(|_| row.corrupt(format!("negative backoff_index {}", row.backoff_index)))?;

        Ok(ExclusionEntry {
            symbol: Symbol::new(&row.symbol),
            failure_streak,
            excluded_at: row.timestamp(&row.excluded_at)?,
            expires_at: row.timestamp(&row.expires_at)?,
            backoff_index,
        })
    }
}
