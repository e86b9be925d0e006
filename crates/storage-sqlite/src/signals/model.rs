//! Database model for cooldown entries.

use diesel::prelude::*;
use signalgate_core::signals::{CooldownEntry, Direction};
use signalgate_market_data::Symbol;

use crate::errors::StorageError;
use crate::utils::{format_timestamp, parse_timestamp};

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::signal_cooldowns)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CooldownRowDB {
    pub symbol: String,
    pub last_direction: String,
    pub last_approved_at: String,
}

impl CooldownRowDB {
    pub const COLUMNS: usize = 3;
}

impl From<&CooldownEntry> for CooldownRowDB {
    fn from(entry: &CooldownEntry) -> Self {
        Self {
            symbol: entry.symbol.to_string(),
            last_direction: entry.last_direction.as_str().to_string(),
            last_approved_at: format_timestamp(&entry.last_approved_at),
        }
    }
}

impl TryFrom<CooldownRowDB> for CooldownEntry {
    type Error = StorageError;

    fn try_from(row: CooldownRowDB) -> Result<Self, Self::Error> {
        let corrupt = |message: String| StorageError::CorruptRow {
            table: "signal_cooldowns",
            symbol: row.symbol.clone(),
            message,
        };

        let last_direction = row.last_direction.parse::<Direction>().map_err(corrupt)?;
        let last_approved_at = parse_timestamp(&row.last_approved_at)
            .map_err(|e| corrupt(format!("{}: {}", row.last_approved_at, e)))?;

        Ok(CooldownEntry {
            symbol: Symbol::new(&row.symbol),
            last_direction,
            last_approved_at,
        })
    }
}
