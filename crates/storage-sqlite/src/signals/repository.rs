use std::sync::Arc;

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use log::debug;
use signalgate_core::signals::{CooldownEntry, CooldownStore};
use signalgate_core::Result;

use super::model::CooldownRowDB;
use crate::db::get_connection;
use crate::errors::{IntoCore, StorageError};
use crate::schema::signal_cooldowns::dsl as sc_dsl;
use crate::utils::chunk_rows_for_sqlite;

pub struct CooldownRepository {
    pool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
}

impl CooldownRepository {
    pub fn new(pool: Arc<Pool<ConnectionManager<SqliteConnection>>>) -> Self {
        Self { pool }
    }
}

impl CooldownStore for CooldownRepository {
    fn load(&self) -> Result<Vec<CooldownEntry>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = sc_dsl::signal_cooldowns
            .order(sc_dsl::symbol.asc())
            .select(CooldownRowDB::as_select())
            .load::<CooldownRowDB>(&mut conn)
            .map_err(StorageError::from)?;

        rows.into_iter()
            .map(|row| CooldownEntry::try_from(row).into_core())
            .collect()
    }

    fn save(&self, entries: &[CooldownEntry]) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;
        let rows: Vec<CooldownRowDB> = entries.iter().map(CooldownRowDB::from).collect();

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::delete(sc_dsl::signal_cooldowns).execute(conn)?;
            for chunk in chunk_rows_for_sqlite(&rows, CooldownRowDB::COLUMNS) {
                diesel::insert_into(sc_dsl::signal_cooldowns)
                    .values(chunk)
                    .execute(conn)?;
            }
            Ok(())
        })
        .into_core()?;

        debug!("Saved {} cooldown entries", rows.len());
        Ok(())
    }
}
