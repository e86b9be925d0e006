use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use log::debug;
use signalgate_core::exclusions::{ExclusionEntry, ExclusionStore};
use signalgate_core::Result;

use super::model::ExclusionRowDB;
use crate::db::get_connection;
use crate::errors::{IntoCore, StorageError};
use crate::schema::symbol_exclusions::dsl as se_dsl;
use crate::utils::chunk_rows_for_sqlite;

pub struct ExclusionRepository {
    pool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
}

impl ExclusionRepository {
    pub fn new(pool: Arc<Pool<ConnectionManager<SqliteConnection>>>) -> Self {
        Self { pool }
    }
}

impl ExclusionStore for ExclusionRepository {
    fn load(&self) -> Result<Vec<ExclusionEntry>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = se_dsl::symbol_exclusions
            .order(se_dsl::symbol.asc())
            .select(ExclusionRowDB::as_select())
            .load::<ExclusionRowDB>(&mut conn)
            .map_err(StorageError::from)?;

        rows.into_iter()
            .map(|row| ExclusionEntry::try_from(row).into_core())
            .collect()
    }

    fn save(&self, entries: &[ExclusionEntry]) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;
        let now = Utc::now();
        let rows: Vec<ExclusionRowDB> = entries
            .iter()
            .map(|entry| ExclusionRowDB::from_domain(entry, &now))
            .collect();

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::delete(se_dsl::symbol_exclusions).execute(conn)?;
            for chunk in chunk_rows_for_sqlite(&rows, ExclusionRowDB::COLUMNS) {
                diesel::insert_into(se_dsl::symbol_exclusions)
                    .values(chunk)
                    .execute(conn)?;
            }
            Ok(())
        })
        .into_core()?;

        debug!("Saved {} exclusion entries", rows.len());
        Ok(())
    }
}
