//! SQLite persistence for the subject matrix and contest study maps.
//!
//! [`Store`] owns a single [`rusqlite::Connection`]. Query functions live in
//! [`matrix`] and [`contests`] and take a `&Connection`, so the same code runs
//! directly on the store or inside [`Store::transaction`].

pub mod contests;
mod encode;
pub mod matrix;
mod schema;

use std::path::Path;

use rusqlite::{Connection, Transaction};
use tracing::{debug, info};

use crate::error::{MapaError, MapaResult};
use crate::types::{
    Contest, DisciplineNode, MatrixCounts, NewContest, NewEntry, StudyMapEntry, StudyMapRow,
    StudyMetadata,
};

pub use schema::{SCHEMA, SCHEMA_VERSION};

/// Study-map store backed by a single SQLite file
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) a store at `path` and apply the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> MapaResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "opened store");
        Self::init(conn)
    }

    /// Open an in-memory store, used by tests and dry runs.
    pub fn open_in_memory() -> MapaResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> MapaResult<Self> {
        let found: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if found > SCHEMA_VERSION {
            return Err(MapaError::SchemaVersion {
                found,
                supported: SCHEMA_VERSION,
            });
        }
        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(Self { conn })
    }

    /// Raw connection, for callers that need a query the store does not offer.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside one transaction: committed when `f` returns `Ok`,
    /// rolled back otherwise.
    pub fn transaction<T, F>(&mut self, f: F) -> MapaResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> MapaResult<T>,
    {
        let tx = self.conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    //==========================================================================
    // Matrix
    //==========================================================================

    /// Delete the whole matrix (sub-subjects, subjects, disciplines) atomically.
    ///
    /// Study-map entries referencing deleted subjects are removed by cascade.
    pub fn clear_matrix(&mut self) -> MapaResult<MatrixCounts> {
        let removed = self.transaction(|tx| matrix::clear_matrix(tx))?;
        info!(
            disciplines = removed.disciplines,
            subjects = removed.subjects,
            sub_subjects = removed.sub_subjects,
            "cleared subject matrix"
        );
        Ok(removed)
    }

    pub fn matrix_tree(&self) -> MapaResult<Vec<DisciplineNode>> {
        matrix::matrix_tree(&self.conn)
    }

    pub fn matrix_counts(&self) -> MapaResult<MatrixCounts> {
        matrix::matrix_counts(&self.conn)
    }

    //==========================================================================
    // Contests and study maps
    //==========================================================================

    pub fn create_contest(&self, new: &NewContest) -> MapaResult<Contest> {
        contests::create_contest(&self.conn, new)
    }

    pub fn get_contest(&self, id: i64) -> MapaResult<Contest> {
        contests::get_contest(&self.conn, id)
    }

    pub fn find_contest_by_code(&self, code: &str) -> MapaResult<Option<Contest>> {
        contests::find_contest_by_code(&self.conn, code)
    }

    pub fn list_contests(&self) -> MapaResult<Vec<Contest>> {
        contests::list_contests(&self.conn)
    }

    pub fn add_entry(&self, contest_id: i64, new: &NewEntry) -> MapaResult<StudyMapEntry> {
        contests::add_entry(&self.conn, contest_id, new)
    }

    pub fn list_entries(&self, contest_id: i64) -> MapaResult<Vec<StudyMapEntry>> {
        contests::list_entries(&self.conn, contest_id)
    }

    pub fn set_metadata(&self, entry_id: i64, metadata: &StudyMetadata) -> MapaResult<()> {
        contests::set_metadata(&self.conn, entry_id, metadata)
    }

    pub fn get_metadata(&self, entry_id: i64) -> MapaResult<Option<StudyMetadata>> {
        contests::get_metadata(&self.conn, entry_id)
    }

    /// Copy a contest, its entries and their metadata in one transaction.
    pub fn duplicate_contest(
        &mut self,
        contest_id: i64,
        new_name: Option<&str>,
    ) -> MapaResult<Contest> {
        self.transaction(|tx| contests::duplicate_contest(tx, contest_id, new_name))
    }

    pub fn study_map_rows(&self, contest_id: i64) -> MapaResult<Vec<StudyMapRow>> {
        contests::study_map_rows(&self.conn, contest_id)
    }
}
