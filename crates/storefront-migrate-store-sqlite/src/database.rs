// crates/storefront-migrate-store-sqlite/src/database.rs
// ============================================================================
// Module: Shared Migration Database
// Description: One SQLite handle shared by transformers and the progress store.
// Purpose: Hold legacy, normalized, and progress tables behind one connection.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! The migration runs inside the same database that holds the legacy data.
//! [`SqliteDatabase`] owns the single connection, installs schemas on
//! request, and reports missing target tables so transformers can fail
//! fatally before touching any row.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use rusqlite::Connection;
use rusqlite::params;

use crate::schema::LEGACY_SCHEMA;
use crate::schema::TARGET_SCHEMA;
use crate::store::SqliteProgressStore;
use crate::store::SqliteStoreConfig;
use crate::store::SqliteStoreError;
use crate::store::open_database;

// ============================================================================
// SECTION: Database Handle
// ============================================================================

/// Shared handle to the migration database.
#[derive(Clone)]
pub struct SqliteDatabase {
    /// Database file path.
    path: PathBuf,
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    /// Opens the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is invalid or the
    /// connection cannot be configured.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        let connection = open_database(config)?;
        Ok(Self {
            path: config.path.clone(),
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a progress store sharing this connection.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the progress tables cannot be
    /// initialized.
    pub fn progress_store(&self) -> Result<SqliteProgressStore, SqliteStoreError> {
        SqliteProgressStore::from_connection(Arc::clone(&self.connection))
    }

    /// Runs `f` with exclusive access to the connection.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] when the lock is poisoned, or any
    /// error `f` returns.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        f(&mut guard)
    }

    /// Creates the normalized tables if absent.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] when the DDL fails.
    pub fn install_target_schema(&self) -> Result<(), SqliteStoreError> {
        self.with_connection(|connection| Ok(connection.execute_batch(TARGET_SCHEMA)?))
    }

    /// Creates the legacy tables if absent.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] when the DDL fails.
    pub fn install_legacy_schema(&self) -> Result<(), SqliteStoreError> {
        self.with_connection(|connection| Ok(connection.execute_batch(LEGACY_SCHEMA)?))
    }

    /// Returns which of `tables` do not exist.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] when the catalog cannot be queried.
    pub fn missing_tables(&self, tables: &[&str]) -> Result<Vec<String>, SqliteStoreError> {
        self.with_connection(|connection| {
            let mut stmt = connection
                .prepare("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
            let mut missing = Vec::new();
            for table in tables {
                let count: i64 = stmt.query_row(params![table], |row| row.get(0))?;
                if count == 0 {
                    missing.push((*table).to_string());
                }
            }
            Ok(missing)
        })
    }
}
