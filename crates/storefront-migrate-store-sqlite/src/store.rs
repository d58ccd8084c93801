// crates/storefront-migrate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Progress Store
// Description: Durable ProgressStore backed by SQLite WAL.
// Purpose: Persist step progress, run markers, and leases with integrity hashes.
// Dependencies: storefront-migrate-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`ProgressStore`] using `SQLite`. Each
//! saved value is a canonical JSON snapshot stored next to its digest in a
//! key/value table, in the style of a plugin options table. Loads verify the
//! digest and fail closed on corruption. Leases live in their own table and
//! are taken inside an immediate transaction so two processes sharing one
//! database cannot both hold a step.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use storefront_migrate_core::LeaseOwner;
use storefront_migrate_core::MigrationRunState;
use storefront_migrate_core::ProgressRecord;
use storefront_migrate_core::ProgressStore;
use storefront_migrate_core::StepKey;
use storefront_migrate_core::StoreError;
use storefront_migrate_core::hashing::DEFAULT_HASH_ALGORITHM;
use storefront_migrate_core::hashing::HashAlgorithm;
use storefront_migrate_core::hashing::canonical_json_bytes;
use storefront_migrate_core::hashing::digest_matches;
use storefront_migrate_core::hashing::hash_bytes;
use storefront_migrate_core::unix_millis;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the progress tables.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum snapshot size accepted by the store.
pub const MAX_STATE_BYTES: usize = 1024 * 1024;
/// Key prefix for per-step progress rows.
const PROGRESS_PREFIX: &str = "progress:";
/// Key of the redirect driver's in-flight marker.
const RUN_STATE_KEY: &str = "doing_upgrade";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Connection settings for the migration database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config with default pragmas for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Store payload exceeded configured size limits.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "state_json exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed progress store.
#[derive(Clone)]
pub struct SqliteProgressStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteProgressStore {
    /// Opens a progress store on its own connection.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        let connection = open_database(config)?;
        Self::from_connection(Arc::new(Mutex::new(connection)))
    }

    /// Builds a store over an already open, shared connection.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the progress tables cannot be
    /// initialized or carry an unsupported version.
    pub fn from_connection(connection: Arc<Mutex<Connection>>) -> Result<Self, SqliteStoreError> {
        {
            let mut guard = connection
                .lock()
                .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
            initialize_schema(&mut guard)?;
        }
        Ok(Self {
            connection,
        })
    }

    /// Runs `f` with the locked connection.
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        f(&mut guard)
    }

    /// Loads and verifies one snapshot.
    fn load_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SqliteStoreError> {
        let row = self.with_connection(|connection| {
            Ok(connection
                .query_row(
                    "SELECT state_json, state_hash, hash_algorithm FROM migration_state WHERE \
                     state_key = ?1",
                    params![key],
                    |row| {
                        Ok((
                            row.get::<_, Vec<u8>>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    },
                )
                .optional()?)
        })?;
        let Some((bytes, hash, algorithm)) = row else {
            return Ok(None);
        };
        decode_snapshot(key, &bytes, &hash, &algorithm).map(Some)
    }

    /// Writes one snapshot.
    fn save_value<T: Serialize>(&self, key: &str, value: &T) -> Result<(), SqliteStoreError> {
        let canonical_json =
            canonical_json_bytes(value).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if canonical_json.len() > MAX_STATE_BYTES {
            return Err(SqliteStoreError::TooLarge {
                max_bytes: MAX_STATE_BYTES,
                actual_bytes: canonical_json.len(),
            });
        }
        let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, &canonical_json);
        let saved_at = unix_millis();
        self.with_connection(|connection| {
            connection.execute(
                "INSERT INTO migration_state (state_key, state_json, state_hash, hash_algorithm, \
                 saved_at) VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT(state_key) DO UPDATE SET \
                 state_json = excluded.state_json, state_hash = excluded.state_hash, \
                 hash_algorithm = excluded.hash_algorithm, saved_at = excluded.saved_at",
                params![key, canonical_json, digest.value, digest.algorithm.label(), saved_at],
            )?;
            Ok(())
        })
    }

    /// Deletes one snapshot.
    fn delete_value(&self, key: &str) -> Result<(), SqliteStoreError> {
        self.with_connection(|connection| {
            connection.execute("DELETE FROM migration_state WHERE state_key = ?1", params![key])?;
            Ok(())
        })
    }

    /// Lists and verifies every progress snapshot.
    fn list_progress(&self) -> Result<Vec<ProgressRecord>, SqliteStoreError> {
        let rows = self.with_connection(|connection| {
            let mut stmt = connection.prepare(
                "SELECT state_key, state_json, state_hash, hash_algorithm FROM migration_state \
                 WHERE substr(state_key, 1, ?1) = ?2 ORDER BY state_key",
            )?;
            let prefix_len = i64::try_from(PROGRESS_PREFIX.len())
                .map_err(|_| SqliteStoreError::Invalid("prefix too long".to_string()))?;
            let rows = stmt
                .query_map(params![prefix_len, PROGRESS_PREFIX], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        rows.into_iter()
            .map(|(key, bytes, hash, algorithm)| {
                let record: ProgressRecord = decode_snapshot(&key, &bytes, &hash, &algorithm)?;
                check_progress_key(&key, &record)?;
                Ok(record)
            })
            .collect()
    }

    /// Attempts to take a step lease inside an immediate transaction.
    fn acquire_lease(
        &self,
        step_key: &StepKey,
        owner: &LeaseOwner,
        now_ms: i64,
        ttl_ms: u64,
    ) -> Result<bool, SqliteStoreError> {
        let ttl = i64::try_from(ttl_ms)
            .map_err(|_| SqliteStoreError::Invalid("lease ttl out of range".to_string()))?;
        self.with_connection(|connection| {
            let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let existing: Option<(String, i64)> = tx
                .query_row(
                    "SELECT owner, expires_at_ms FROM migration_leases WHERE step_key = ?1",
                    params![step_key.as_str()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            if let Some((holder, expires_at_ms)) = existing
                && holder != owner.as_str()
                && expires_at_ms > now_ms
            {
                tx.commit()?;
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO migration_leases (step_key, owner, expires_at_ms) VALUES (?1, ?2, \
                 ?3) ON CONFLICT(step_key) DO UPDATE SET owner = excluded.owner, expires_at_ms = \
                 excluded.expires_at_ms",
                params![step_key.as_str(), owner.as_str(), now_ms.saturating_add(ttl)],
            )?;
            tx.commit()?;
            Ok(true)
        })
    }
}

impl ProgressStore for SqliteProgressStore {
    fn load(&self, step_key: &StepKey) -> Result<Option<ProgressRecord>, StoreError> {
        let key = progress_key(step_key);
        let record: Option<ProgressRecord> = self.load_value(&key)?;
        if let Some(record) = &record {
            check_progress_key(&key, record)?;
        }
        Ok(record)
    }

    fn save(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        self.save_value(&progress_key(&record.step_key), record).map_err(StoreError::from)
    }

    fn delete(&self, step_key: &StepKey) -> Result<(), StoreError> {
        self.delete_value(&progress_key(step_key)).map_err(StoreError::from)
    }

    fn list(&self) -> Result<Vec<ProgressRecord>, StoreError> {
        self.list_progress().map_err(StoreError::from)
    }

    fn load_run_state(&self) -> Result<Option<MigrationRunState>, StoreError> {
        self.load_value(RUN_STATE_KEY).map_err(StoreError::from)
    }

    fn save_run_state(&self, state: &MigrationRunState) -> Result<(), StoreError> {
        self.save_value(RUN_STATE_KEY, state).map_err(StoreError::from)
    }

    fn clear_run_state(&self) -> Result<(), StoreError> {
        self.delete_value(RUN_STATE_KEY).map_err(StoreError::from)
    }

    fn try_acquire_lease(
        &self,
        step_key: &StepKey,
        owner: &LeaseOwner,
        now_ms: i64,
        ttl_ms: u64,
    ) -> Result<bool, StoreError> {
        self.acquire_lease(step_key, owner, now_ms, ttl_ms).map_err(StoreError::from)
    }

    fn release_lease(&self, step_key: &StepKey, owner: &LeaseOwner) -> Result<(), StoreError> {
        self.with_connection(|connection| {
            connection.execute(
                "DELETE FROM migration_leases WHERE step_key = ?1 AND owner = ?2",
                params![step_key.as_str(), owner.as_str()],
            )?;
            Ok(())
        })
        .map_err(StoreError::from)
    }

    fn reset(&self) -> Result<(), StoreError> {
        self.with_connection(|connection| {
            let tx = connection.transaction()?;
            tx.execute_batch("DELETE FROM migration_state; DELETE FROM migration_leases;")?;
            tx.commit()?;
            Ok(())
        })
        .map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the state key for a step's progress.
fn progress_key(step_key: &StepKey) -> String {
    format!("{PROGRESS_PREFIX}{step_key}")
}

/// Ensures a progress payload belongs to the row it was read from.
fn check_progress_key(key: &str, record: &ProgressRecord) -> Result<(), SqliteStoreError> {
    if progress_key(&record.step_key) != key {
        return Err(SqliteStoreError::Invalid(format!(
            "step_key mismatch between key {key} and payload"
        )));
    }
    Ok(())
}

/// Verifies and decodes a stored snapshot.
fn decode_snapshot<T: DeserializeOwned>(
    key: &str,
    bytes: &[u8],
    hash: &str,
    algorithm: &str,
) -> Result<T, SqliteStoreError> {
    if bytes.len() > MAX_STATE_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_STATE_BYTES,
            actual_bytes: bytes.len(),
        });
    }
    let algorithm = parse_hash_algorithm(algorithm)?;
    if !digest_matches(algorithm, bytes, hash) {
        return Err(SqliteStoreError::Corrupt(format!("hash mismatch for {key}")));
    }
    serde_json::from_slice(bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

/// Parses a hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteStoreError> {
    HashAlgorithm::from_label(label)
        .ok_or_else(|| SqliteStoreError::Invalid(format!("unsupported hash algorithm: {label}")))
}

/// Validates the path, creates its parent, and opens a configured connection.
pub(crate) fn open_database(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    validate_store_path(&config.path)?;
    ensure_parent_dir(&config.path)?;
    open_connection(config)
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteStoreError::Invalid("store path is empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    connection.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}

/// Initializes the progress tables or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS migration_state (
                    state_key TEXT PRIMARY KEY,
                    state_json BLOB NOT NULL,
                    state_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    saved_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS migration_leases (
                    step_key TEXT PRIMARY KEY,
                    owner TEXT NOT NULL,
                    expires_at_ms INTEGER NOT NULL
                );",
            )?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit()?;
    Ok(())
}
