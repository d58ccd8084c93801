// crates/storefront-migrate-config/src/config.rs
// ============================================================================
// Module: Storefront Migrate Configuration
// Description: Configuration loading and validation for Storefront Migrate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: storefront-migrate-core, storefront-migrate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `STOREFRONT_MIGRATE_CONFIG`, then
//! `storefront-migrate.toml` in the working directory. Every section has
//! defaults, so an empty file is a valid configuration that migrates
//! `storefront.sqlite` with 50 records per page.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use storefront_migrate_core::DEFAULT_LEASE_TTL_MS;
use storefront_migrate_core::FileEventSink;
use storefront_migrate_core::NoopEventSink;
use storefront_migrate_core::SharedEventSink;
use storefront_migrate_core::StderrEventSink;
use storefront_migrate_store_sqlite::SqliteStoreConfig;
use storefront_migrate_store_sqlite::SqliteStoreMode;
use storefront_migrate_store_sqlite::SqliteSyncMode;
use storefront_migrate_transformers::DEFAULT_PAGE_SIZE;
use storefront_migrate_transformers::PageSizes;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "storefront-migrate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "STOREFRONT_MIGRATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Largest accepted page size.
pub(crate) const MAX_PAGE_SIZE: u64 = 10_000;
/// Shortest accepted lease lifetime.
pub(crate) const MIN_LEASE_TTL_MS: u64 = 1_000;
/// Longest accepted lease lifetime.
pub(crate) const MAX_LEASE_TTL_MS: u64 = 24 * 60 * 60 * 1_000;
/// Longest accepted `SQLite` busy timeout.
pub(crate) const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;
/// Largest accepted request body.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Storefront Migrate configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorefrontMigrateConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Migration tuning.
    #[serde(default)]
    pub migration: MigrationConfig,
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Event logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StorefrontMigrateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.migration.validate()?;
        self.server.validate()?;
        self.logging.validate()
    }

    /// Returns the `SQLite` settings for the shared database.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.database.path.clone(),
            busy_timeout_ms: self.database.busy_timeout_ms,
            journal_mode: self.database.journal_mode,
            sync_mode: self.database.sync_mode,
        }
    }

    /// Returns the page sizes for the builtin registry.
    #[must_use]
    pub fn page_sizes(&self) -> PageSizes {
        PageSizes {
            default: self.migration.default_page_size,
            overrides: self.migration.page_sizes.clone(),
        }
    }

    /// Builds the configured event sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the log file cannot be opened.
    pub fn event_sink(&self) -> Result<SharedEventSink, ConfigError> {
        match self.logging.sink {
            LogSinkKind::Stderr => Ok(Arc::new(StderrEventSink)),
            LogSinkKind::None => Ok(Arc::new(NoopEventSink)),
            LogSinkKind::File => {
                let path = self.logging.path.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("logging.sink=file requires logging.path".to_string())
                })?;
                let sink = FileEventSink::new(path)
                    .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
                Ok(Arc::new(sink))
            }
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// `SQLite` database holding legacy, target, and progress tables.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl DatabaseConfig {
    /// Validates database configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("database.path", &self.path.to_string_lossy())?;
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "database.busy_timeout_ms must be at most {MAX_BUSY_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

/// Migration tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MigrationConfig {
    /// Records per page for steps without an override.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    /// Per-step page size overrides keyed by step key.
    #[serde(default)]
    pub page_sizes: BTreeMap<String, u64>,
    /// Lifetime of a step lease in milliseconds.
    #[serde(default = "default_lease_ttl_ms")]
    pub lease_ttl_ms: u64,
    /// Creates the normalized tables when they are missing.
    #[serde(default)]
    pub install_target_schema: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            page_sizes: BTreeMap::new(),
            lease_ttl_ms: default_lease_ttl_ms(),
            install_target_schema: false,
        }
    }
}

impl MigrationConfig {
    /// Validates migration tuning.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_page_size("migration.default_page_size", self.default_page_size)?;
        for (key, size) in &self.page_sizes {
            if key.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "migration.page_sizes keys must be non-empty".to_string(),
                ));
            }
            validate_page_size(&format!("migration.page_sizes.{key}"), *size)?;
        }
        if !(MIN_LEASE_TTL_MS..=MAX_LEASE_TTL_MS).contains(&self.lease_ttl_ms) {
            return Err(ConfigError::Invalid(format!(
                "migration.lease_ttl_ms must be between {MIN_LEASE_TTL_MS} and {MAX_LEASE_TTL_MS}"
            )));
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Permits binding a non-loopback address.
    #[serde(default)]
    pub allow_non_loopback: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            allow_non_loopback: false,
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid bind address: {}", self.bind)))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let addr = self.bind_addr()?;
        if !addr.ip().is_loopback() && !self.allow_non_loopback {
            return Err(ConfigError::Invalid(
                "non-loopback bind requires server.allow_non_loopback=true".to_string(),
            ));
        }
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Event sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `logging.path`.
    File,
    /// Discard events.
    None,
}

/// Event logging configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: LogSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (LogSinkKind::File, None) => Err(ConfigError::Invalid(
                "logging.sink=file requires logging.path".to_string(),
            )),
            (LogSinkKind::File, Some(path)) => {
                validate_path_string("logging.path", &path.to_string_lossy())
            }
            (_, Some(_)) => Err(ConfigError::Invalid(
                "logging.path is only valid with logging.sink=file".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates one page size.
fn validate_page_size(field: &str, size: u64) -> Result<(), ConfigError> {
    if size == 0 {
        return Err(ConfigError::Invalid(format!("{field} must be greater than zero")));
    }
    if size > MAX_PAGE_SIZE {
        return Err(ConfigError::Invalid(format!("{field} must be at most {MAX_PAGE_SIZE}")));
    }
    Ok(())
}

/// Default database file.
fn default_database_path() -> PathBuf {
    PathBuf::from("storefront.sqlite")
}

/// Default busy timeout.
pub(crate) const fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Default page size.
pub(crate) const fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// Default lease lifetime.
pub(crate) const fn default_lease_ttl_ms() -> u64 {
    DEFAULT_LEASE_TTL_MS
}

/// Default bind address.
fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

/// Default max request body size.
pub(crate) const fn default_max_body_bytes() -> usize {
    64 * 1024
}
