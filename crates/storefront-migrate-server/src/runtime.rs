// crates/storefront-migrate-server/src/runtime.rs
// ============================================================================
// Module: Migration Runtime
// Description: Wires database, registry, progress store, and event sink.
// Purpose: Build one executor from configuration for the server and CLI.
// Dependencies: storefront-migrate-{config, core, store-sqlite, transformers}
// ============================================================================

//! ## Overview
//! [`MigrationRuntime::from_config`] opens the shared `SQLite` database,
//! optionally installs the normalized schema, builds the builtin registry,
//! and returns an executor whose lease owner is unique to this process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use storefront_migrate_config::StorefrontMigrateConfig;
use storefront_migrate_core::ExecutorConfig;
use storefront_migrate_core::LeaseOwner;
use storefront_migrate_core::ProgressDriver;
use storefront_migrate_core::RedirectDriver;
use storefront_migrate_core::SharedProgressStore;
use storefront_migrate_core::StepExecutor;
use storefront_migrate_store_sqlite::SqliteDatabase;
use storefront_migrate_transformers::builtin_registry;

use crate::server::ServerError;

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Executor and database handle built from configuration.
#[derive(Clone)]
pub struct MigrationRuntime {
    /// Shared database handle.
    db: SqliteDatabase,
    /// Step executor over the durable progress store.
    executor: StepExecutor<SharedProgressStore>,
}

impl MigrationRuntime {
    /// Builds the runtime described by `config`.
    ///
    /// `owner_label` prefixes the generated lease owner.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the config is invalid, the database
    /// cannot be opened, or the registry rejects a step.
    pub fn from_config(
        config: &StorefrontMigrateConfig,
        owner_label: &str,
    ) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let db = SqliteDatabase::open(&config.sqlite_config())
            .map_err(|err| ServerError::Init(err.to_string()))?;
        if config.migration.install_target_schema {
            db.install_target_schema().map_err(|err| ServerError::Init(err.to_string()))?;
        }
        let registry = builtin_registry(&db, &config.page_sizes())
            .map_err(|err| ServerError::Init(err.to_string()))?;
        let store = SharedProgressStore::from_store(
            db.progress_store().map_err(|err| ServerError::Init(err.to_string()))?,
        );
        let sink = config.event_sink().map_err(|err| ServerError::Init(err.to_string()))?;
        let executor = StepExecutor::new(
            Arc::new(registry),
            store,
            sink,
            ExecutorConfig {
                owner: LeaseOwner::generate(owner_label),
                lease_ttl_ms: config.migration.lease_ttl_ms,
            },
        );
        Ok(Self {
            db,
            executor,
        })
    }

    /// Returns the database handle.
    #[must_use]
    pub const fn database(&self) -> &SqliteDatabase {
        &self.db
    }

    /// Returns the step executor.
    #[must_use]
    pub const fn executor(&self) -> &StepExecutor<SharedProgressStore> {
        &self.executor
    }

    /// Returns a progress-reporting driver over the executor.
    #[must_use]
    pub fn progress_driver(&self) -> ProgressDriver<SharedProgressStore> {
        ProgressDriver::new(self.executor.clone())
    }

    /// Returns a redirect-driven driver over the executor.
    #[must_use]
    pub fn redirect_driver(&self) -> RedirectDriver<SharedProgressStore> {
        RedirectDriver::new(self.executor.clone())
    }
}
