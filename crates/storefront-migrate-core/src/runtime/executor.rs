// crates/storefront-migrate-core/src/runtime/executor.rs
// ============================================================================
// Module: Step Executor
// Description: Runs exactly one page of one migration step per invocation.
// Purpose: Advance and persist step cursors with single-flight protection.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The executor owns the per-step state machine
//! `NotStarted -> InProgress -> Completed`. Each call to
//! [`StepExecutor::run_page`] processes at most one page and persists the
//! advanced cursor before returning, so a crash loses at most one page of
//! idempotent work.
//!
//! Security posture: the gated legacy-removal step re-validates the gate on
//! every page, and every page holds both an in-process guard and a durable
//! lease so concurrent operators are refused instead of double-processing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::core::LeaseOwner;
use crate::core::MigrationEvent;
use crate::core::MigrationStep;
use crate::core::ProgressRecord;
use crate::core::StepKey;
use crate::core::StepOutcome;
use crate::core::unix_millis;
use crate::interfaces::ProgressStore;
use crate::interfaces::StoreError;
use crate::interfaces::TransformError;
use crate::interfaces::Transformer;
use crate::runtime::audit::SharedEventSink;
use crate::runtime::gate::GateController;
use crate::runtime::guard::SingleFlight;
use crate::runtime::registry::MigrationRegistry;
use crate::runtime::registry::RegistryError;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default lease lifetime (five minutes).
pub const DEFAULT_LEASE_TTL_MS: u64 = 300_000;

/// Executor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Owner recorded on step leases.
    pub owner: LeaseOwner,
    /// Lease lifetime in milliseconds.
    pub lease_ttl_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            owner: LeaseOwner::generate("executor"),
            lease_ttl_ms: DEFAULT_LEASE_TTL_MS,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Step executor errors.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Registry lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Progress store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Transformer reported a fatal error.
    #[error("migration aborted: {0}")]
    Transform(String),
    /// Another caller holds the step.
    #[error("migration step is busy: {0}")]
    StepBusy(String),
    /// Legacy removal is not currently permitted.
    #[error("legacy removal is not permitted: {0}")]
    GateClosed(String),
    /// Legacy removal was requested without confirmation.
    #[error("legacy removal requires explicit confirmation")]
    ConfirmationRequired,
    /// Step is not the gated legacy-removal step.
    #[error("step is not the legacy removal step: {0}")]
    NotLegacyRemoval(String),
    /// Registry declares no legacy-removal step.
    #[error("no legacy removal step is registered")]
    NoLegacyRemovalStep,
    /// A redirect-driven run for another step is still in flight.
    #[error("upgrade already in progress for step {0}")]
    UpgradeInProgress(String),
}

impl ExecutorError {
    /// Returns a stable label for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Registry(RegistryError::NotFound(_)) => "not_found",
            Self::Registry(_) => "registry",
            Self::Store(_) => "store",
            Self::Transform(_) => "fatal",
            Self::StepBusy(_) => "busy",
            Self::GateClosed(_) => "gate_closed",
            Self::ConfirmationRequired => "confirmation_required",
            Self::NotLegacyRemoval(_) => "not_legacy_removal",
            Self::NoLegacyRemovalStep => "no_legacy_removal_step",
            Self::UpgradeInProgress(_) => "upgrade_in_progress",
        }
    }
}

impl From<TransformError> for ExecutorError {
    fn from(err: TransformError) -> Self {
        Self::Transform(err.to_string())
    }
}

// ============================================================================
// SECTION: Page Report
// ============================================================================

/// Outcome of one executed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageReport {
    /// Step that ran.
    pub step_key: StepKey,
    /// Cursor after the page.
    pub cursor: u64,
    /// Total estimate after the page.
    pub total_estimate: Option<u64>,
    /// Completion percentage.
    pub percent: u8,
    /// True once the step is completed.
    pub done: bool,
    /// Records fetched.
    pub fetched: u64,
    /// Records migrated.
    pub migrated: u64,
    /// Records skipped.
    pub skipped: u64,
    /// Records that failed and were skipped.
    pub failed: u64,
}

impl PageReport {
    /// Builds a report with zero counters from a progress record.
    #[must_use]
    pub fn from_record(record: &ProgressRecord) -> Self {
        Self {
            step_key: record.step_key.clone(),
            cursor: record.cursor,
            total_estimate: record.total_estimate,
            percent: record.percent(),
            done: record.completed,
            fetched: 0,
            migrated: 0,
            skipped: 0,
            failed: 0,
        }
    }

    /// Cursor before the page ran.
    #[must_use]
    pub const fn starting_cursor(&self) -> u64 {
        self.cursor.saturating_sub(self.fetched)
    }
}

/// Per-page outcome counters.
#[derive(Debug, Default, Clone, Copy)]
struct PageCounts {
    /// Records migrated.
    migrated: u64,
    /// Records skipped.
    skipped: u64,
    /// Records that failed.
    failed: u64,
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Drives one page of work per invocation.
#[derive(Clone)]
pub struct StepExecutor<S> {
    /// Registered steps.
    registry: Arc<MigrationRegistry>,
    /// Durable progress store.
    store: S,
    /// Structured event sink.
    sink: SharedEventSink,
    /// In-process single-flight set.
    flights: SingleFlight,
    /// Executor configuration.
    config: ExecutorConfig,
}

impl<S> StepExecutor<S>
where
    S: ProgressStore + Clone,
{
    /// Creates a new executor.
    #[must_use]
    pub fn new(
        registry: Arc<MigrationRegistry>,
        store: S,
        sink: SharedEventSink,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            registry,
            store,
            sink,
            flights: SingleFlight::new(),
            config,
        }
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// Returns the progress store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the executor configuration.
    #[must_use]
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Returns a gate controller over the same registry and store.
    #[must_use]
    pub fn gate(&self) -> GateController<S> {
        GateController::new(Arc::clone(&self.registry), self.store.clone())
    }

    /// Returns the steps with a page in flight in this process.
    #[must_use]
    pub fn in_flight(&self) -> Vec<StepKey> {
        self.flights.in_flight()
    }

    /// Emits a structured event.
    pub fn emit(&self, event: &MigrationEvent) {
        self.sink.record(event);
    }

    /// Runs one page of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::StepBusy`] when another caller holds the step,
    /// [`ExecutorError::GateClosed`] for a gated step whose gate is closed,
    /// [`ExecutorError::Transform`] on fatal transformer errors (no progress
    /// is persisted), and store or registry errors otherwise.
    pub fn run_page(&self, key: &StepKey) -> Result<PageReport, ExecutorError> {
        let step = self.registry.get_step(key)?.clone();
        let processor = self.registry.processor(key)?;
        self.with_step_lease(key, || self.run_page_leased(&step, processor.as_ref()))
    }

    /// Runs `work` while holding the step's in-process guard and durable lease.
    fn with_step_lease<T>(
        &self,
        key: &StepKey,
        work: impl FnOnce() -> Result<T, ExecutorError>,
    ) -> Result<T, ExecutorError> {
        let Some(_flight) = self.flights.enter(key) else {
            self.emit(&MigrationEvent::new("lease_contended").with_step(key));
            return Err(ExecutorError::StepBusy(key.to_string()));
        };
        let owner = &self.config.owner;
        if !self.store.try_acquire_lease(key, owner, unix_millis(), self.config.lease_ttl_ms)? {
            self.emit(
                &MigrationEvent::new("lease_contended")
                    .with_step(key)
                    .with_message("lease held by another process"),
            );
            return Err(ExecutorError::StepBusy(key.to_string()));
        }
        let result = work();
        let released = self.store.release_lease(key, owner);
        let value = result?;
        released?;
        Ok(value)
    }

    /// Runs one page while the caller holds the step's guard and lease.
    fn run_page_leased(
        &self,
        step: &MigrationStep,
        processor: &dyn Transformer,
    ) -> Result<PageReport, ExecutorError> {
        let key = &step.key;
        let mut record = self
            .store
            .load(key)?
            .unwrap_or_else(|| ProgressRecord::new(key.clone(), step.page_size, unix_millis()));
        record.page_size = step.page_size;
        if record.completed {
            return Ok(PageReport::from_record(&record));
        }
        if step.is_legacy_removal && !self.gate().can_run_legacy_removal()? {
            self.emit(
                &MigrationEvent::new("gate_refused")
                    .with_step(key)
                    .with_message("migration steps are not all completed"),
            );
            return Err(ExecutorError::GateClosed(key.to_string()));
        }
        processor.prepare().map_err(|err| self.fatal(key, err))?;

        if record.needs_estimate() {
            let estimate = processor.count_estimate().map_err(|err| self.fatal(key, err))?;
            record.total_estimate = Some(estimate);
            if record.cursor == 0 && estimate == 0 {
                return self.complete(record);
            }
        }

        let page = processor
            .fetch_page(record.cursor, record.page_size)
            .map_err(|err| self.fatal(key, err))?;
        if page.is_empty() {
            return self.complete(record);
        }

        let mut counts = PageCounts::default();
        for legacy in &page {
            match processor.migrate_one(legacy) {
                Ok(StepOutcome::Migrated) => counts.migrated += 1,
                Ok(StepOutcome::Skipped) => counts.skipped += 1,
                Err(TransformError::Record {
                    record: id,
                    message,
                }) => {
                    counts.failed += 1;
                    self.emit(
                        &MigrationEvent::new("record_failed")
                            .with_step(key)
                            .with_record(id)
                            .with_message(message),
                    );
                }
                Err(err @ TransformError::Fatal(_)) => {
                    return Err(self.fatal(key, err));
                }
            }
        }

        let fetched = u64::try_from(page.len()).unwrap_or(u64::MAX);
        record.advance(fetched, unix_millis());
        self.store.save(&record)?;
        self.emit(
            &MigrationEvent::new("page_completed")
                .with_step(key)
                .with_cursor(record.cursor, record.total_estimate)
                .with_counts(fetched, counts.migrated, counts.skipped, counts.failed),
        );
        Ok(PageReport {
            step_key: key.clone(),
            cursor: record.cursor,
            total_estimate: record.total_estimate,
            percent: record.percent(),
            done: false,
            fetched,
            migrated: counts.migrated,
            skipped: counts.skipped,
            failed: counts.failed,
        })
    }

    /// Marks a step completed and persists it.
    fn complete(&self, mut record: ProgressRecord) -> Result<PageReport, ExecutorError> {
        record.mark_completed(unix_millis());
        self.store.save(&record)?;
        self.emit(
            &MigrationEvent::new("step_completed")
                .with_step(&record.step_key)
                .with_cursor(record.cursor, record.total_estimate),
        );
        Ok(PageReport::from_record(&record))
    }

    /// Logs and converts a transformer failure that aborts the page.
    fn fatal(&self, key: &StepKey, err: TransformError) -> ExecutorError {
        let err = ExecutorError::from(err);
        self.emit(&MigrationEvent::new("step_failed").with_step(key).with_message(err.to_string()));
        err
    }

    /// Returns the persisted total estimate, computing it when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] when the step is unknown or counting fails.
    pub fn estimate_total(&self, key: &StepKey) -> Result<u64, ExecutorError> {
        if let Some(record) = self.store.load(key)?
            && let Some(total) = record.total_estimate
            && !record.needs_estimate()
        {
            return Ok(total);
        }
        let processor = self.registry.processor(key)?;
        processor.count_estimate().map_err(|err| self.fatal(key, err))
    }

    /// Returns the persisted progress for a step, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] when the step is unknown or the store fails.
    pub fn progress(&self, key: &StepKey) -> Result<Option<ProgressRecord>, ExecutorError> {
        self.registry.get_step(key)?;
        Ok(self.store.load(key)?)
    }

    /// Sets or clears the advisory bulk-run flag for a step.
    ///
    /// The flag is written under the step lease so a concurrent page cannot
    /// land between the load and the save.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::StepBusy`] when another caller holds the step,
    /// and registry or store errors otherwise.
    pub fn mark_legacy_running(&self, key: &StepKey, running: bool) -> Result<(), ExecutorError> {
        let step = self.registry.get_step(key)?;
        self.with_step_lease(key, || {
            let now = unix_millis();
            let mut record = self
                .store
                .load(key)?
                .unwrap_or_else(|| ProgressRecord::new(key.clone(), step.page_size, now));
            record.legacy_running = running;
            record.updated_at_ms = now;
            self.store.save(&record)?;
            Ok(())
        })
    }

    /// Deletes all persisted progress, run state, and leases.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Store`] when the store cannot be reset.
    pub fn reset(&self) -> Result<(), ExecutorError> {
        self.store.reset()?;
        self.emit(&MigrationEvent::new("migration_reset"));
        Ok(())
    }
}
