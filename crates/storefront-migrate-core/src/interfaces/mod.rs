// crates/storefront-migrate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Storefront Migrate Interfaces
// Description: Backend-agnostic interfaces for progress, transforms, and logs.
// Purpose: Define the contract surfaces used by the migration runtime.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the migration runtime integrates with storage and
//! per-domain logic without embedding backend-specific details.
//! Implementations must fail closed on missing or corrupt state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::LeaseOwner;
use crate::core::LegacyRecord;
use crate::core::MigrationEvent;
use crate::core::MigrationRunState;
use crate::core::ProgressRecord;
use crate::core::StepKey;
use crate::core::StepOutcome;

// ============================================================================
// SECTION: Progress Store
// ============================================================================

/// Progress store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("progress store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("progress store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("progress store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("progress store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("progress store error: {0}")]
    Store(String),
}

/// Durable key/value persistence for migration progress.
///
/// Each step owns exactly one [`ProgressRecord`]; no multi-key atomicity is
/// required. Leases back the per-step single-flight guard.
pub trait ProgressStore {
    /// Loads progress for a step.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails or the row is corrupt.
    fn load(&self, step_key: &StepKey) -> Result<Option<ProgressRecord>, StoreError>;

    /// Saves progress for a step.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn save(&self, record: &ProgressRecord) -> Result<(), StoreError>;

    /// Deletes progress for a step.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when deletion fails.
    fn delete(&self, step_key: &StepKey) -> Result<(), StoreError>;

    /// Lists every stored progress record ordered by step key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list(&self) -> Result<Vec<ProgressRecord>, StoreError>;

    /// Loads the redirect driver's in-flight marker.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load_run_state(&self) -> Result<Option<MigrationRunState>, StoreError>;

    /// Saves the redirect driver's in-flight marker.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn save_run_state(&self, state: &MigrationRunState) -> Result<(), StoreError>;

    /// Clears the redirect driver's in-flight marker.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when deletion fails.
    fn clear_run_state(&self) -> Result<(), StoreError>;

    /// Attempts to take the lease for a step.
    ///
    /// Succeeds when no lease exists, the existing lease expired at or before
    /// `now_ms`, or `owner` already holds it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lease table cannot be updated.
    fn try_acquire_lease(
        &self,
        step_key: &StepKey,
        owner: &LeaseOwner,
        now_ms: i64,
        ttl_ms: u64,
    ) -> Result<bool, StoreError>;

    /// Releases a lease held by `owner`. Leases held by others are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lease table cannot be updated.
    fn release_lease(&self, step_key: &StepKey, owner: &LeaseOwner) -> Result<(), StoreError>;

    /// Deletes all progress, run state, and leases.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when deletion fails.
    fn reset(&self) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Record Transformer
// ============================================================================

/// Transformer errors.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Unrecoverable condition; the invocation aborts without progress.
    #[error("fatal migration error: {0}")]
    Fatal(String),
    /// A single record could not be migrated; it is logged and skipped.
    #[error("record {record} failed: {message}")]
    Record {
        /// Legacy record identifier.
        record: String,
        /// Failure detail.
        message: String,
    },
}

/// Per-domain conversion of legacy records into normalized rows.
///
/// `fetch_page` must order records on a stable, append-only key so paging
/// never skips or repeats records. `migrate_one` must check the natural key
/// before writing so repeated calls are no-ops.
pub trait Transformer: Send + Sync {
    /// Verifies the target schema exists before any page runs.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Fatal`] when required tables are missing.
    fn prepare(&self) -> Result<(), TransformError> {
        Ok(())
    }

    /// Returns a cheap, approximate count of legacy records.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] when counting fails.
    fn count_estimate(&self) -> Result<u64, TransformError>;

    /// Fetches one page of legacy records starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] when reading fails.
    fn fetch_page(&self, offset: u64, page_size: u64) -> Result<Vec<LegacyRecord>, TransformError>;

    /// Migrates one legacy record.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Record`] for per-record failures and
    /// [`TransformError::Fatal`] for failures that must halt the step.
    fn migrate_one(&self, record: &LegacyRecord) -> Result<StepOutcome, TransformError>;
}

// ============================================================================
// SECTION: Event Sink
// ============================================================================

/// Destination for structured migration events.
pub trait MigrationEventSink: Send + Sync {
    /// Records an event.
    fn record(&self, event: &MigrationEvent);
}
