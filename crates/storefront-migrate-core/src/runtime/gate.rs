// crates/storefront-migrate-core/src/runtime/gate.rs
// ============================================================================
// Module: Completion & Gate Controller
// Description: Derives global migration state from per-step progress.
// Purpose: Unlock legacy removal only once every other step is complete.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Global state is never stored; it is recomputed from the progress records
//! on every call. "Fully migrated" is the AND of `completed` across all
//! non-gated steps. Legacy removal may run only when fully migrated and the
//! gated step itself has not completed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::core::Domain;
use crate::core::MigrationRunState;
use crate::core::ProgressRecord;
use crate::core::StepKey;
use crate::core::StepState;
use crate::interfaces::ProgressStore;
use crate::runtime::executor::ExecutorError;
use crate::runtime::registry::MigrationRegistry;

// ============================================================================
// SECTION: Status Types
// ============================================================================

/// Reported status of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepStatus {
    /// Step key.
    pub step_key: StepKey,
    /// Human-readable label.
    pub label: String,
    /// Domain tag.
    pub domain: Domain,
    /// True for the gated step.
    pub is_legacy_removal: bool,
    /// Lifecycle state.
    pub state: StepState,
    /// Persisted cursor.
    pub cursor: u64,
    /// Persisted total estimate.
    pub total_estimate: Option<u64>,
    /// Completion percentage.
    pub percent: u8,
    /// Advisory bulk-run flag.
    pub legacy_running: bool,
}

/// Aggregate migration status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// Steps in execution order.
    pub steps: Vec<StepStatus>,
    /// All non-gated steps are completed.
    pub fully_migrated: bool,
    /// Legacy removal is currently permitted.
    pub can_remove_legacy_data: bool,
    /// Redirect driver marker, when a step is mid-flight.
    pub doing_upgrade: Option<MigrationRunState>,
}

// ============================================================================
// SECTION: Controller
// ============================================================================

/// Completion and gate evaluation over a registry and store.
#[derive(Clone)]
pub struct GateController<S> {
    /// Registered steps.
    registry: Arc<MigrationRegistry>,
    /// Progress store.
    store: S,
}

impl<S> GateController<S>
where
    S: ProgressStore,
{
    /// Creates a controller.
    #[must_use]
    pub const fn new(registry: Arc<MigrationRegistry>, store: S) -> Self {
        Self {
            registry,
            store,
        }
    }

    /// Returns the lifecycle state of a step.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] when the step is unknown or the store fails.
    pub fn step_state(&self, key: &StepKey) -> Result<StepState, ExecutorError> {
        self.registry.get_step(key)?;
        Ok(self.store.load(key)?.map_or(StepState::NotStarted, |record| record.state()))
    }

    /// Returns true when every non-gated step is completed.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Store`] when progress cannot be read.
    pub fn is_fully_migrated(&self) -> Result<bool, ExecutorError> {
        for step in self.registry.migration_steps() {
            let completed = self.store.load(&step.key)?.is_some_and(|record| record.completed);
            if !completed {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Returns true when legacy removal may run now.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Store`] when progress cannot be read.
    pub fn can_run_legacy_removal(&self) -> Result<bool, ExecutorError> {
        let Some(gated) = self.registry.legacy_removal_step() else {
            return Ok(false);
        };
        if !self.is_fully_migrated()? {
            return Ok(false);
        }
        Ok(!self.store.load(&gated.key)?.is_some_and(|record| record.completed))
    }

    /// Validates a legacy-removal request and returns the gated step key.
    ///
    /// `requested` must name the gated step when provided.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::NoLegacyRemovalStep`],
    /// [`ExecutorError::NotLegacyRemoval`],
    /// [`ExecutorError::ConfirmationRequired`], or
    /// [`ExecutorError::GateClosed`].
    pub fn authorize_legacy_removal(
        &self,
        requested: Option<&StepKey>,
        confirmation: bool,
    ) -> Result<StepKey, ExecutorError> {
        let gated = self.registry.legacy_removal_step().ok_or(ExecutorError::NoLegacyRemovalStep)?;
        if let Some(requested) = requested
            && requested != &gated.key
        {
            return Err(ExecutorError::NotLegacyRemoval(requested.to_string()));
        }
        if !confirmation {
            return Err(ExecutorError::ConfirmationRequired);
        }
        if !self.can_run_legacy_removal()? {
            return Err(ExecutorError::GateClosed(gated.key.to_string()));
        }
        Ok(gated.key.clone())
    }

    /// Builds the aggregate status report.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Store`] when progress cannot be read.
    pub fn status(&self) -> Result<MigrationStatus, ExecutorError> {
        let records: BTreeMap<StepKey, ProgressRecord> = self
            .store
            .list()?
            .into_iter()
            .map(|record| (record.step_key.clone(), record))
            .collect();
        let steps = self
            .registry
            .list_steps()
            .into_iter()
            .map(|step| {
                let record = records.get(&step.key);
                StepStatus {
                    step_key: step.key.clone(),
                    label: step.label.clone(),
                    domain: step.domain,
                    is_legacy_removal: step.is_legacy_removal,
                    state: record.map_or(StepState::NotStarted, ProgressRecord::state),
                    cursor: record.map_or(0, |record| record.cursor),
                    total_estimate: record.and_then(|record| record.total_estimate),
                    percent: record.map_or(0, ProgressRecord::percent),
                    legacy_running: record.is_some_and(|record| record.legacy_running),
                }
            })
            .collect();
        Ok(MigrationStatus {
            steps,
            fully_migrated: self.is_fully_migrated()?,
            can_remove_legacy_data: self.can_run_legacy_removal()?,
            doing_upgrade: self.store.load_run_state()?,
        })
    }
}
