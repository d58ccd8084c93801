// crates/storefront-migrate-core/src/runtime/redirect.rs
// ============================================================================
// Module: Redirect Continuation Driver
// Description: One page per request, continuing via self-redirects.
// Purpose: Carry the in-flight run marker explicitly between requests.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The redirect-driven driver runs exactly one page per call and returns the
//! next [`MigrationRunState`] for the caller to encode into a redirect. The
//! marker is persisted after every page so an operator who navigates away
//! can resume, and cleared when the step completes. Inside the process the
//! same flow is an explicit loop ([`RedirectDriver::run_to_completion`]).
//!
//! The persisted cursor is authoritative; a cursor carried in the marker is
//! informational only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::MigrationEvent;
use crate::core::MigrationRunState;
use crate::core::StepKey;
use crate::core::progress::estimated_pages;
use crate::core::unix_millis;
use crate::interfaces::ProgressStore;
use crate::runtime::executor::ExecutorError;
use crate::runtime::executor::PageReport;
use crate::runtime::executor::StepExecutor;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of advancing a redirect-driven step by one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectStep {
    /// More pages remain; redirect with the updated marker.
    Continue(MigrationRunState, PageReport),
    /// The step completed and the marker was cleared.
    Finished(PageReport),
}

/// Redirect-driven continuation driver.
#[derive(Clone)]
pub struct RedirectDriver<S> {
    /// Shared step executor.
    executor: StepExecutor<S>,
}

// ============================================================================
// SECTION: Driver
// ============================================================================

impl<S> RedirectDriver<S>
where
    S: ProgressStore + Clone,
{
    /// Creates a redirect driver over an executor.
    #[must_use]
    pub const fn new(executor: StepExecutor<S>) -> Self {
        Self {
            executor,
        }
    }

    /// Starts (or restarts) the marker for `key` and persists it.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::ConfirmationRequired`] for the gated step, and
    /// other [`ExecutorError`]s when the step is unknown, counting fails, or
    /// the marker cannot be saved.
    pub fn start(
        &self,
        key: &StepKey,
        extra_params: BTreeMap<String, String>,
    ) -> Result<MigrationRunState, ExecutorError> {
        let step = self.executor.registry().get_step(key)?;
        if step.is_legacy_removal {
            let err = ExecutorError::ConfirmationRequired;
            self.executor.emit(
                &MigrationEvent::new("gate_refused").with_step(key).with_message(err.to_string()),
            );
            return Err(err);
        }
        let cursor = self.executor.progress(key)?.map_or(0, |record| record.cursor);
        let total = self.executor.estimate_total(key)?;
        let state = MigrationRunState {
            step_key: key.clone(),
            cursor,
            total,
            extra_params,
            estimated_pages: estimated_pages(total, step.page_size),
            started_at_ms: unix_millis(),
        };
        self.executor.store().save_run_state(&state)?;
        self.executor.emit(
            &MigrationEvent::new("upgrade_started")
                .with_step(key)
                .with_cursor(cursor, Some(total)),
        );
        Ok(state)
    }

    /// Returns the live marker for `key`, or starts one when no step is
    /// mid-upgrade.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::UpgradeInProgress`] while another step's
    /// marker is persisted, and the errors of [`Self::start`] otherwise.
    pub fn resume_or_start(
        &self,
        key: &StepKey,
        extra_params: BTreeMap<String, String>,
    ) -> Result<MigrationRunState, ExecutorError> {
        match self.resume()? {
            Some(state) if state.step_key == *key => Ok(state),
            Some(state) => {
                let err = ExecutorError::UpgradeInProgress(state.step_key.to_string());
                self.executor.emit(
                    &MigrationEvent::new("upgrade_refused")
                        .with_step(key)
                        .with_message(err.to_string()),
                );
                Err(err)
            }
            None => self.start(key, extra_params),
        }
    }

    /// Runs one page for the marker's step.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] from the page run or marker persistence.
    pub fn advance(&self, state: MigrationRunState) -> Result<RedirectStep, ExecutorError> {
        let report = self.executor.run_page(&state.step_key)?;
        if report.done {
            self.executor.store().clear_run_state()?;
            self.executor.emit(
                &MigrationEvent::new("upgrade_finished")
                    .with_step(&state.step_key)
                    .with_cursor(report.cursor, report.total_estimate),
            );
            return Ok(RedirectStep::Finished(report));
        }
        let page_size = self.executor.registry().get_step(&state.step_key)?.page_size;
        let total = report.total_estimate.unwrap_or(state.total);
        let next = MigrationRunState {
            cursor: report.cursor,
            total,
            estimated_pages: estimated_pages(total, page_size),
            ..state
        };
        self.executor.store().save_run_state(&next)?;
        Ok(RedirectStep::Continue(next, report))
    }

    /// Returns the persisted marker, if a step is mid-flight.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Store`] when the marker cannot be read.
    pub fn resume(&self) -> Result<Option<MigrationRunState>, ExecutorError> {
        Ok(self.executor.store().load_run_state()?)
    }

    /// Runs `key` to completion as an explicit loop.
    ///
    /// # Errors
    ///
    /// Returns the first [`ExecutorError`] raised by any page.
    pub fn run_to_completion(&self, key: &StepKey) -> Result<PageReport, ExecutorError> {
        let mut state = self.start(key, BTreeMap::new())?;
        loop {
            match self.advance(state)? {
                RedirectStep::Continue(next, _) => state = next,
                RedirectStep::Finished(report) => return Ok(report),
            }
        }
    }
}

// ============================================================================
// SECTION: Query Encoding
// ============================================================================

/// Query parameters that re-invoke the driver for `state`.
///
/// Extra parameters never override the reserved `step`, `cursor`, and
/// `total` names.
#[must_use]
pub fn redirect_query_params(state: &MigrationRunState) -> Vec<(String, String)> {
    let mut params = vec![
        ("step".to_string(), state.step_key.to_string()),
        ("cursor".to_string(), state.cursor.to_string()),
        ("total".to_string(), state.total.to_string()),
    ];
    params.extend(
        state
            .extra_params
            .iter()
            .filter(|(name, _)| !matches!(name.as_str(), "step" | "cursor" | "total"))
            .map(|(name, value)| (name.clone(), value.clone())),
    );
    params
}
