// crates/storefront-migrate-core/src/runtime/driver.rs
// ============================================================================
// Module: Progress-Reporting Driver
// Description: One page per call with a structured percentage, plus bulk mode.
// Purpose: Serve polling clients and out-of-band bulk runs from one executor.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! A polling client calls [`ProgressDriver::step`] until it observes
//! `done`, then moves to `next_step`. [`ProgressDriver::run_all`] performs
//! the same loop in-process for every non-gated step, setting the advisory
//! `legacy_running` flag while each step runs. Legacy removal is only
//! reachable through [`ProgressDriver::legacy_removal_step`] and
//! [`ProgressDriver::run_legacy_removal`], both of which require explicit
//! confirmation and an open gate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::MigrationEvent;
use crate::core::StepKey;
use crate::interfaces::ProgressStore;
use crate::runtime::executor::ExecutorError;
use crate::runtime::executor::PageReport;
use crate::runtime::executor::StepExecutor;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Progress returned to polling clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepProgress {
    /// Step that ran.
    pub step_key: StepKey,
    /// Persisted cursor after the page.
    pub cursor: u64,
    /// Total estimate.
    pub total_estimate: Option<u64>,
    /// Completion percentage.
    pub percent: u8,
    /// True once the step is completed.
    pub done: bool,
    /// Next step in registry order once this one is done.
    pub next_step: Option<StepKey>,
}

/// Progress-reporting continuation driver.
#[derive(Clone)]
pub struct ProgressDriver<S> {
    /// Shared step executor.
    executor: StepExecutor<S>,
}

// ============================================================================
// SECTION: Driver
// ============================================================================

impl<S> ProgressDriver<S>
where
    S: ProgressStore + Clone,
{
    /// Creates a progress driver over an executor.
    #[must_use]
    pub const fn new(executor: StepExecutor<S>) -> Self {
        Self {
            executor,
        }
    }

    /// Returns the underlying executor.
    #[must_use]
    pub const fn executor(&self) -> &StepExecutor<S> {
        &self.executor
    }

    /// Runs one page of `key`.
    ///
    /// `client_cursor` is informational; when it disagrees with the persisted
    /// cursor the mismatch is logged and the persisted cursor wins. The gated
    /// step is refused here; it only runs through
    /// [`ProgressDriver::legacy_removal_step`].
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::ConfirmationRequired`] for the gated step and
    /// any [`ExecutorError`] from the page run.
    pub fn step(
        &self,
        key: &StepKey,
        client_cursor: Option<u64>,
    ) -> Result<StepProgress, ExecutorError> {
        if self.executor.registry().get_step(key)?.is_legacy_removal {
            let err = ExecutorError::ConfirmationRequired;
            self.refused(&err);
            return Err(err);
        }
        let report = self.executor.run_page(key)?;
        if let Some(claimed) = client_cursor
            && claimed != report.starting_cursor()
        {
            self.executor.emit(
                &MigrationEvent::new("client_cursor_ignored")
                    .with_step(key)
                    .with_cursor(report.starting_cursor(), report.total_estimate)
                    .with_message(format!("client cursor {claimed}")),
            );
        }
        Ok(self.to_progress(report))
    }

    /// Runs one page of the gated step after validating the request.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::ConfirmationRequired`],
    /// [`ExecutorError::NotLegacyRemoval`], [`ExecutorError::GateClosed`],
    /// or any page error.
    pub fn legacy_removal_step(
        &self,
        key: &StepKey,
        confirmation: bool,
    ) -> Result<StepProgress, ExecutorError> {
        let gate = self.executor.gate();
        let key = match gate.authorize_legacy_removal(Some(key), confirmation) {
            Ok(key) => key,
            Err(err) => {
                self.refused(&err);
                return Err(err);
            }
        };
        let report = self.executor.run_page(&key)?;
        Ok(self.to_progress(report))
    }

    /// Returns the first non-gated step that has not completed.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Store`] when progress cannot be read.
    pub fn next_pending_step(&self) -> Result<Option<StepKey>, ExecutorError> {
        for step in self.executor.registry().migration_steps() {
            let completed =
                self.executor.store().load(&step.key)?.is_some_and(|record| record.completed);
            if !completed {
                return Ok(Some(step.key.clone()));
            }
        }
        Ok(None)
    }

    /// Runs every non-gated step to completion without client round-trips.
    ///
    /// `legacy_running` is set while each step runs and cleared afterwards,
    /// including when the step fails.
    ///
    /// # Errors
    ///
    /// Returns the first [`ExecutorError`] raised; later steps do not run.
    pub fn run_all<F>(&self, mut observer: F) -> Result<(), ExecutorError>
    where
        F: FnMut(&PageReport),
    {
        let keys: Vec<StepKey> = self
            .executor
            .registry()
            .migration_steps()
            .into_iter()
            .map(|step| step.key.clone())
            .collect();
        for key in keys {
            self.executor.mark_legacy_running(&key, true)?;
            let outcome = self.run_step_to_completion(&key, &mut observer);
            let cleared = self.executor.mark_legacy_running(&key, false);
            outcome?;
            cleared?;
        }
        self.executor.emit(&MigrationEvent::new("migration_completed"));
        Ok(())
    }

    /// Runs the gated step to completion after validating the request.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::ConfirmationRequired`],
    /// [`ExecutorError::GateClosed`], [`ExecutorError::NoLegacyRemovalStep`],
    /// or any page error.
    pub fn run_legacy_removal<F>(
        &self,
        confirmation: bool,
        mut observer: F,
    ) -> Result<PageReport, ExecutorError>
    where
        F: FnMut(&PageReport),
    {
        let key = match self.executor.gate().authorize_legacy_removal(None, confirmation) {
            Ok(key) => key,
            Err(err) => {
                self.refused(&err);
                return Err(err);
            }
        };
        self.run_step_to_completion(&key, &mut observer)
    }

    /// Loops one step until it reports done.
    fn run_step_to_completion<F>(
        &self,
        key: &StepKey,
        observer: &mut F,
    ) -> Result<PageReport, ExecutorError>
    where
        F: FnMut(&PageReport),
    {
        loop {
            let report = self.executor.run_page(key)?;
            observer(&report);
            if report.done {
                return Ok(report);
            }
        }
    }

    /// Converts a page report into client progress.
    fn to_progress(&self, report: PageReport) -> StepProgress {
        let next_step = if report.done {
            self.executor.registry().next_step_after(&report.step_key).map(|step| step.key.clone())
        } else {
            None
        };
        StepProgress {
            step_key: report.step_key,
            cursor: report.cursor,
            total_estimate: report.total_estimate,
            percent: report.percent,
            done: report.done,
            next_step,
        }
    }

    /// Logs a refused legacy-removal request.
    fn refused(&self, err: &ExecutorError) {
        self.executor.emit(&MigrationEvent::new("gate_refused").with_message(err.to_string()));
    }
}
