// crates/storefront-migrate-core/src/core/progress.rs
// ============================================================================
// Module: Migration Progress State
// Description: Persisted per-step progress and the in-flight run marker.
// Purpose: Capture cursor, totals, and completion for resumable steps.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`ProgressRecord`] is the only durable state a step owns. It is created
//! lazily on the first invocation of the step, advanced after every page and
//! deleted only by reset tooling. [`MigrationRunState`] is the explicit form
//! of the redirect driver's "doing upgrade" marker.
//!
//! Invariants:
//! - `cursor` never decreases.
//! - `completed` only moves from `false` to `true` outside of reset tooling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::StepKey;

// ============================================================================
// SECTION: Step State
// ============================================================================

/// Lifecycle state derived from a step's progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// No progress record exists yet.
    NotStarted,
    /// At least one page ran but the step is not complete.
    InProgress,
    /// An empty page (or empty domain) completed the step.
    Completed,
}

// ============================================================================
// SECTION: Progress Record
// ============================================================================

/// Durable progress for one migration step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Step this record belongs to.
    pub step_key: StepKey,
    /// Number of legacy records already fetched.
    pub cursor: u64,
    /// Page size in effect for the step.
    pub page_size: u64,
    /// Best-effort record count used only for percentages.
    pub total_estimate: Option<u64>,
    /// Set once the step observed an empty page.
    pub completed: bool,
    /// Set while an out-of-band bulk run owns the step.
    pub legacy_running: bool,
    /// Last update timestamp (unix millis).
    pub updated_at_ms: i64,
}

impl ProgressRecord {
    /// Creates an empty record for a step that has not run yet.
    #[must_use]
    pub fn new(step_key: StepKey, page_size: u64, now_ms: i64) -> Self {
        Self {
            step_key,
            cursor: 0,
            page_size,
            total_estimate: None,
            completed: false,
            legacy_running: false,
            updated_at_ms: now_ms,
        }
    }

    /// Returns the completion percentage in `0..=100`.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.completed {
            return 100;
        }
        percent_of(self.cursor, self.total_estimate.unwrap_or(0))
    }

    /// Returns the lifecycle state for an existing record.
    #[must_use]
    pub const fn state(&self) -> StepState {
        if self.completed { StepState::Completed } else { StepState::InProgress }
    }

    /// Returns true when the total estimate should be recomputed.
    #[must_use]
    pub const fn needs_estimate(&self) -> bool {
        match self.total_estimate {
            None => true,
            Some(total) => total <= 1,
        }
    }

    /// Advances the cursor by the number of records fetched.
    pub const fn advance(&mut self, fetched: u64, now_ms: i64) {
        self.cursor = self.cursor.saturating_add(fetched);
        self.updated_at_ms = now_ms;
    }

    /// Marks the step completed.
    pub const fn mark_completed(&mut self, now_ms: i64) {
        self.completed = true;
        self.updated_at_ms = now_ms;
    }
}

/// Computes `min(100, cursor * 100 / max(total, 1))`.
#[must_use]
pub fn percent_of(cursor: u64, total: u64) -> u8 {
    let scaled = u128::from(cursor) * 100 / u128::from(total.max(1));
    u8::try_from(scaled.min(100)).unwrap_or(100)
}

// ============================================================================
// SECTION: Run State
// ============================================================================

/// In-flight marker for the redirect-driven driver.
///
/// Created when a step starts, updated after every page, and cleared when the
/// step completes. The marker is passed explicitly through the driver and
/// persisted only so an operator who navigates away can resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRunState {
    /// Step currently running.
    pub step_key: StepKey,
    /// Cursor after the last completed page.
    pub cursor: u64,
    /// Total estimate captured when the step started.
    pub total: u64,
    /// Opaque parameters carried across redirects.
    pub extra_params: BTreeMap<String, String>,
    /// Estimated number of pages for the step.
    pub estimated_pages: u64,
    /// Timestamp the run started (unix millis).
    pub started_at_ms: i64,
}

impl MigrationRunState {
    /// Returns the completion percentage in `0..=100`.
    #[must_use]
    pub fn percent(&self) -> u8 {
        percent_of(self.cursor, self.total)
    }
}

/// Number of pages needed to cover `total` records.
#[must_use]
pub const fn estimated_pages(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}
