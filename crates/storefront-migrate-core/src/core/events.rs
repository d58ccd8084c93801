// crates/storefront-migrate-core/src/core/events.rs
// ============================================================================
// Module: Migration Events
// Description: Structured log events emitted while steps run.
// Purpose: Give every sink one JSON-line payload shape.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Events are written as one JSON object per line. Optional fields are
//! omitted when unset so page events stay compact.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::identifiers::StepKey;

// ============================================================================
// SECTION: Event Payload
// ============================================================================

/// Structured migration event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationEvent {
    /// Event identifier (`page_completed`, `record_failed`, ...).
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Step the event belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_key: Option<StepKey>,
    /// Cursor after the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<u64>,
    /// Total estimate when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_estimate: Option<u64>,
    /// Records fetched in the page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched: Option<u64>,
    /// Records migrated in the page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrated: Option<u64>,
    /// Records skipped in the page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<u64>,
    /// Records that failed in the page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<u64>,
    /// Legacy record identifier for per-record events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
    /// Free-form detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MigrationEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(event: &'static str) -> Self {
        Self {
            event,
            timestamp_ms: now_millis(),
            step_key: None,
            cursor: None,
            total_estimate: None,
            fetched: None,
            migrated: None,
            skipped: None,
            failed: None,
            record: None,
            message: None,
        }
    }

    /// Attaches the step key.
    #[must_use]
    pub fn with_step(mut self, step_key: &StepKey) -> Self {
        self.step_key = Some(step_key.clone());
        self
    }

    /// Attaches cursor and total estimate.
    #[must_use]
    pub const fn with_cursor(mut self, cursor: u64, total_estimate: Option<u64>) -> Self {
        self.cursor = Some(cursor);
        self.total_estimate = total_estimate;
        self
    }

    /// Attaches page counters.
    #[must_use]
    pub const fn with_counts(mut self, fetched: u64, migrated: u64, skipped: u64, failed: u64) -> Self {
        self.fetched = Some(fetched);
        self.migrated = Some(migrated);
        self.skipped = Some(skipped);
        self.failed = Some(failed);
        self
    }

    /// Attaches a legacy record identifier.
    #[must_use]
    pub fn with_record(mut self, record: impl Into<String>) -> Self {
        self.record = Some(record.into());
        self
    }

    /// Attaches a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Milliseconds since the unix epoch.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or_default()
}
