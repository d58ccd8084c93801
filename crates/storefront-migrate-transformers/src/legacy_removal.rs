// crates/storefront-migrate-transformers/src/legacy_removal.rs
// ============================================================================
// Module: Legacy Removal Processor
// Description: Ordered cleanup tasks that delete migrated legacy data.
// Purpose: Back the gated, irreversible final step.
// Dependencies: rusqlite, storefront-migrate-core, storefront-migrate-store-sqlite
// ============================================================================

//! ## Overview
//! This is the only processor that mutates legacy storage. Its "records" are
//! a fixed task list, paged like any other domain, so an interrupted removal
//! resumes at the next task. Every task is an idempotent `DELETE`, and
//! metadata goes before the objects that own it. A failed task is fatal so
//! the step stops at that task and the gate stays open for a re-run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::params;
use storefront_migrate_core::LegacyRecord;
use storefront_migrate_core::LegacyTask;
use storefront_migrate_core::StepOutcome;
use storefront_migrate_core::TransformError;
use storefront_migrate_core::Transformer;
use storefront_migrate_store_sqlite::SqliteDatabase;

use crate::legacy::DISCOUNTS_OPTION;
use crate::legacy::LOG_TYPE;
use crate::legacy::NOTE_TYPE;
use crate::legacy::PAYMENT_TYPE;
use crate::legacy::TAX_RATES_OPTION;
use crate::legacy::invalid_record;

// ============================================================================
// SECTION: Tasks
// ============================================================================

/// Cleanup tasks in execution order.
pub const LEGACY_REMOVAL_TASKS: &[&str] = &[
    "delete_payment_meta",
    "delete_note_meta",
    "delete_log_meta",
    "delete_payment_notes",
    "delete_logs",
    "delete_payments",
    "delete_discount_option",
    "delete_tax_rate_option",
];

/// Statement deleting one object type's metadata.
const DELETE_META: &str =
    "DELETE FROM legacy_meta WHERE object_id IN (SELECT id FROM legacy_objects WHERE object_type \
     = ?1)";
/// Statement deleting one object type.
const DELETE_OBJECTS: &str = "DELETE FROM legacy_objects WHERE object_type = ?1";
/// Statement deleting one option.
const DELETE_OPTION: &str = "DELETE FROM legacy_options WHERE option_name = ?1";

/// Returns the statement and bound argument for a task.
fn task_statement(name: &str) -> Option<(&'static str, &'static str)> {
    Some(match name {
        "delete_payment_meta" => (DELETE_META, PAYMENT_TYPE),
        "delete_note_meta" => (DELETE_META, NOTE_TYPE),
        "delete_log_meta" => (DELETE_META, LOG_TYPE),
        "delete_payment_notes" => (DELETE_OBJECTS, NOTE_TYPE),
        "delete_logs" => (DELETE_OBJECTS, LOG_TYPE),
        "delete_payments" => (DELETE_OBJECTS, PAYMENT_TYPE),
        "delete_discount_option" => (DELETE_OPTION, DISCOUNTS_OPTION),
        "delete_tax_rate_option" => (DELETE_OPTION, TAX_RATES_OPTION),
        _ => return None,
    })
}

// ============================================================================
// SECTION: Processor
// ============================================================================

/// Deletes legacy data once every migration step has completed.
pub struct LegacyRemovalProcessor {
    /// Shared migration database.
    db: SqliteDatabase,
}

impl LegacyRemovalProcessor {
    /// Creates the processor.
    #[must_use]
    pub const fn new(db: SqliteDatabase) -> Self {
        Self {
            db,
        }
    }
}

impl Transformer for LegacyRemovalProcessor {
    fn count_estimate(&self) -> Result<u64, TransformError> {
        Ok(u64::try_from(LEGACY_REMOVAL_TASKS.len()).unwrap_or(u64::MAX))
    }

    fn fetch_page(&self, offset: u64, page_size: u64) -> Result<Vec<LegacyRecord>, TransformError> {
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(page_size).unwrap_or(usize::MAX);
        Ok(LEGACY_REMOVAL_TASKS
            .iter()
            .enumerate()
            .skip(skip)
            .take(take)
            .map(|(position, name)| {
                LegacyRecord::Task(LegacyTask {
                    position: u64::try_from(position).unwrap_or(u64::MAX),
                    name: (*name).to_string(),
                })
            })
            .collect())
    }

    fn migrate_one(&self, record: &LegacyRecord) -> Result<StepOutcome, TransformError> {
        let LegacyRecord::Task(task) = record else {
            return Err(invalid_record(record, "expected a cleanup task"));
        };
        let Some((statement, argument)) = task_statement(&task.name) else {
            return Err(invalid_record(record, format!("unknown cleanup task {}", task.name)));
        };
        let deleted = self
            .db
            .with_connection(|connection| Ok(connection.execute(statement, params![argument])?))
            .map_err(|err| {
                TransformError::Fatal(format!("cleanup task {} failed: {err}", task.name))
            })?;
        Ok(if deleted > 0 { StepOutcome::Migrated } else { StepOutcome::Skipped })
    }
}
