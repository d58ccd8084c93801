// crates/storefront-migrate-transformers/src/order_notes.rs
// ============================================================================
// Module: Order Note Transformer
// Description: Moves legacy payment notes onto migrated orders.
// Purpose: Populate `notes` attached to orders by legacy parent id.
// Dependencies: rusqlite, storefront-migrate-core, storefront-migrate-store-sqlite
// ============================================================================

//! ## Overview
//! A note's parent is the legacy payment id. Notes whose order has not been
//! migrated are skipped so the step never writes dangling rows.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::OptionalExtension;
use rusqlite::params;
use storefront_migrate_core::LegacyRecord;
use storefront_migrate_core::StepOutcome;
use storefront_migrate_core::TransformError;
use storefront_migrate_core::Transformer;
use storefront_migrate_store_sqlite::SqliteDatabase;

use crate::legacy::NOTE_TYPE;
use crate::legacy::count_objects;
use crate::legacy::expect_object;
use crate::legacy::fetch_objects;
use crate::legacy::legacy_date;
use crate::legacy::record_failure;
use crate::legacy::require_tables;

// ============================================================================
// SECTION: Transformer
// ============================================================================

/// Order notes derived from legacy payment notes.
pub struct OrderNoteTransformer {
    /// Shared migration database.
    db: SqliteDatabase,
}

impl OrderNoteTransformer {
    /// Creates the transformer.
    #[must_use]
    pub const fn new(db: SqliteDatabase) -> Self {
        Self {
            db,
        }
    }
}

impl Transformer for OrderNoteTransformer {
    fn prepare(&self) -> Result<(), TransformError> {
        require_tables(&self.db, &["orders", "notes"])
    }

    fn count_estimate(&self) -> Result<u64, TransformError> {
        count_objects(&self.db, NOTE_TYPE)
    }

    fn fetch_page(&self, offset: u64, page_size: u64) -> Result<Vec<LegacyRecord>, TransformError> {
        fetch_objects(&self.db, NOTE_TYPE, offset, page_size)
    }

    fn migrate_one(&self, record: &LegacyRecord) -> Result<StepOutcome, TransformError> {
        let note = expect_object(record)?;
        let created = legacy_date(&note.created_at);
        self.db
            .with_connection(|connection| {
                let order_id: Option<i64> = connection
                    .query_row(
                        "SELECT id FROM orders WHERE legacy_id = ?1",
                        params![note.parent_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(order_id) = order_id else {
                    return Ok(StepOutcome::Skipped);
                };
                let inserted = connection.execute(
                    "INSERT OR IGNORE INTO notes (legacy_id, object_id, object_type, content, \
                     date_created) VALUES (?1, ?2, 'order', ?3, ?4)",
                    params![note.id, order_id, note.content, created],
                )?;
                Ok(if inserted > 0 { StepOutcome::Migrated } else { StepOutcome::Skipped })
            })
            .map_err(record_failure(record))
    }
}
