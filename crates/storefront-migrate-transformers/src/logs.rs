// crates/storefront-migrate-transformers/src/logs.rs
// ============================================================================
// Module: Log Transformer
// Description: Converts legacy log objects into normalized log rows.
// Purpose: Populate `logs` keyed by legacy log id.
// Dependencies: rusqlite, storefront-migrate-core, storefront-migrate-store-sqlite
// ============================================================================

//! ## Overview
//! Log type comes from `_edd_log_type` (default `event`). The logged object
//! is the payment from `_edd_log_payment_id`, else the download from
//! `_edd_log_file_id`, else the legacy parent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::params;
use storefront_migrate_core::LegacyObject;
use storefront_migrate_core::LegacyRecord;
use storefront_migrate_core::StepOutcome;
use storefront_migrate_core::TransformError;
use storefront_migrate_core::Transformer;
use storefront_migrate_store_sqlite::SqliteDatabase;

use crate::legacy::LOG_TYPE;
use crate::legacy::count_objects;
use crate::legacy::expect_object;
use crate::legacy::fetch_objects;
use crate::legacy::legacy_date;
use crate::legacy::record_failure;
use crate::legacy::require_tables;

// ============================================================================
// SECTION: Transformer
// ============================================================================

/// Logs derived from legacy log objects.
pub struct LogTransformer {
    /// Shared migration database.
    db: SqliteDatabase,
}

impl LogTransformer {
    /// Creates the transformer.
    #[must_use]
    pub const fn new(db: SqliteDatabase) -> Self {
        Self {
            db,
        }
    }
}

impl Transformer for LogTransformer {
    fn prepare(&self) -> Result<(), TransformError> {
        require_tables(&self.db, &["logs"])
    }

    fn count_estimate(&self) -> Result<u64, TransformError> {
        count_objects(&self.db, LOG_TYPE)
    }

    fn fetch_page(&self, offset: u64, page_size: u64) -> Result<Vec<LegacyRecord>, TransformError> {
        fetch_objects(&self.db, LOG_TYPE, offset, page_size)
    }

    fn migrate_one(&self, record: &LegacyRecord) -> Result<StepOutcome, TransformError> {
        let log = expect_object(record)?;
        let kind = log.meta_str("_edd_log_type").unwrap_or_else(|| "event".to_string());
        let (object_id, object_type) = logged_object(log);
        let user_id = log.meta_i64("_edd_log_user_id").unwrap_or(0).max(0);
        let ip = log.meta_str("_edd_log_ip").unwrap_or_default();
        let created = legacy_date(&log.created_at);

        self.db
            .with_connection(|connection| {
                let inserted = connection.execute(
                    "INSERT OR IGNORE INTO logs (legacy_id, object_id, object_type, type, title, \
                     content, user_id, ip, date_created) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, \
                     ?9)",
                    params![
                        log.id,
                        object_id,
                        object_type,
                        kind,
                        log.title,
                        log.content,
                        user_id,
                        ip,
                        created
                    ],
                )?;
                Ok(if inserted > 0 { StepOutcome::Migrated } else { StepOutcome::Skipped })
            })
            .map_err(record_failure(record))
    }
}

/// Resolves the object a log entry refers to.
fn logged_object(log: &LegacyObject) -> (i64, &'static str) {
    if let Some(payment) = log.meta_i64("_edd_log_payment_id").filter(|id| *id > 0) {
        return (payment, "order");
    }
    if let Some(file) = log.meta_i64("_edd_log_file_id").filter(|id| *id > 0) {
        return (file, "download");
    }
    if log.parent_id > 0 {
        return (log.parent_id, "download");
    }
    (0, "")
}
