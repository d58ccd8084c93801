// crates/storefront-migrate-transformers/src/customers.rs
// ============================================================================
// Module: Customer Transformer
// Description: Builds customer rows from legacy payments, merged by email.
// Purpose: Populate `customers` with purchase counts and lifetime value.
// Dependencies: rusqlite, storefront-migrate-core, storefront-migrate-store-sqlite
// ============================================================================

//! ## Overview
//! Every payment with an email resolves to exactly one customer. A payment
//! with a valid purchase status bumps `purchase_count` and `purchase_value`
//! once; the customer row lists the legacy ids it already counted in
//! `payment_ids`, which makes replays no-ops.

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

use crate::legacy::PAYMENT_TYPE;
use crate::legacy::count_objects;
use crate::legacy::expect_object;
use crate::legacy::fetch_objects;
use crate::legacy::record_failure;
use crate::legacy::require_tables;
use crate::payment::Payment;

// ============================================================================
// SECTION: Transformer
// ============================================================================

/// Customers derived from legacy payments.
pub struct CustomerTransformer {
    /// Shared migration database.
    db: SqliteDatabase,
}

impl CustomerTransformer {
    /// Creates the transformer.
    #[must_use]
    pub const fn new(db: SqliteDatabase) -> Self {
        Self {
            db,
        }
    }
}

impl Transformer for CustomerTransformer {
    fn prepare(&self) -> Result<(), TransformError> {
        require_tables(&self.db, &["customers"])
    }

    fn count_estimate(&self) -> Result<u64, TransformError> {
        count_objects(&self.db, PAYMENT_TYPE)
    }

    fn fetch_page(&self, offset: u64, page_size: u64) -> Result<Vec<LegacyRecord>, TransformError> {
        fetch_objects(&self.db, PAYMENT_TYPE, offset, page_size)
    }

    fn migrate_one(&self, record: &LegacyRecord) -> Result<StepOutcome, TransformError> {
        let payment = Payment::new(expect_object(record)?);
        let Some(email) = payment.email() else {
            return Ok(StepOutcome::Skipped);
        };
        let legacy_id = payment.id().to_string();
        let counts = payment.is_valid_purchase();
        let total = if counts { payment.total() } else { 0.0 };
        let name = payment.name();
        let user_id = payment.user_id();
        let created = payment.date_created();

        self.db
            .with_connection(|connection| {
                let tx = connection.transaction()?;
                let existing: Option<(i64, String)> = tx
                    .query_row(
                        "SELECT id, payment_ids FROM customers WHERE email = ?1",
                        params![email],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                let outcome = match existing {
                    None => {
                        let (count, ids) =
                            if counts { (1_i64, legacy_id.clone()) } else { (0, String::new()) };
                        tx.execute(
                            "INSERT INTO customers (email, user_id, name, status, purchase_count, \
                             purchase_value, payment_ids, date_created) VALUES (?1, ?2, ?3, \
                             'active', ?4, ?5, ?6, ?7)",
                            params![email, user_id, name, count, total, ids, created],
                        )?;
                        StepOutcome::Migrated
                    }
                    Some((_, ids)) if !counts || ids.split(',').any(|id| id == legacy_id) => {
                        StepOutcome::Skipped
                    }
                    Some((id, ids)) => {
                        let ids =
                            if ids.is_empty() { legacy_id.clone() } else { format!("{ids},{legacy_id}") };
                        tx.execute(
                            "UPDATE customers SET purchase_count = purchase_count + 1, \
                             purchase_value = purchase_value + ?1, payment_ids = ?2, user_id = \
                             CASE WHEN user_id = 0 THEN ?3 ELSE user_id END, name = CASE WHEN \
                             name = '' THEN ?4 ELSE name END WHERE id = ?5",
                            params![total, ids, user_id, name, id],
                        )?;
                        StepOutcome::Migrated
                    }
                };
                tx.commit()?;
                Ok(outcome)
            })
            .map_err(record_failure(record))
    }
}
