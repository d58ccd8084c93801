// crates/storefront-migrate-transformers/src/customer_emails.rs
// ============================================================================
// Module: Customer Email Transformer
// Description: Records primary and secondary email addresses per customer.
// Purpose: Populate `customer_email_addresses` from legacy payments.
// Dependencies: rusqlite, storefront-migrate-core, storefront-migrate-store-sqlite
// ============================================================================

//! ## Overview
//! The payment email becomes the customer's `primary` address. An email in
//! the payment's `user_info` that differs from it becomes a `secondary`
//! address. `(customer_id, email)` is unique, so replays insert nothing.

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

/// Customer email addresses derived from legacy payments.
pub struct CustomerEmailTransformer {
    /// Shared migration database.
    db: SqliteDatabase,
}

impl CustomerEmailTransformer {
    /// Creates the transformer.
    #[must_use]
    pub const fn new(db: SqliteDatabase) -> Self {
        Self {
            db,
        }
    }
}

impl Transformer for CustomerEmailTransformer {
    fn prepare(&self) -> Result<(), TransformError> {
        require_tables(&self.db, &["customers", "customer_email_addresses"])
    }

    fn count_estimate(&self) -> Result<u64, TransformError> {
        count_objects(&self.db, PAYMENT_TYPE)
    }

    fn fetch_page(&self, offset: u64, page_size: u64) -> Result<Vec<LegacyRecord>, TransformError> {
        fetch_objects(&self.db, PAYMENT_TYPE, offset, page_size)
    }

    fn migrate_one(&self, record: &LegacyRecord) -> Result<StepOutcome, TransformError> {
        let payment = Payment::new(expect_object(record)?);
        let Some(primary) = payment.email() else {
            return Ok(StepOutcome::Skipped);
        };
        let mut addresses = vec![("primary", primary.clone())];
        if let Some(secondary) = payment.user_info_email()
            && secondary != primary
        {
            addresses.push(("secondary", secondary));
        }
        let created = payment.date_created();

        self.db
            .with_connection(|connection| {
                let customer_id: Option<i64> = connection
                    .query_row(
                        "SELECT id FROM customers WHERE email = ?1",
                        params![primary],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(customer_id) = customer_id else {
                    return Ok(StepOutcome::Skipped);
                };
                let mut inserted = 0;
                for (kind, email) in &addresses {
                    inserted += connection.execute(
                        "INSERT OR IGNORE INTO customer_email_addresses (customer_id, type, \
                         email, date_created) VALUES (?1, ?2, ?3, ?4)",
                        params![customer_id, kind, email, created],
                    )?;
                }
                Ok(if inserted > 0 { StepOutcome::Migrated } else { StepOutcome::Skipped })
            })
            .map_err(record_failure(record))
    }
}
