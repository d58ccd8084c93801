// crates/storefront-migrate-transformers/src/customer_addresses.rs
// ============================================================================
// Module: Customer Address Transformer
// Description: Extracts billing addresses from legacy payment blobs.
// Purpose: Populate `customer_addresses` without duplicates.
// Dependencies: rusqlite, storefront-migrate-core, storefront-migrate-store-sqlite
// ============================================================================

//! ## Overview
//! Each payment's `user_info.address` becomes a `billing` address of the
//! customer owning the payment email. Blank addresses are skipped and the
//! full address tuple is unique per customer.

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

/// Customer billing addresses derived from legacy payments.
pub struct CustomerAddressTransformer {
    /// Shared migration database.
    db: SqliteDatabase,
}

impl CustomerAddressTransformer {
    /// Creates the transformer.
    #[must_use]
    pub const fn new(db: SqliteDatabase) -> Self {
        Self {
            db,
        }
    }
}

impl Transformer for CustomerAddressTransformer {
    fn prepare(&self) -> Result<(), TransformError> {
        require_tables(&self.db, &["customers", "customer_addresses"])
    }

    fn count_estimate(&self) -> Result<u64, TransformError> {
        count_objects(&self.db, PAYMENT_TYPE)
    }

    fn fetch_page(&self, offset: u64, page_size: u64) -> Result<Vec<LegacyRecord>, TransformError> {
        fetch_objects(&self.db, PAYMENT_TYPE, offset, page_size)
    }

    fn migrate_one(&self, record: &LegacyRecord) -> Result<StepOutcome, TransformError> {
        let payment = Payment::new(expect_object(record)?);
        let address = payment.address();
        let Some(email) = payment.email() else {
            return Ok(StepOutcome::Skipped);
        };
        if address.is_empty() {
            return Ok(StepOutcome::Skipped);
        }
        let name = payment.name();
        let created = payment.date_created();

        self.db
            .with_connection(|connection| {
                let customer_id: Option<i64> = connection
                    .query_row(
                        "SELECT id FROM customers WHERE email = ?1",
                        params![email],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(customer_id) = customer_id else {
                    return Ok(StepOutcome::Skipped);
                };
                let inserted = connection.execute(
                    "INSERT OR IGNORE INTO customer_addresses (customer_id, type, name, address, \
                     address2, city, region, postal_code, country, date_created) VALUES (?1, \
                     'billing', ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        customer_id,
                        name,
                        address.line1,
                        address.line2,
                        address.city,
                        address.region,
                        address.postal_code,
                        address.country,
                        created
                    ],
                )?;
                Ok(if inserted > 0 { StepOutcome::Migrated } else { StepOutcome::Skipped })
            })
            .map_err(record_failure(record))
    }
}
