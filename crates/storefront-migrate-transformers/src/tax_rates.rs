// crates/storefront-migrate-transformers/src/tax_rates.rs
// ============================================================================
// Module: Tax Rate Transformer
// Description: Converts the legacy tax rate blob into scoped tax rate rows.
// Purpose: Populate `tax_rates` keyed by country, region, and scope.
// Dependencies: rusqlite, storefront-migrate-core, storefront-migrate-store-sqlite
// ============================================================================

//! ## Overview
//! Each `edd_tax_rates` entry carries a country, an optional state, a
//! `global` flag, and a percentage. Global or stateless entries become
//! country-scoped rates; the rest are region-scoped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::params;
use storefront_migrate_core::LegacyRecord;
use storefront_migrate_core::StepOutcome;
use storefront_migrate_core::TransformError;
use storefront_migrate_core::Transformer;
use storefront_migrate_store_sqlite::SqliteDatabase;

use crate::legacy::TAX_RATES_OPTION;
use crate::legacy::blob_entries;
use crate::legacy::blob_page;
use crate::legacy::expect_entry;
use crate::legacy::invalid_record;
use crate::legacy::record_failure;
use crate::legacy::require_tables;

// ============================================================================
// SECTION: Transformer
// ============================================================================

/// Tax rates exploded from the legacy option blob.
pub struct TaxRateTransformer {
    /// Shared migration database.
    db: SqliteDatabase,
}

impl TaxRateTransformer {
    /// Creates the transformer.
    #[must_use]
    pub const fn new(db: SqliteDatabase) -> Self {
        Self {
            db,
        }
    }
}

impl Transformer for TaxRateTransformer {
    fn prepare(&self) -> Result<(), TransformError> {
        require_tables(&self.db, &["tax_rates"])
    }

    fn count_estimate(&self) -> Result<u64, TransformError> {
        Ok(u64::try_from(blob_entries(&self.db, TAX_RATES_OPTION)?.len()).unwrap_or(u64::MAX))
    }

    fn fetch_page(&self, offset: u64, page_size: u64) -> Result<Vec<LegacyRecord>, TransformError> {
        blob_page(&self.db, TAX_RATES_OPTION, offset, page_size)
    }

    fn migrate_one(&self, record: &LegacyRecord) -> Result<StepOutcome, TransformError> {
        let entry = expect_entry(record)?;
        let Some(country) = entry.field_str("country") else {
            return Ok(StepOutcome::Skipped);
        };
        let Some(rate) = entry.field_f64("rate") else {
            return Err(invalid_record(record, "tax rate is not numeric"));
        };
        let state = entry.field_str("state").unwrap_or_default();
        let (scope, region) = if entry.field_bool("global") || state.is_empty() {
            ("country", String::new())
        } else {
            ("region", state)
        };
        let rate = rate.clamp(0.0, 100.0);

        self.db
            .with_connection(|connection| {
                let inserted = connection.execute(
                    "INSERT OR IGNORE INTO tax_rates (country, region, scope, rate, status) VALUES \
                     (?1, ?2, ?3, ?4, 'active')",
                    params![country.to_ascii_uppercase(), region, scope, rate],
                )?;
                Ok(if inserted > 0 { StepOutcome::Migrated } else { StepOutcome::Skipped })
            })
            .map_err(record_failure(record))
    }
}
