// crates/storefront-migrate-transformers/src/discounts.rs
// ============================================================================
// Module: Discount Transformer
// Description: Explodes the legacy discount option blob into discount rows.
// Purpose: Populate `discounts` with remapped field names.
// Dependencies: rusqlite, serde_json, storefront-migrate-core, storefront-migrate-store-sqlite
// ============================================================================

//! ## Overview
//! The `edd_discounts` option is a JSON object keyed by legacy discount id.
//! Entries are paged in numeric key order. Legacy field names are remapped
//! (`uses` to `use_count`, `max` to `max_uses`, `min_price` to
//! `min_charge_amount`, `is_single_use` to `once_per_customer`, `start` and
//! `expiration` to the date columns). The code is the natural key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::params;
use serde_json::Value;
use storefront_migrate_core::LegacyBlobEntry;
use storefront_migrate_core::LegacyRecord;
use storefront_migrate_core::StepOutcome;
use storefront_migrate_core::TransformError;
use storefront_migrate_core::Transformer;
use storefront_migrate_store_sqlite::SqliteDatabase;

use crate::legacy::DISCOUNTS_OPTION;
use crate::legacy::blob_entries;
use crate::legacy::blob_page;
use crate::legacy::expect_entry;
use crate::legacy::invalid_record;
use crate::legacy::legacy_date;
use crate::legacy::record_failure;
use crate::legacy::require_tables;

// ============================================================================
// SECTION: Transformer
// ============================================================================

/// Discounts exploded from the legacy option blob.
pub struct DiscountTransformer {
    /// Shared migration database.
    db: SqliteDatabase,
}

impl DiscountTransformer {
    /// Creates the transformer.
    #[must_use]
    pub const fn new(db: SqliteDatabase) -> Self {
        Self {
            db,
        }
    }
}

impl Transformer for DiscountTransformer {
    fn prepare(&self) -> Result<(), TransformError> {
        require_tables(&self.db, &["discounts"])
    }

    fn count_estimate(&self) -> Result<u64, TransformError> {
        Ok(u64::try_from(blob_entries(&self.db, DISCOUNTS_OPTION)?.len()).unwrap_or(u64::MAX))
    }

    fn fetch_page(&self, offset: u64, page_size: u64) -> Result<Vec<LegacyRecord>, TransformError> {
        blob_page(&self.db, DISCOUNTS_OPTION, offset, page_size)
    }

    fn migrate_one(&self, record: &LegacyRecord) -> Result<StepOutcome, TransformError> {
        let entry = expect_entry(record)?;
        if !entry.value.is_object() {
            return Err(invalid_record(record, "discount entry is not an object"));
        }
        let code = entry.field_str("code").unwrap_or_else(|| format!("legacy-{}", entry.key));
        let name = entry.field_str("name").unwrap_or_else(|| code.clone());
        let status = entry.field_str("status").unwrap_or_else(|| "active".to_string());
        let amount_type =
            entry.field_str("type").map(|kind| kind.to_ascii_lowercase()).unwrap_or_default();
        let legacy_id = entry.key.parse::<i64>().ok();
        let product_reqs = id_list(entry, "product_reqs");
        let excluded = id_list(entry, "excluded_products");
        let start = entry.field_str("start").and_then(|text| legacy_date(&text));
        let end = entry.field_str("expiration").and_then(|text| legacy_date(&text));

        self.db
            .with_connection(|connection| {
                let inserted = connection.execute(
                    "INSERT OR IGNORE INTO discounts (legacy_id, code, name, status, amount, \
                     amount_type, use_count, max_uses, min_charge_amount, once_per_customer, \
                     product_reqs, excluded_products, start_date, end_date) VALUES (?1, ?2, ?3, \
                     ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                    params![
                        legacy_id,
                        code,
                        name,
                        status,
                        entry.field_f64("amount").unwrap_or(0.0),
                        amount_type,
                        entry.field_i64("uses").unwrap_or(0).max(0),
                        entry.field_i64("max").unwrap_or(0).max(0),
                        entry.field_f64("min_price").unwrap_or(0.0),
                        entry.field_bool("is_single_use"),
                        product_reqs,
                        excluded,
                        start,
                        end
                    ],
                )?;
                Ok(if inserted > 0 { StepOutcome::Migrated } else { StepOutcome::Skipped })
            })
            .map_err(record_failure(record))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders a product id list field as a JSON array.
///
/// Arrays keep their elements, a scalar becomes a one-element array, and a
/// missing or empty field becomes `[]`.
fn id_list(entry: &LegacyBlobEntry, name: &str) -> String {
    let items = match entry.field(name) {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(Value::String(text)) if text.trim().is_empty() => Vec::new(),
        Some(other) => vec![other.clone()],
    };
    Value::Array(items).to_string()
}
