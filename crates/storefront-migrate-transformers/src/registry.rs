// crates/storefront-migrate-transformers/src/registry.rs
// ============================================================================
// Module: Builtin Registry
// Description: Declares the builtin migration steps in execution order.
// Purpose: Bind every step key to its typed transformer at startup.
// Dependencies: storefront-migrate-core, storefront-migrate-store-sqlite
// ============================================================================

//! ## Overview
//! Priorities encode the data dependencies between steps: customers before
//! their emails and addresses, customers before orders, orders before notes.
//! The gated legacy-removal step always sorts last.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use storefront_migrate_core::Domain;
use storefront_migrate_core::MigrationRegistry;
use storefront_migrate_core::MigrationStep;
use storefront_migrate_core::RegistryEntry;
use storefront_migrate_core::RegistryError;
use storefront_migrate_store_sqlite::SqliteDatabase;

use crate::customer_addresses::CustomerAddressTransformer;
use crate::customer_emails::CustomerEmailTransformer;
use crate::customers::CustomerTransformer;
use crate::discounts::DiscountTransformer;
use crate::legacy_removal::LegacyRemovalProcessor;
use crate::logs::LogTransformer;
use crate::order_notes::OrderNoteTransformer;
use crate::orders::OrderTransformer;
use crate::tax_rates::TaxRateTransformer;

// ============================================================================
// SECTION: Step Keys
// ============================================================================

/// Customers from payments.
pub const MIGRATE_CUSTOMERS: &str = "migrate_customers";
/// Customer email addresses.
pub const MIGRATE_CUSTOMER_EMAILS: &str = "migrate_customer_email_addresses";
/// Customer billing addresses.
pub const MIGRATE_CUSTOMER_ADDRESSES: &str = "migrate_customer_addresses";
/// Orders and order items.
pub const MIGRATE_ORDERS: &str = "migrate_orders";
/// Order notes.
pub const MIGRATE_ORDER_NOTES: &str = "migrate_order_notes";
/// Discounts.
pub const MIGRATE_DISCOUNTS: &str = "migrate_discounts";
/// Tax rates.
pub const MIGRATE_TAX_RATES: &str = "migrate_tax_rates";
/// Logs.
pub const MIGRATE_LOGS: &str = "migrate_logs";
/// Gated legacy removal.
pub const REMOVE_LEGACY_DATA: &str = "remove_legacy_data";

/// Default records per page.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

// ============================================================================
// SECTION: Page Sizes
// ============================================================================

/// Page size selection for the builtin steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSizes {
    /// Size used when no override exists.
    pub default: u64,
    /// Per-step overrides keyed by step key.
    pub overrides: BTreeMap<String, u64>,
}

impl PageSizes {
    /// Uses `default` for every step.
    #[must_use]
    pub const fn uniform(default: u64) -> Self {
        Self {
            default,
            overrides: BTreeMap::new(),
        }
    }

    /// Returns the page size for `key`.
    #[must_use]
    pub fn for_step(&self, key: &str) -> u64 {
        self.overrides.get(key).copied().unwrap_or(self.default)
    }
}

impl Default for PageSizes {
    fn default() -> Self {
        Self::uniform(DEFAULT_PAGE_SIZE)
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Builds the builtin registry over `db`.
///
/// # Errors
///
/// Returns [`RegistryError`] when a page size is zero.
pub fn builtin_registry(
    db: &SqliteDatabase,
    page_sizes: &PageSizes,
) -> Result<MigrationRegistry, RegistryError> {
    let step = |key: &str, label: &str, priority: u32, domain: Domain| {
        MigrationStep::new(key, label, priority, domain, page_sizes.for_step(key))
    };
    MigrationRegistry::new(vec![
        RegistryEntry::new(
            step(MIGRATE_CUSTOMERS, "Customers", 10, Domain::Customers),
            Arc::new(CustomerTransformer::new(db.clone())),
        ),
        RegistryEntry::new(
            step(
                MIGRATE_CUSTOMER_EMAILS,
                "Customer email addresses",
                20,
                Domain::CustomerEmailAddresses,
            ),
            Arc::new(CustomerEmailTransformer::new(db.clone())),
        ),
        RegistryEntry::new(
            step(MIGRATE_CUSTOMER_ADDRESSES, "Customer addresses", 30, Domain::CustomerAddresses),
            Arc::new(CustomerAddressTransformer::new(db.clone())),
        ),
        RegistryEntry::new(
            step(MIGRATE_ORDERS, "Orders", 40, Domain::Orders),
            Arc::new(OrderTransformer::new(db.clone())),
        ),
        RegistryEntry::new(
            step(MIGRATE_ORDER_NOTES, "Order notes", 50, Domain::OrderNotes),
            Arc::new(OrderNoteTransformer::new(db.clone())),
        ),
        RegistryEntry::new(
            step(MIGRATE_DISCOUNTS, "Discounts", 60, Domain::Discounts),
            Arc::new(DiscountTransformer::new(db.clone())),
        ),
        RegistryEntry::new(
            step(MIGRATE_TAX_RATES, "Tax rates", 70, Domain::TaxRates),
            Arc::new(TaxRateTransformer::new(db.clone())),
        ),
        RegistryEntry::new(
            step(MIGRATE_LOGS, "Logs", 80, Domain::Logs),
            Arc::new(LogTransformer::new(db.clone())),
        ),
        RegistryEntry::new(
            MigrationStep::legacy_removal(
                REMOVE_LEGACY_DATA,
                "Remove legacy data",
                1_000,
                page_sizes.for_step(REMOVE_LEGACY_DATA),
            ),
            Arc::new(LegacyRemovalProcessor::new(db.clone())),
        ),
    ])
}
