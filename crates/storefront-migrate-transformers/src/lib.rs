// crates/storefront-migrate-transformers/src/lib.rs
// ============================================================================
// Module: Storefront Migrate Transformers
// Description: Per-domain legacy record transformers on SQLite.
// Purpose: Convert legacy objects and option blobs into normalized rows.
// Dependencies: storefront-migrate-core, storefront-migrate-store-sqlite, rusqlite, time
// ============================================================================

//! ## Overview
//! One [`Transformer`] per domain reads legacy storage in stable pages and
//! writes normalized rows guarded by natural keys, so replaying a record is
//! a no-op. [`builtin_registry`] binds them to their step keys. The
//! legacy-removal processor is the only component that deletes legacy data.
//!
//! [`Transformer`]: storefront_migrate_core::Transformer

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod customer_addresses;
pub mod customer_emails;
pub mod customers;
pub mod discounts;
pub mod legacy;
pub mod legacy_removal;
pub mod logs;
pub mod order_notes;
pub mod orders;
pub mod payment;
pub mod registry;
pub mod tax_rates;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use customer_addresses::CustomerAddressTransformer;
pub use customer_emails::CustomerEmailTransformer;
pub use customers::CustomerTransformer;
pub use discounts::DiscountTransformer;
pub use legacy::legacy_date;
pub use legacy_removal::LEGACY_REMOVAL_TASKS;
pub use legacy_removal::LegacyRemovalProcessor;
pub use logs::LogTransformer;
pub use order_notes::OrderNoteTransformer;
pub use orders::OrderTransformer;
pub use payment::normalize_tax_rate;
pub use registry::DEFAULT_PAGE_SIZE;
pub use registry::PageSizes;
pub use registry::builtin_registry;
pub use tax_rates::TaxRateTransformer;
