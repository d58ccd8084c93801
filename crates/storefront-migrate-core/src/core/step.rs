// crates/storefront-migrate-core/src/core/step.rs
// ============================================================================
// Module: Migration Step Declarations
// Description: Static metadata describing one named migration step.
// Purpose: Give the registry and surfaces a typed view of each step.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`MigrationStep`] is declared once at startup and never mutated. Its
//! processor is bound separately in the registry so the step itself stays
//! plain, serializable data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::StepKey;

// ============================================================================
// SECTION: Domain
// ============================================================================

/// Data domain a step migrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Orders and order items.
    Orders,
    /// Customers merged by email.
    Customers,
    /// Customer billing addresses.
    CustomerAddresses,
    /// Customer primary and secondary email addresses.
    CustomerEmailAddresses,
    /// Discount codes.
    Discounts,
    /// Activity and download logs.
    Logs,
    /// Notes attached to orders.
    OrderNotes,
    /// Tax rates.
    TaxRates,
    /// Removal of legacy storage after migration.
    LegacyData,
}

impl Domain {
    /// Returns the stable label for the domain.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Customers => "customers",
            Self::CustomerAddresses => "customer_addresses",
            Self::CustomerEmailAddresses => "customer_email_addresses",
            Self::Discounts => "discounts",
            Self::Logs => "logs",
            Self::OrderNotes => "order_notes",
            Self::TaxRates => "tax_rates",
            Self::LegacyData => "legacy_data",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Migration Step
// ============================================================================

/// Declaration of one named unit of migration work.
///
/// # Invariants
/// - `key` is unique across the registry.
/// - `page_size` is greater than zero.
/// - At most one registered step sets `is_legacy_removal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStep {
    /// Stable step key.
    pub key: StepKey,
    /// Human-readable label.
    pub label: String,
    /// Ordering priority (lower runs first).
    pub priority: u32,
    /// Domain migrated by this step.
    pub domain: Domain,
    /// Marks the gated, irreversible legacy-removal step.
    pub is_legacy_removal: bool,
    /// Records processed per invocation.
    pub page_size: u64,
}

impl MigrationStep {
    /// Declares a regular migration step.
    #[must_use]
    pub fn new(
        key: impl Into<StepKey>,
        label: impl Into<String>,
        priority: u32,
        domain: Domain,
        page_size: u64,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            priority,
            domain,
            is_legacy_removal: false,
            page_size,
        }
    }

    /// Declares the gated legacy-removal step.
    #[must_use]
    pub fn legacy_removal(
        key: impl Into<StepKey>,
        label: impl Into<String>,
        priority: u32,
        page_size: u64,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            priority,
            domain: Domain::LegacyData,
            is_legacy_removal: true,
            page_size,
        }
    }
}
