// crates/storefront-migrate-core/src/core/identifiers.rs
// ============================================================================
// Module: Storefront Migrate Identifiers
// Description: Opaque identifiers for migration steps and lease owners.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque and serialize as plain strings. Validation (for
//! example, uniqueness of step keys) happens in the registry rather than in
//! these wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;

use crate::core::time::unix_millis;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Stable key naming one migration step (for example `migrate_orders`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepKey(String);

impl StepKey {
    /// Creates a new step key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for StepKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for StepKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Sequence used to keep lease owners unique within one process.
static OWNER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Identity recorded on a step lease.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseOwner(String);

impl LeaseOwner {
    /// Creates a lease owner from an explicit label.
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        Self(owner.into())
    }

    /// Generates an owner unique to this process and executor instance.
    #[must_use]
    pub fn generate(label: &str) -> Self {
        let sequence = OWNER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{label}-{}-{}-{sequence}", std::process::id(), unix_millis()))
    }

    /// Returns the owner as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeaseOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
