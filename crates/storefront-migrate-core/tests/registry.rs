// crates/storefront-migrate-core/tests/registry.rs
// ============================================================================
// Module: Migration Registry Tests
// Description: Validation and ordering of declared migration steps.
// Purpose: Ensure registry construction fails closed on bad declarations.
// Dependencies: storefront-migrate-core
// ============================================================================
//! ## Overview
//! Covers duplicate keys, zero page sizes, gated-step placement, ordering,
//! and lookups.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;

use common::FixtureTransformer;
use common::entry;
use common::step;
use storefront_migrate_core::MigrationRegistry;
use storefront_migrate_core::MigrationStep;
use storefront_migrate_core::RegistryEntry;
use storefront_migrate_core::RegistryError;
use storefront_migrate_core::StepKey;

/// Fresh no-op transformer.
fn fixture() -> Arc<FixtureTransformer> {
    Arc::new(FixtureTransformer::with_records(1))
}

/// Gated legacy removal entry at `priority`.
fn removal(priority: u32) -> RegistryEntry {
    entry(MigrationStep::legacy_removal("remove_legacy_data", "Remove legacy data", priority, 10), fixture())
}

/// An empty step list is rejected.
#[test]
fn registry_rejects_empty_declaration() {
    assert_eq!(MigrationRegistry::new(Vec::new()).unwrap_err(), RegistryError::Empty);
}

/// Duplicate step keys are rejected.
#[test]
fn registry_rejects_duplicate_keys() {
    let err = MigrationRegistry::new(vec![
        entry(step("migrate_orders", 1, 10), fixture()),
        entry(step("migrate_orders", 2, 10), fixture()),
    ])
    .unwrap_err();
    assert_eq!(err, RegistryError::DuplicateStep("migrate_orders".to_string()));
}

/// Zero page sizes are rejected.
#[test]
fn registry_rejects_zero_page_size() {
    let err = MigrationRegistry::new(vec![entry(step("migrate_orders", 1, 0), fixture())])
        .unwrap_err();
    assert!(matches!(err, RegistryError::ZeroPageSize(_)));
}

/// Only one legacy removal step may be declared.
#[test]
fn registry_rejects_second_legacy_removal_step() {
    let second = entry(MigrationStep::legacy_removal("drop_meta", "Drop", 200, 10), fixture());
    let err = MigrationRegistry::new(vec![
        entry(step("migrate_orders", 1, 10), fixture()),
        removal(100),
        second,
    ])
    .unwrap_err();
    assert!(matches!(err, RegistryError::MultipleLegacyRemoval(_)));
}

/// The legacy removal step must sort last.
#[test]
fn registry_rejects_legacy_removal_that_is_not_last() {
    let err = MigrationRegistry::new(vec![
        removal(5),
        entry(step("migrate_orders", 10, 10), fixture()),
    ])
    .unwrap_err();
    assert_eq!(err, RegistryError::LegacyRemovalNotLast("remove_legacy_data".to_string()));
}

/// Steps sort by priority, ties keep declaration order.
#[test]
fn registry_orders_by_priority_then_declaration() {
    let registry = MigrationRegistry::new(vec![
        entry(step("migrate_orders", 20, 10), fixture()),
        removal(100),
        entry(step("migrate_customers", 10, 10), fixture()),
        entry(step("migrate_notes", 20, 10), fixture()),
    ])
    .unwrap();
    let keys: Vec<&str> = registry.list_steps().iter().map(|step| step.key.as_str()).collect();
    assert_eq!(keys, vec!["migrate_customers", "migrate_orders", "migrate_notes", "remove_legacy_data"]);
    assert_eq!(registry.migration_steps().len(), 3);
    assert_eq!(registry.len(), 4);
}

/// Lookup helpers resolve keys and neighbours.
#[test]
fn registry_lookups() {
    let registry = MigrationRegistry::new(vec![
        entry(step("migrate_customers", 10, 10), fixture()),
        entry(step("migrate_orders", 20, 10), fixture()),
        removal(100),
    ])
    .unwrap();
    let orders = StepKey::new("migrate_orders");
    assert_eq!(registry.get_step(&orders).unwrap().priority, 20);
    assert!(registry.processor(&orders).is_ok());
    assert_eq!(
        registry.get_step(&StepKey::new("missing")).unwrap_err(),
        RegistryError::NotFound("missing".to_string())
    );
    assert_eq!(
        registry.next_step_after(&StepKey::new("migrate_customers")).map(|step| step.key.as_str()),
        Some("migrate_orders")
    );
    assert!(registry.next_step_after(&orders).is_none(), "gated step is never a next step");
    assert_eq!(
        registry.legacy_removal_step().map(|step| step.key.as_str()),
        Some("remove_legacy_data")
    );
}
