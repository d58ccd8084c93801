// crates/storefront-migrate-core/tests/store.rs
// ============================================================================
// Module: In-Memory Progress Store Tests
// Description: Tests for the in-memory progress store and shared wrapper.
// Purpose: Validate save/load, run-state, and lease semantics.
// Dependencies: storefront-migrate-core
// ============================================================================
//! ## Overview
//! Ensures the in-memory store matches the lease contract durable stores
//! must also honor: acquire when free, expired, or already owned.

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

use std::collections::BTreeMap;

use storefront_migrate_core::InMemoryProgressStore;
use storefront_migrate_core::LeaseOwner;
use storefront_migrate_core::MigrationRunState;
use storefront_migrate_core::ProgressRecord;
use storefront_migrate_core::ProgressStore;
use storefront_migrate_core::SharedProgressStore;
use storefront_migrate_core::StepKey;

/// Progress records round trip through the in-memory store.
#[test]
fn store_save_load_list_delete() {
    let store = SharedProgressStore::from_store(InMemoryProgressStore::new());
    let orders = ProgressRecord::new(StepKey::new("migrate_orders"), 50, 10);
    let logs = ProgressRecord::new(StepKey::new("migrate_logs"), 100, 10);
    store.save(&orders).unwrap();
    store.save(&logs).unwrap();

    assert_eq!(store.load(&orders.step_key).unwrap(), Some(orders.clone()));
    let keys: Vec<String> = store.list().unwrap().iter().map(|r| r.step_key.to_string()).collect();
    assert_eq!(keys, vec!["migrate_logs", "migrate_orders"]);

    store.delete(&orders.step_key).unwrap();
    assert!(store.load(&orders.step_key).unwrap().is_none());
}

/// The redirect marker can be saved, replaced, and cleared.
#[test]
fn store_run_state_lifecycle() {
    let store = InMemoryProgressStore::new();
    assert!(store.load_run_state().unwrap().is_none());
    let state = MigrationRunState {
        step_key: StepKey::new("migrate_orders"),
        cursor: 0,
        total: 10,
        extra_params: BTreeMap::new(),
        estimated_pages: 1,
        started_at_ms: 5,
    };
    store.save_run_state(&state).unwrap();
    assert_eq!(store.load_run_state().unwrap(), Some(state));
    store.clear_run_state().unwrap();
    assert!(store.load_run_state().unwrap().is_none());
}

/// Leases exclude other owners until released or expired.
#[test]
fn store_lease_contract() {
    let store = InMemoryProgressStore::new();
    let key = StepKey::new("migrate_orders");
    let a = LeaseOwner::new("a");
    let b = LeaseOwner::new("b");

    assert!(store.try_acquire_lease(&key, &a, 1_000, 500).unwrap());
    assert!(store.try_acquire_lease(&key, &a, 1_100, 500).unwrap(), "owner re-acquires");
    assert!(!store.try_acquire_lease(&key, &b, 1_200, 500).unwrap());

    store.release_lease(&key, &b).unwrap();
    assert!(!store.try_acquire_lease(&key, &b, 1_200, 500).unwrap(), "foreign release ignored");

    assert!(store.try_acquire_lease(&key, &b, 1_600, 500).unwrap(), "expired lease taken over");
    store.release_lease(&key, &b).unwrap();
    assert!(store.try_acquire_lease(&key, &a, 1_601, 500).unwrap());
}

/// Reset drops records and leases.
#[test]
fn store_reset_clears_everything() {
    let store = InMemoryProgressStore::new();
    let key = StepKey::new("migrate_orders");
    store.save(&ProgressRecord::new(key.clone(), 50, 0)).unwrap();
    store.try_acquire_lease(&key, &LeaseOwner::new("a"), 0, 10_000).unwrap();
    store.reset().unwrap();
    assert!(store.list().unwrap().is_empty());
    assert!(store.try_acquire_lease(&key, &LeaseOwner::new("b"), 1, 10).unwrap());
}

/// Percent is clamped and reports 100 for empty totals.
#[test]
fn progress_record_percent_rules() {
    let mut record = ProgressRecord::new(StepKey::new("migrate_orders"), 50, 0);
    assert_eq!(record.percent(), 0);
    record.total_estimate = Some(0);
    record.advance(3, 1);
    assert_eq!(record.percent(), 100, "max(total, 1) guards division and clamps");
    record.total_estimate = Some(200);
    assert_eq!(record.percent(), 1);
    record.mark_completed(2);
    assert_eq!(record.percent(), 100);
}
