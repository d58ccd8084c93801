// crates/storefront-migrate-core/tests/executor.rs
// ============================================================================
// Module: Step Executor Tests
// Description: Paging, completion, resume, and failure handling.
// Purpose: Validate the per-step state machine and cursor persistence.
// Dependencies: storefront-migrate-core, proptest
// ============================================================================
//! ## Overview
//! Drives the executor over in-memory fixtures and checks cursor movement,
//! completion detection, and the handling of per-record and fatal errors.

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

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::Arc;

use common::FixtureTransformer;
use common::entry;
use common::harness;
use common::harness_with_store;
use common::step;
use proptest::prelude::*;
use storefront_migrate_core::ExecutorConfig;
use storefront_migrate_core::ExecutorError;
use storefront_migrate_core::InMemoryProgressStore;
use storefront_migrate_core::LeaseOwner;
use storefront_migrate_core::MemoryEventSink;
use storefront_migrate_core::MigrationRegistry;
use storefront_migrate_core::MigrationRunState;
use storefront_migrate_core::ProgressRecord;
use storefront_migrate_core::ProgressStore;
use storefront_migrate_core::StepExecutor;
use storefront_migrate_core::StepKey;
use storefront_migrate_core::StoreError;
use storefront_migrate_core::unix_millis;

/// Callback run from inside a store call.
type LoadHook = Box<dyn FnOnce()>;

/// In-memory store that runs a one-shot hook inside the next `load`.
#[derive(Clone, Default)]
struct InterleavingStore {
    /// Backing store shared with other executors.
    inner: InMemoryProgressStore,
    /// Hook fired by the next `load`.
    on_load: Rc<RefCell<Option<LoadHook>>>,
}

impl InterleavingStore {
    /// Arms `hook` for the next `load`.
    fn interleave(&self, hook: impl FnOnce() + 'static) {
        *self.on_load.borrow_mut() = Some(Box::new(hook));
    }
}

impl ProgressStore for InterleavingStore {
    fn load(&self, step_key: &StepKey) -> Result<Option<ProgressRecord>, StoreError> {
        let hook = self.on_load.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
        self.inner.load(step_key)
    }

    fn save(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        self.inner.save(record)
    }

    fn delete(&self, step_key: &StepKey) -> Result<(), StoreError> {
        self.inner.delete(step_key)
    }

    fn list(&self) -> Result<Vec<ProgressRecord>, StoreError> {
        self.inner.list()
    }

    fn load_run_state(&self) -> Result<Option<MigrationRunState>, StoreError> {
        self.inner.load_run_state()
    }

    fn save_run_state(&self, state: &MigrationRunState) -> Result<(), StoreError> {
        self.inner.save_run_state(state)
    }

    fn clear_run_state(&self) -> Result<(), StoreError> {
        self.inner.clear_run_state()
    }

    fn try_acquire_lease(
        &self,
        step_key: &StepKey,
        owner: &LeaseOwner,
        now_ms: i64,
        ttl_ms: u64,
    ) -> Result<bool, StoreError> {
        self.inner.try_acquire_lease(step_key, owner, now_ms, ttl_ms)
    }

    fn release_lease(&self, step_key: &StepKey, owner: &LeaseOwner) -> Result<(), StoreError> {
        self.inner.release_lease(step_key, owner)
    }

    fn reset(&self) -> Result<(), StoreError> {
        self.inner.reset()
    }
}

/// Verifies 237 records at page size 50 take five pages plus an empty sixth.
#[test]
fn run_page_scenario_237_records_page_size_50() {
    let processor = Arc::new(FixtureTransformer::with_records(237));
    let h = harness(vec![entry(step("migrate_orders", 10, 50), processor.clone())]);
    let key = StepKey::new("migrate_orders");

    let expected = [(50, 50), (100, 50), (150, 50), (200, 50), (237, 37)];
    for (cursor, fetched) in expected {
        let report = h.executor.run_page(&key).unwrap();
        assert_eq!(report.cursor, cursor);
        assert_eq!(report.fetched, fetched);
        assert!(!report.done, "a short page is not the completion signal");
    }
    let last = h.executor.run_page(&key).unwrap();
    assert!(last.done);
    assert_eq!(last.cursor, 237);
    assert_eq!(last.fetched, 0);
    assert_eq!(last.percent, 100);

    assert_eq!(processor.fetches(), 6);
    assert_eq!(processor.rows(), 237);
    assert_eq!(processor.max_writes(), 1);
    assert!(h.store.load(&key).unwrap().unwrap().completed);
}

/// Verifies an interrupted run resumes from the persisted cursor.
#[test]
fn run_page_resumes_from_persisted_cursor_after_restart() {
    let store = InMemoryProgressStore::new();
    let processor = Arc::new(FixtureTransformer::with_records(237));
    let key = StepKey::new("migrate_orders");
    {
        let h = harness_with_store(
            vec![entry(step("migrate_orders", 10, 50), processor.clone())],
            store.clone(),
            "first-process",
        );
        for _ in 0..3 {
            h.executor.run_page(&key).unwrap();
        }
    }
    assert_eq!(store.load(&key).unwrap().unwrap().cursor, 150);

    let h = harness_with_store(
        vec![entry(step("migrate_orders", 10, 50), processor.clone())],
        store,
        "second-process",
    );
    let resumed = h.executor.run_page(&key).unwrap();
    assert_eq!(resumed.starting_cursor(), 150);
    assert_eq!(resumed.cursor, 200);
    loop {
        if h.executor.run_page(&key).unwrap().done {
            break;
        }
    }
    assert_eq!(processor.rows(), 237);
    assert_eq!(processor.max_writes(), 1);
}

/// Verifies an empty domain completes without fetching a page.
#[test]
fn run_page_empty_domain_short_circuits() {
    let processor = Arc::new(FixtureTransformer::with_records(0));
    let h = harness(vec![entry(step("migrate_discounts", 10, 50), processor.clone())]);
    let key = StepKey::new("migrate_discounts");

    let report = h.executor.run_page(&key).unwrap();
    assert!(report.done);
    assert_eq!(report.percent, 100);
    assert_eq!(processor.fetches(), 0);
    assert_eq!(h.sink.event_names(), vec!["step_completed"]);
}

/// Verifies a stale estimate never causes premature completion.
#[test]
fn run_page_estimate_is_advisory() {
    let processor = Arc::new(FixtureTransformer {
        estimate: Some(1),
        ..FixtureTransformer::with_records(5)
    });
    let h = harness(vec![entry(step("migrate_logs", 10, 2), processor.clone())]);
    let key = StepKey::new("migrate_logs");

    let mut pages = 0;
    while !h.executor.run_page(&key).unwrap().done {
        pages += 1;
    }
    assert_eq!(pages, 3);
    assert_eq!(processor.rows(), 5);
}

/// Verifies per-record failures are counted and logged, not fatal.
#[test]
fn run_page_counts_record_failures() {
    let processor = Arc::new(FixtureTransformer {
        record_failures: BTreeSet::from([2, 4]),
        ..FixtureTransformer::with_records(5)
    });
    let h = harness(vec![entry(step("migrate_orders", 10, 10), processor.clone())]);
    let key = StepKey::new("migrate_orders");

    let report = h.executor.run_page(&key).unwrap();
    assert_eq!(report.fetched, 5);
    assert_eq!(report.migrated, 3);
    assert_eq!(report.failed, 2);
    assert_eq!(report.cursor, 5, "cursor advances by records fetched");
    let failures: Vec<_> =
        h.sink.events().into_iter().filter(|event| event.event == "record_failed").collect();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].record.as_deref(), Some("edd_payment:2"));
}

/// Verifies a fatal record error aborts without persisting progress.
#[test]
fn run_page_fatal_error_persists_nothing() {
    let processor = Arc::new(FixtureTransformer {
        fatal_at: Some(3),
        ..FixtureTransformer::with_records(5)
    });
    let h = harness(vec![entry(step("migrate_orders", 10, 10), processor)]);
    let key = StepKey::new("migrate_orders");

    let err = h.executor.run_page(&key).unwrap_err();
    assert!(matches!(err, ExecutorError::Transform(_)));
    assert_eq!(err.kind(), "fatal");
    assert!(h.store.load(&key).unwrap().is_none());
    assert!(h.sink.event_names().contains(&"step_failed"));
}

/// Verifies a missing target schema fails before any fetch.
#[test]
fn run_page_missing_schema_is_fatal() {
    let processor = Arc::new(FixtureTransformer {
        missing_schema: true,
        ..FixtureTransformer::with_records(5)
    });
    let h = harness(vec![entry(step("migrate_orders", 10, 10), processor.clone())]);
    let err = h.executor.run_page(&StepKey::new("migrate_orders")).unwrap_err();
    assert!(matches!(err, ExecutorError::Transform(message) if message.contains("missing")));
    assert_eq!(processor.fetches(), 0);
}

/// Verifies unknown step keys are rejected.
#[test]
fn run_page_unknown_step_not_found() {
    let h = harness(vec![entry(
        step("migrate_orders", 10, 10),
        Arc::new(FixtureTransformer::with_records(1)),
    )]);
    let err = h.executor.run_page(&StepKey::new("migrate_widgets")).unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

/// Verifies a lease held by another owner refuses the page.
#[test]
fn run_page_refuses_when_lease_is_held_elsewhere() {
    let processor = Arc::new(FixtureTransformer::with_records(5));
    let h = harness(vec![entry(step("migrate_orders", 10, 10), processor.clone())]);
    let key = StepKey::new("migrate_orders");
    let other = LeaseOwner::new("other-process");
    assert!(h.store.try_acquire_lease(&key, &other, unix_millis(), 60_000).unwrap());

    let err = h.executor.run_page(&key).unwrap_err();
    assert!(matches!(err, ExecutorError::StepBusy(_)));
    assert_eq!(processor.fetches(), 0);
    assert!(h.sink.event_names().contains(&"lease_contended"));

    h.store.release_lease(&key, &other).unwrap();
    assert_eq!(h.executor.run_page(&key).unwrap().cursor, 5);
}

/// Verifies an expired lease does not block the step.
#[test]
fn run_page_takes_over_expired_lease() {
    let h = harness(vec![entry(
        step("migrate_orders", 10, 10),
        Arc::new(FixtureTransformer::with_records(2)),
    )]);
    let key = StepKey::new("migrate_orders");
    let stale = LeaseOwner::new("crashed-process");
    assert!(h.store.try_acquire_lease(&key, &stale, unix_millis() - 120_000, 1_000).unwrap());
    assert_eq!(h.executor.run_page(&key).unwrap().cursor, 2);
}

/// Verifies page size changes in the registry apply to the stored record.
#[test]
fn run_page_syncs_page_size_from_registry() {
    let store = InMemoryProgressStore::new();
    let processor = Arc::new(FixtureTransformer::with_records(30));
    let key = StepKey::new("migrate_orders");
    let first = harness_with_store(
        vec![entry(step("migrate_orders", 10, 5), processor.clone())],
        store.clone(),
        "a",
    );
    first.executor.run_page(&key).unwrap();
    let second =
        harness_with_store(vec![entry(step("migrate_orders", 10, 20), processor)], store, "b");
    let report = second.executor.run_page(&key).unwrap();
    assert_eq!(report.cursor, 25);
    assert_eq!(second.store.load(&key).unwrap().unwrap().page_size, 20);
}

/// Verifies reset clears progress so the step starts over.
#[test]
fn reset_clears_all_progress() {
    let h = harness(vec![entry(
        step("migrate_orders", 10, 10),
        Arc::new(FixtureTransformer::with_records(3)),
    )]);
    let key = StepKey::new("migrate_orders");
    h.executor.run_page(&key).unwrap();
    h.executor.reset().unwrap();
    assert!(h.store.list().unwrap().is_empty());
    assert!(h.sink.event_names().contains(&"migration_reset"));
}

proptest! {
    /// Verifies the cursor never decreases and every record is written once.
    #[test]
    fn cursor_is_monotonic(records in 0_i64..120, page_size in 1_u64..40) {
        let processor = Arc::new(FixtureTransformer::with_records(records));
        let h = harness(vec![entry(step("migrate_orders", 10, page_size), processor.clone())]);
        let key = StepKey::new("migrate_orders");
        let mut previous = 0;
        let mut invocations = 0;
        loop {
            let report = h.executor.run_page(&key).unwrap();
            prop_assert!(report.cursor >= previous);
            prop_assert!(report.percent <= 100);
            previous = report.cursor;
            invocations += 1;
            if report.done {
                break;
            }
            prop_assert!(invocations < 1_000);
        }
        prop_assert_eq!(previous, u64::try_from(records).unwrap());
        prop_assert_eq!(processor.rows(), usize::try_from(records).unwrap());
        prop_assert!(processor.max_writes() <= 1);
    }
}

/// Verifies the bulk-run flag is not written while another owner holds the step.
#[test]
fn mark_legacy_running_refuses_when_lease_is_held_elsewhere() {
    let h = harness(vec![entry(
        step("migrate_orders", 10, 2),
        Arc::new(FixtureTransformer::with_records(5)),
    )]);
    let key = StepKey::new("migrate_orders");
    h.executor.run_page(&key).unwrap();
    let other = LeaseOwner::new("other-process");
    assert!(h.store.try_acquire_lease(&key, &other, unix_millis(), 60_000).unwrap());

    let err = h.executor.mark_legacy_running(&key, true).unwrap_err();
    assert!(matches!(err, ExecutorError::StepBusy(_)));
    let record = h.store.load(&key).unwrap().unwrap();
    assert!(!record.legacy_running);
    assert_eq!(record.cursor, 2);

    h.store.release_lease(&key, &other).unwrap();
    h.executor.mark_legacy_running(&key, true).unwrap();
    assert!(h.store.load(&key).unwrap().unwrap().legacy_running);
}

/// Verifies a page from another process cannot land between the flag's load and save.
#[test]
fn mark_legacy_running_never_regresses_a_concurrent_cursor() {
    let processor = Arc::new(FixtureTransformer::with_records(6));
    let key = StepKey::new("migrate_orders");
    let store = InterleavingStore::default();
    let other = harness_with_store(
        vec![entry(step("migrate_orders", 10, 2), processor.clone())],
        store.inner.clone(),
        "server",
    );
    let registry =
        Arc::new(MigrationRegistry::new(vec![entry(step("migrate_orders", 10, 2), processor)]).unwrap());
    let bulk = StepExecutor::new(
        registry,
        store.clone(),
        Arc::new(MemoryEventSink::new()),
        ExecutorConfig {
            owner: LeaseOwner::new("cli"),
            lease_ttl_ms: 60_000,
        },
    );
    assert_eq!(other.executor.run_page(&key).unwrap().cursor, 2);

    let concurrent = Rc::new(RefCell::new(None));
    let seen = Rc::clone(&concurrent);
    let server = other.executor.clone();
    let page_key = key.clone();
    store.interleave(move || {
        *seen.borrow_mut() = Some(server.run_page(&page_key));
    });
    bulk.mark_legacy_running(&key, true).unwrap();

    let concurrent = concurrent.borrow_mut().take().unwrap();
    assert!(matches!(concurrent, Err(ExecutorError::StepBusy(_))));
    let record = store.inner.load(&key).unwrap().unwrap();
    assert_eq!(record.cursor, 2);
    assert!(record.legacy_running);

    assert_eq!(other.executor.run_page(&key).unwrap().cursor, 4);
    let record = store.inner.load(&key).unwrap().unwrap();
    assert_eq!(record.cursor, 4);
    assert!(record.legacy_running, "pages keep the flag");
}
