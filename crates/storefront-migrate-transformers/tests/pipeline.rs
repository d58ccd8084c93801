// crates/storefront-migrate-transformers/tests/pipeline.rs
// ============================================================================
// Module: Builtin Pipeline Tests
// Description: End-to-end runs of the builtin registry on SQLite.
// Purpose: Validate paging, fatal schema errors, and the legacy-removal gate.
// Dependencies: storefront-migrate-transformers, storefront-migrate-core
// ============================================================================

//! ## Overview
//! Runs whole steps and the full registry against a seeded database, then
//! checks persisted progress, normalized rows, and legacy cleanup.

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

use serde_json::json;
use storefront_migrate_core::ExecutorError;
use storefront_migrate_core::ProgressDriver;
use storefront_migrate_core::ProgressStore;
use storefront_migrate_core::StepKey;
use storefront_migrate_transformers::LEGACY_REMOVAL_TASKS;
use storefront_migrate_transformers::PageSizes;
use storefront_migrate_transformers::builtin_registry;

use crate::common::bulk_payments;
use crate::common::count;
use crate::common::fixture;
use crate::common::insert_meta;
use crate::common::insert_object;
use crate::common::legacy_only;
use crate::common::payment;
use crate::common::pipeline;
use crate::common::run_step;
use crate::common::set_option;

// ============================================================================
// SECTION: Paging
// ============================================================================

/// 237 payments at 50 per page take five pages plus a completing call.
#[test]
fn orders_page_through_237_payments() {
    let fixture = fixture();
    let db = &fixture.db;
    bulk_payments(db, 237);
    let pipeline = pipeline(db, &PageSizes::uniform(50));

    let reports = run_step(&pipeline, "migrate_orders");

    let fetched: Vec<u64> = reports.iter().map(|report| report.fetched).collect();
    assert_eq!(fetched, vec![50, 50, 50, 50, 37, 0]);
    assert_eq!(reports[0].percent, 21);
    assert_eq!(reports[0].total_estimate, Some(237));
    let last = reports.last().unwrap();
    assert!(last.done);
    assert_eq!(last.cursor, 237);
    assert_eq!(count(db, "SELECT COUNT(*) FROM orders"), 237);

    let stored = pipeline.executor.store().load(&StepKey::new("migrate_orders")).unwrap().unwrap();
    assert!(stored.completed);
    assert_eq!(stored.percent(), 100);
}

/// A new executor over the same file resumes from the persisted cursor.
#[test]
fn orders_resume_from_persisted_cursor() {
    let fixture = fixture();
    let db = &fixture.db;
    bulk_payments(db, 120);
    let first = pipeline(db, &PageSizes::uniform(50));
    let key = StepKey::new("migrate_orders");
    first.executor.run_page(&key).unwrap();
    first.executor.run_page(&key).unwrap();
    drop(first);

    let second = pipeline(db, &PageSizes::uniform(50));
    let report = second.executor.run_page(&key).unwrap();
    assert_eq!(report.starting_cursor(), 100);
    assert_eq!(report.fetched, 20);
    assert_eq!(count(db, "SELECT COUNT(*) FROM orders"), 120);
}

// ============================================================================
// SECTION: Fatal Errors
// ============================================================================

/// A missing target schema aborts before any row or progress is written.
#[test]
fn missing_target_schema_is_fatal() {
    let fixture = legacy_only();
    let db = &fixture.db;
    payment(db, 1, "publish", Some("ada@example.com"), 10.0, &json!({}));
    let pipeline = pipeline(db, &PageSizes::default());
    let key = StepKey::new("migrate_orders");

    let err = pipeline.executor.run_page(&key).unwrap_err();
    assert!(matches!(err, ExecutorError::Transform(ref message) if message.contains("orders")));
    assert_eq!(err.kind(), "fatal");
    assert!(pipeline.executor.store().load(&key).unwrap().is_none());
    assert!(pipeline.sink.event_names().contains(&"step_failed"));
}

/// A zero page size is rejected when the registry is built.
#[test]
fn zero_page_size_is_rejected() {
    let fixture = fixture();
    let mut sizes = PageSizes::default();
    sizes.overrides.insert("migrate_logs".to_string(), 0);
    assert!(builtin_registry(&fixture.db, &sizes).is_err());
}

// ============================================================================
// SECTION: Full Run
// ============================================================================

/// Builtin steps run in dependency order with the gated step last.
#[test]
fn builtin_registry_orders_steps() {
    let fixture = fixture();
    let registry = builtin_registry(&fixture.db, &PageSizes::default()).unwrap();
    let keys: Vec<String> = registry.list_steps().iter().map(|step| step.key.to_string()).collect();
    assert_eq!(
        keys,
        vec![
            "migrate_customers",
            "migrate_customer_email_addresses",
            "migrate_customer_addresses",
            "migrate_orders",
            "migrate_order_notes",
            "migrate_discounts",
            "migrate_tax_rates",
            "migrate_logs",
            "remove_legacy_data",
        ]
    );
    assert!(registry.legacy_removal_step().unwrap().is_legacy_removal);
}

/// Bulk mode migrates every domain, then the gated step clears legacy data.
#[test]
fn full_run_then_legacy_removal() {
    let fixture = fixture();
    let db = &fixture.db;
    payment(db, 1, "publish", Some("ada@example.com"), 10.0, &json!({"user_info": {"first_name": "Ada"}}));
    payment(db, 2, "refunded", Some("bob@example.com"), 5.0, &json!({}));
    insert_object(db, 3, "edd_payment_note", "", 1, "2020-01-01 00:00:00");
    insert_object(db, 4, "edd_log", "publish", 0, "2020-01-01 00:00:00");
    insert_meta(db, 4, "_edd_log_payment_id", &json!(1));
    set_option(db, "edd_discounts", &json!({"1": {"code": "TEN", "amount": 10}}));
    set_option(db, "edd_tax_rates", &json!([{"country": "US", "rate": 5}]));
    let pipeline = pipeline(db, &PageSizes::uniform(1));
    let driver = ProgressDriver::new(pipeline.executor.clone());
    let gate = pipeline.executor.gate();

    let refused = driver.run_legacy_removal(true, |_| {}).unwrap_err();
    assert!(matches!(refused, ExecutorError::GateClosed(_)));
    assert!(!gate.can_run_legacy_removal().unwrap());

    let mut pages = 0;
    driver.run_all(|_| pages += 1).unwrap();
    assert!(pages > 0);
    let status = gate.status().unwrap();
    assert!(status.fully_migrated);
    assert!(status.can_remove_legacy_data);
    assert!(status.steps.iter().all(|step| !step.legacy_running));

    assert_eq!(count(db, "SELECT COUNT(*) FROM orders"), 2);
    assert_eq!(count(db, "SELECT COUNT(*) FROM customers"), 2);
    assert_eq!(count(db, "SELECT COUNT(*) FROM notes"), 1);
    assert_eq!(count(db, "SELECT COUNT(*) FROM logs"), 1);
    assert_eq!(count(db, "SELECT COUNT(*) FROM discounts"), 1);
    assert_eq!(count(db, "SELECT COUNT(*) FROM tax_rates"), 1);

    let unconfirmed = driver.run_legacy_removal(false, |_| {}).unwrap_err();
    assert!(matches!(unconfirmed, ExecutorError::ConfirmationRequired));
    assert_eq!(count(db, "SELECT COUNT(*) FROM legacy_objects"), 4);

    let report = driver.run_legacy_removal(true, |_| {}).unwrap();
    assert!(report.done);
    assert_eq!(report.cursor, u64::try_from(LEGACY_REMOVAL_TASKS.len()).unwrap());
    assert_eq!(count(db, "SELECT COUNT(*) FROM legacy_objects"), 0);
    assert_eq!(count(db, "SELECT COUNT(*) FROM legacy_meta"), 0);
    assert_eq!(count(db, "SELECT COUNT(*) FROM legacy_options"), 0);
    assert_eq!(count(db, "SELECT COUNT(*) FROM orders"), 2, "normalized rows survive");
}

/// A cleanup task that cannot delete aborts the removal and keeps it re-runnable.
#[test]
fn failed_cleanup_task_keeps_gate_open() {
    let fixture = fixture();
    let db = &fixture.db;
    payment(db, 1, "publish", Some("ada@example.com"), 10.0, &json!({}));
    insert_object(db, 2, "edd_payment_note", "", 1, "2020-01-01 00:00:00");
    let pipeline = pipeline(db, &PageSizes::uniform(1));
    let driver = ProgressDriver::new(pipeline.executor.clone());
    let gate = pipeline.executor.gate();
    driver.run_all(|_| {}).unwrap();

    db.with_connection(|connection| {
        connection.execute_batch(
            "CREATE TRIGGER block_delete BEFORE DELETE ON legacy_objects BEGIN SELECT RAISE(ABORT, \
             'locked'); END;",
        )?;
        Ok(())
    })
    .unwrap();

    let err = driver.run_legacy_removal(true, |_| {}).unwrap_err();
    assert!(matches!(err, ExecutorError::Transform(_)), "{err}");
    assert!(err.to_string().contains("delete_payment_notes"), "{err}");
    assert!(gate.can_run_legacy_removal().unwrap());
    let removal = StepKey::new("remove_legacy_data");
    let record = pipeline.executor.progress(&removal).unwrap().unwrap();
    assert!(!record.completed);
    assert_eq!(record.cursor, 3, "stops at the failing task");
    assert_eq!(count(db, "SELECT COUNT(*) FROM legacy_objects"), 2);
    assert_eq!(count(db, "SELECT COUNT(*) FROM legacy_meta"), 0);

    db.with_connection(|connection| {
        connection.execute_batch("DROP TRIGGER block_delete;")?;
        Ok(())
    })
    .unwrap();
    let report = driver.run_legacy_removal(true, |_| {}).unwrap();
    assert!(report.done);
    assert_eq!(report.failed, 0);
    assert_eq!(count(db, "SELECT COUNT(*) FROM legacy_objects"), 0);
    assert!(!gate.can_run_legacy_removal().unwrap());
}
