// crates/storefront-migrate-transformers/tests/common/mod.rs
// ============================================================================
// Module: Transformer Test Fixtures
// Description: Seeds legacy storage and builds executors over SQLite.
// Purpose: Drive transformers end to end against a temporary database.
// Dependencies: storefront-migrate-core, storefront-migrate-store-sqlite
// ============================================================================

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Shared fixtures; not every test file uses every helper."
)]

use std::sync::Arc;

use rusqlite::params;
use serde_json::Value;
use storefront_migrate_core::ExecutorConfig;
use storefront_migrate_core::LeaseOwner;
use storefront_migrate_core::MemoryEventSink;
use storefront_migrate_core::PageReport;
use storefront_migrate_core::SharedProgressStore;
use storefront_migrate_core::StepExecutor;
use storefront_migrate_core::StepKey;
use storefront_migrate_store_sqlite::SqliteDatabase;
use storefront_migrate_store_sqlite::SqliteStoreConfig;
use storefront_migrate_transformers::PageSizes;
use storefront_migrate_transformers::builtin_registry;
use tempfile::TempDir;

pub struct Fixture {
    pub dir: TempDir,
    pub db: SqliteDatabase,
}

/// Database with both legacy and target schemas installed.
pub fn fixture() -> Fixture {
    let fixture = legacy_only();
    fixture.db.install_target_schema().unwrap();
    fixture
}

/// Database with only the legacy schema installed.
pub fn legacy_only() -> Fixture {
    let dir = TempDir::new().unwrap();
    let db = SqliteDatabase::open(&SqliteStoreConfig::new(dir.path().join("shop.sqlite"))).unwrap();
    db.install_legacy_schema().unwrap();
    Fixture {
        dir,
        db,
    }
}

pub fn insert_object(
    db: &SqliteDatabase,
    id: i64,
    object_type: &str,
    status: &str,
    parent_id: i64,
    created_at: &str,
) {
    db.with_connection(|connection| {
        connection.execute(
            "INSERT INTO legacy_objects (id, object_type, status, title, content, parent_id, \
             created_at, modified_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                object_type,
                status,
                format!("title {id}"),
                format!("content {id}"),
                parent_id,
                created_at,
                "2021-06-01 12:00:00"
            ],
        )?;
        Ok(())
    })
    .unwrap();
}

/// Stores a metadata value as JSON text.
pub fn insert_meta(db: &SqliteDatabase, object_id: i64, key: &str, value: &Value) {
    insert_raw_meta(db, object_id, key, &value.to_string());
}

pub fn insert_raw_meta(db: &SqliteDatabase, object_id: i64, key: &str, raw: &str) {
    db.with_connection(|connection| {
        connection.execute(
            "INSERT INTO legacy_meta (object_id, meta_key, meta_value) VALUES (?1, ?2, ?3)",
            params![object_id, key, raw],
        )?;
        Ok(())
    })
    .unwrap();
}

pub fn set_option(db: &SqliteDatabase, name: &str, value: &Value) {
    db.with_connection(|connection| {
        connection.execute(
            "INSERT OR REPLACE INTO legacy_options (option_name, option_value) VALUES (?1, ?2)",
            params![name, value.to_string()],
        )?;
        Ok(())
    })
    .unwrap();
}

/// Seeds a payment with an email, total, and blob.
pub fn payment(db: &SqliteDatabase, id: i64, status: &str, email: Option<&str>, total: f64, blob: &Value) {
    insert_object(db, id, "edd_payment", status, 0, "2020-03-04 05:06:07");
    if let Some(email) = email {
        insert_meta(db, id, "_edd_payment_user_email", &Value::from(email));
    }
    insert_meta(db, id, "_edd_payment_total", &Value::from(total));
    insert_meta(db, id, "_edd_payment_meta", blob);
}

pub fn count(db: &SqliteDatabase, sql: &str) -> i64 {
    db.with_connection(|connection| Ok(connection.query_row(sql, params![], |row| row.get(0))?))
        .unwrap()
}

pub struct Pipeline {
    pub executor: StepExecutor<SharedProgressStore>,
    pub sink: MemoryEventSink,
}

pub fn pipeline(db: &SqliteDatabase, page_sizes: &PageSizes) -> Pipeline {
    let registry = Arc::new(builtin_registry(db, page_sizes).unwrap());
    let store = SharedProgressStore::from_store(db.progress_store().unwrap());
    let sink = MemoryEventSink::new();
    let executor = StepExecutor::new(
        registry,
        store,
        Arc::new(sink.clone()),
        ExecutorConfig {
            owner: LeaseOwner::new("test-owner"),
            lease_ttl_ms: 60_000,
        },
    );
    Pipeline {
        executor,
        sink,
    }
}

/// Runs one step until done and returns every page report.
pub fn run_step(pipeline: &Pipeline, key: &str) -> Vec<PageReport> {
    let key = StepKey::new(key);
    let mut reports = Vec::new();
    loop {
        let report = pipeline.executor.run_page(&key).unwrap();
        let done = report.done;
        reports.push(report);
        if done {
            return reports;
        }
        assert!(reports.len() < 1_000, "step never completed");
    }
}

/// Seeds `count` published payments with distinct emails in one transaction.
pub fn bulk_payments(db: &SqliteDatabase, count: i64) {
    db.with_connection(|connection| {
        let tx = connection.transaction()?;
        for id in 1..=count {
            tx.execute(
                "INSERT INTO legacy_objects (id, object_type, status, created_at, modified_at) \
                 VALUES (?1, 'edd_payment', 'publish', '2020-01-01 00:00:00', '2020-01-01 00:00:00')",
                params![id],
            )?;
            tx.execute(
                "INSERT INTO legacy_meta (object_id, meta_key, meta_value) VALUES (?1, \
                 '_edd_payment_user_email', ?2)",
                params![id, Value::from(format!("buyer{id}@example.com")).to_string()],
            )?;
        }
        tx.commit()?;
        Ok(())
    })
    .unwrap();
}
