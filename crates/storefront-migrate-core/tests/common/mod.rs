// crates/storefront-migrate-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Fixtures
// Description: In-memory transformer and executor builders for tests.
// Purpose: Exercise the runtime without a database.
// Dependencies: storefront-migrate-core
// ============================================================================

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Shared fixtures; not every test file uses every helper."
)]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use storefront_migrate_core::Domain;
use storefront_migrate_core::ExecutorConfig;
use storefront_migrate_core::InMemoryProgressStore;
use storefront_migrate_core::LeaseOwner;
use storefront_migrate_core::LegacyObject;
use storefront_migrate_core::LegacyRecord;
use storefront_migrate_core::MemoryEventSink;
use storefront_migrate_core::MigrationRegistry;
use storefront_migrate_core::MigrationStep;
use storefront_migrate_core::RegistryEntry;
use storefront_migrate_core::StepExecutor;
use storefront_migrate_core::StepOutcome;
use storefront_migrate_core::TransformError;
use storefront_migrate_core::Transformer;

/// Transformer over a fixed list of legacy ids that records what it wrote.
#[derive(Default)]
pub struct FixtureTransformer {
    /// Legacy ids in ascending order.
    pub ids: Vec<i64>,
    /// Normalized rows written (keyed by legacy id, value = write count).
    pub written: Mutex<BTreeMap<i64, u32>>,
    /// Number of `fetch_page` calls.
    pub fetch_calls: AtomicU64,
    /// Number of `count_estimate` calls.
    pub count_calls: AtomicU64,
    /// Ids that fail with a per-record error.
    pub record_failures: BTreeSet<i64>,
    /// Id that fails fatally.
    pub fatal_at: Option<i64>,
    /// Overrides the count estimate.
    pub estimate: Option<u64>,
    /// Makes `prepare` fail.
    pub missing_schema: bool,
}

impl FixtureTransformer {
    pub fn with_records(count: i64) -> Self {
        Self {
            ids: (1..=count).collect(),
            ..Self::default()
        }
    }

    pub fn rows(&self) -> usize {
        self.written.lock().unwrap().len()
    }

    pub fn max_writes(&self) -> u32 {
        self.written.lock().unwrap().values().copied().max().unwrap_or(0)
    }

    pub fn fetches(&self) -> u64 {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

impl Transformer for FixtureTransformer {
    fn prepare(&self) -> Result<(), TransformError> {
        if self.missing_schema {
            return Err(TransformError::Fatal("target table orders is missing".to_string()));
        }
        Ok(())
    }

    fn count_estimate(&self) -> Result<u64, TransformError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.estimate.unwrap_or(u64::try_from(self.ids.len()).unwrap()))
    }

    fn fetch_page(&self, offset: u64, page_size: u64) -> Result<Vec<LegacyRecord>, TransformError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .ids
            .iter()
            .skip(usize::try_from(offset).unwrap())
            .take(usize::try_from(page_size).unwrap())
            .map(|id| LegacyRecord::Object(object(*id)))
            .collect())
    }

    fn migrate_one(&self, record: &LegacyRecord) -> Result<StepOutcome, TransformError> {
        let LegacyRecord::Object(object) = record else {
            return Err(TransformError::Fatal("unexpected record".to_string()));
        };
        if self.fatal_at == Some(object.id) {
            return Err(TransformError::Fatal("target table orders is missing".to_string()));
        }
        if self.record_failures.contains(&object.id) {
            return Err(TransformError::Record {
                record: record.record_id(),
                message: "malformed payment meta".to_string(),
            });
        }
        let mut written = self.written.lock().unwrap();
        if written.contains_key(&object.id) {
            return Ok(StepOutcome::Skipped);
        }
        written.insert(object.id, 1);
        Ok(StepOutcome::Migrated)
    }
}

pub fn object(id: i64) -> LegacyObject {
    LegacyObject {
        id,
        object_type: "edd_payment".to_string(),
        status: "publish".to_string(),
        title: String::new(),
        content: String::new(),
        parent_id: 0,
        created_at: "2020-01-01 00:00:00".to_string(),
        modified_at: "2020-01-01 00:00:00".to_string(),
        meta: BTreeMap::new(),
    }
}

pub fn step(key: &str, priority: u32, page_size: u64) -> MigrationStep {
    MigrationStep::new(key, key, priority, Domain::Orders, page_size)
}

pub fn entry(step: MigrationStep, processor: Arc<dyn Transformer>) -> RegistryEntry {
    RegistryEntry::new(step, processor)
}

pub struct Harness {
    pub executor: StepExecutor<InMemoryProgressStore>,
    pub store: InMemoryProgressStore,
    pub sink: MemoryEventSink,
}

pub fn harness(entries: Vec<RegistryEntry>) -> Harness {
    harness_with_store(entries, InMemoryProgressStore::new(), "test-owner")
}

pub fn harness_with_store(
    entries: Vec<RegistryEntry>,
    store: InMemoryProgressStore,
    owner: &str,
) -> Harness {
    let registry = Arc::new(MigrationRegistry::new(entries).expect("registry"));
    let sink = MemoryEventSink::new();
    let executor = StepExecutor::new(
        registry,
        store.clone(),
        Arc::new(sink.clone()),
        ExecutorConfig {
            owner: LeaseOwner::new(owner),
            lease_ttl_ms: 60_000,
        },
    );
    Harness {
        executor,
        store,
        sink,
    }
}

/// Two ordinary steps followed by the gated removal step.
pub fn gated_harness() -> (Harness, Arc<FixtureTransformer>, Arc<FixtureTransformer>, Arc<FixtureTransformer>) {
    let first = Arc::new(FixtureTransformer::with_records(3));
    let second = Arc::new(FixtureTransformer::with_records(2));
    let removal = Arc::new(FixtureTransformer::with_records(1));
    let harness = harness(vec![
        entry(step("migrate_customers", 10, 2), first.clone()),
        entry(step("migrate_orders", 20, 2), second.clone()),
        entry(MigrationStep::legacy_removal("remove_legacy_data", "Remove", 100, 5), removal.clone()),
    ]);
    (harness, first, second, removal)
}
