// crates/storefront-migrate-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Progress Store
// Description: Simple in-memory progress store for tests and examples.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides an in-memory [`ProgressStore`] for tests and local
//! demos, plus [`SharedProgressStore`], a clonable wrapper around any store
//! implementation. The in-memory store is not durable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::LeaseOwner;
use crate::core::MigrationRunState;
use crate::core::ProgressRecord;
use crate::core::StepKey;
use crate::interfaces::ProgressStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Lease row held in memory.
#[derive(Debug, Clone)]
struct LeaseRow {
    /// Lease owner.
    owner: LeaseOwner,
    /// Expiry timestamp (unix millis).
    expires_at_ms: i64,
}

/// Mutable state of the in-memory store.
#[derive(Debug, Default)]
struct MemoryState {
    /// Progress records keyed by step.
    progress: BTreeMap<StepKey, ProgressRecord>,
    /// Redirect driver marker.
    run_state: Option<MigrationRunState>,
    /// Leases keyed by step.
    leases: BTreeMap<StepKey, LeaseRow>,
}

/// In-memory progress store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProgressStore {
    /// Store state protected by a mutex.
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryProgressStore {
    /// Creates a new in-memory progress store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the store state.
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Store("progress store mutex poisoned".to_string()))
    }
}

impl ProgressStore for InMemoryProgressStore {
    fn load(&self, step_key: &StepKey) -> Result<Option<ProgressRecord>, StoreError> {
        Ok(self.lock()?.progress.get(step_key).cloned())
    }

    fn save(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        self.lock()?.progress.insert(record.step_key.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, step_key: &StepKey) -> Result<(), StoreError> {
        self.lock()?.progress.remove(step_key);
        Ok(())
    }

    fn list(&self) -> Result<Vec<ProgressRecord>, StoreError> {
        Ok(self.lock()?.progress.values().cloned().collect())
    }

    fn load_run_state(&self) -> Result<Option<MigrationRunState>, StoreError> {
        Ok(self.lock()?.run_state.clone())
    }

    fn save_run_state(&self, state: &MigrationRunState) -> Result<(), StoreError> {
        self.lock()?.run_state = Some(state.clone());
        Ok(())
    }

    fn clear_run_state(&self) -> Result<(), StoreError> {
        self.lock()?.run_state = None;
        Ok(())
    }

    fn try_acquire_lease(
        &self,
        step_key: &StepKey,
        owner: &LeaseOwner,
        now_ms: i64,
        ttl_ms: u64,
    ) -> Result<bool, StoreError> {
        let ttl = i64::try_from(ttl_ms)
            .map_err(|_| StoreError::Invalid("lease ttl out of range".to_string()))?;
        let mut guard = self.lock()?;
        if let Some(existing) = guard.leases.get(step_key)
            && existing.owner != *owner
            && existing.expires_at_ms > now_ms
        {
            return Ok(false);
        }
        guard.leases.insert(
            step_key.clone(),
            LeaseRow {
                owner: owner.clone(),
                expires_at_ms: now_ms.saturating_add(ttl),
            },
        );
        drop(guard);
        Ok(true)
    }

    fn release_lease(&self, step_key: &StepKey, owner: &LeaseOwner) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        if guard.leases.get(step_key).is_some_and(|lease| lease.owner == *owner) {
            guard.leases.remove(step_key);
        }
        drop(guard);
        Ok(())
    }

    fn reset(&self) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        guard.progress.clear();
        guard.run_state = None;
        guard.leases.clear();
        drop(guard);
        Ok(())
    }
}

// ============================================================================
// SECTION: Shared Store
// ============================================================================

/// Shared progress store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedProgressStore {
    /// Inner store implementation.
    inner: Arc<dyn ProgressStore + Send + Sync>,
}

impl SharedProgressStore {
    /// Wraps a progress store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl ProgressStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn ProgressStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl ProgressStore for SharedProgressStore {
    fn load(&self, step_key: &StepKey) -> Result<Option<ProgressRecord>, StoreError> {
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
