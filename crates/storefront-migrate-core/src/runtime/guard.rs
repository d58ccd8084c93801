// crates/storefront-migrate-core/src/runtime/guard.rs
// ============================================================================
// Module: Single-Flight Guard
// Description: In-process exclusion of concurrent pages for one step.
// Purpose: Refuse a second caller instead of double-processing a page.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! [`SingleFlight`] tracks step keys with a page in flight inside this
//! process. It complements the durable lease held in the progress store,
//! which covers separate processes sharing one database.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::StepKey;

// ============================================================================
// SECTION: Guard
// ============================================================================

/// Set of steps with a page currently executing.
#[derive(Debug, Default, Clone)]
pub struct SingleFlight {
    /// Step keys currently in flight.
    active: Arc<Mutex<BTreeSet<StepKey>>>,
}

impl SingleFlight {
    /// Creates an empty guard set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as in flight, or returns `None` if it already is.
    ///
    /// A poisoned lock is treated as busy.
    #[must_use]
    pub fn enter(&self, key: &StepKey) -> Option<FlightGuard> {
        let mut active = self.active.lock().ok()?;
        if !active.insert(key.clone()) {
            return None;
        }
        drop(active);
        Some(FlightGuard {
            active: Arc::clone(&self.active),
            key: key.clone(),
        })
    }

    /// Returns the steps currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> Vec<StepKey> {
        self.active.lock().map(|active| active.iter().cloned().collect()).unwrap_or_default()
    }
}

/// RAII marker releasing a step when dropped.
#[derive(Debug)]
pub struct FlightGuard {
    /// Shared active set.
    active: Arc<Mutex<BTreeSet<StepKey>>>,
    /// Step held by this guard.
    key: StepKey,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.key);
        }
    }
}
