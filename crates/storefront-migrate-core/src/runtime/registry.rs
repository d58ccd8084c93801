// crates/storefront-migrate-core/src/runtime/registry.rs
// ============================================================================
// Module: Migration Registry
// Description: Ordered, validated set of migration steps and processors.
// Purpose: Resolve step keys to typed transformers once at startup.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The registry is built once from a static declaration list and never
//! mutated afterwards. Steps are ordered by `(priority, declaration order)`.
//! Construction fails closed on duplicate keys, zero page sizes, more than
//! one gated step, or a gated step that would not run last.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::core::MigrationStep;
use crate::core::StepKey;
use crate::interfaces::Transformer;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Registry errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Registry declares no steps.
    #[error("migration registry is empty")]
    Empty,
    /// Step key declared twice.
    #[error("duplicate migration step: {0}")]
    DuplicateStep(String),
    /// Step declares a zero page size.
    #[error("migration step {0} has a zero page size")]
    ZeroPageSize(String),
    /// More than one step is flagged for legacy removal.
    #[error("multiple legacy removal steps: {0}")]
    MultipleLegacyRemoval(String),
    /// Legacy removal step is not ordered last.
    #[error("legacy removal step {0} must run last")]
    LegacyRemovalNotLast(String),
    /// Step key is unknown.
    #[error("unknown migration step: {0}")]
    NotFound(String),
}

/// One registered step and its bound processor.
#[derive(Clone)]
pub struct RegistryEntry {
    /// Step declaration.
    pub step: MigrationStep,
    /// Processor that migrates the step's records.
    pub processor: Arc<dyn Transformer>,
}

impl RegistryEntry {
    /// Binds a processor to a step.
    #[must_use]
    pub fn new(step: MigrationStep, processor: Arc<dyn Transformer>) -> Self {
        Self {
            step,
            processor,
        }
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry").field("step", &self.step).finish_non_exhaustive()
    }
}

/// Ordered, validated migration registry.
#[derive(Debug, Clone)]
pub struct MigrationRegistry {
    /// Entries in execution order.
    entries: Vec<RegistryEntry>,
}

// ============================================================================
// SECTION: Construction
// ============================================================================

impl MigrationRegistry {
    /// Builds a registry from declared entries.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the declaration violates an invariant.
    pub fn new(mut entries: Vec<RegistryEntry>) -> Result<Self, RegistryError> {
        if entries.is_empty() {
            return Err(RegistryError::Empty);
        }
        let mut seen = BTreeSet::new();
        let mut gated: Option<&StepKey> = None;
        for entry in &entries {
            let key = &entry.step.key;
            if !seen.insert(key.as_str()) {
                return Err(RegistryError::DuplicateStep(key.to_string()));
            }
            if entry.step.page_size == 0 {
                return Err(RegistryError::ZeroPageSize(key.to_string()));
            }
            if entry.step.is_legacy_removal {
                if let Some(existing) = gated {
                    return Err(RegistryError::MultipleLegacyRemoval(format!(
                        "{existing}, {key}"
                    )));
                }
                gated = Some(key);
            }
        }
        entries.sort_by_key(|entry| entry.step.priority);
        if let Some(position) = entries.iter().position(|entry| entry.step.is_legacy_removal)
            && position + 1 != entries.len()
        {
            return Err(RegistryError::LegacyRemovalNotLast(entries[position].step.key.to_string()));
        }
        Ok(Self {
            entries,
        })
    }
}

// ============================================================================
// SECTION: Lookup
// ============================================================================

impl MigrationRegistry {
    /// Returns steps in execution order.
    #[must_use]
    pub fn list_steps(&self) -> Vec<&MigrationStep> {
        self.entries.iter().map(|entry| &entry.step).collect()
    }

    /// Returns the step for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown keys.
    pub fn get_step(&self, key: &StepKey) -> Result<&MigrationStep, RegistryError> {
        self.entry(key).map(|entry| &entry.step)
    }

    /// Returns the processor bound to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown keys.
    pub fn processor(&self, key: &StepKey) -> Result<Arc<dyn Transformer>, RegistryError> {
        self.entry(key).map(|entry| Arc::clone(&entry.processor))
    }

    /// Returns the gated legacy-removal step, when declared.
    #[must_use]
    pub fn legacy_removal_step(&self) -> Option<&MigrationStep> {
        self.entries.iter().map(|entry| &entry.step).find(|step| step.is_legacy_removal)
    }

    /// Returns every non-gated step in execution order.
    #[must_use]
    pub fn migration_steps(&self) -> Vec<&MigrationStep> {
        self.entries
            .iter()
            .map(|entry| &entry.step)
            .filter(|step| !step.is_legacy_removal)
            .collect()
    }

    /// Returns the non-gated step following `key` in execution order.
    #[must_use]
    pub fn next_step_after(&self, key: &StepKey) -> Option<&MigrationStep> {
        let position = self.entries.iter().position(|entry| &entry.step.key == key)?;
        self.entries[position + 1..]
            .iter()
            .map(|entry| &entry.step)
            .find(|step| !step.is_legacy_removal)
    }

    /// Returns the number of registered steps.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no steps are registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves an entry by key.
    fn entry(&self, key: &StepKey) -> Result<&RegistryEntry, RegistryError> {
        self.entries
            .iter()
            .find(|entry| &entry.step.key == key)
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }
}
