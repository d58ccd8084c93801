// crates/storefront-migrate-core/src/core/mod.rs
// ============================================================================
// Module: Storefront Migrate Core Types
// Description: Canonical step, progress, record, and event structures.
// Purpose: Provide stable, serializable types shared by every surface.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Core types describe migration steps, their persisted progress, the legacy
//! records handed to transformers, and the structured events emitted while
//! a step runs. These types are the canonical source of truth for the HTTP
//! and CLI surfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod events;
pub mod hashing;
pub mod identifiers;
pub mod progress;
pub mod records;
pub mod step;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use events::MigrationEvent;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use identifiers::LeaseOwner;
pub use identifiers::StepKey;
pub use progress::MigrationRunState;
pub use progress::ProgressRecord;
pub use progress::StepState;
pub use records::LegacyBlobEntry;
pub use records::LegacyObject;
pub use records::LegacyRecord;
pub use records::LegacyTask;
pub use records::StepOutcome;
pub use step::Domain;
pub use step::MigrationStep;
pub use time::unix_millis;
