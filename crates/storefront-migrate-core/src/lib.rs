// crates/storefront-migrate-core/src/lib.rs
// ============================================================================
// Module: Storefront Migrate Core Library
// Description: Public API surface for the stepped migration engine.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Storefront Migrate core drives a resumable, page-at-a-time migration of
//! legacy object/metadata records into a normalized schema. It is
//! backend-agnostic: durable progress, record transformation, and event
//! logging all plug in through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::MigrationEventSink;
pub use interfaces::ProgressStore;
pub use interfaces::StoreError;
pub use interfaces::TransformError;
pub use interfaces::Transformer;
pub use runtime::DEFAULT_LEASE_TTL_MS;
pub use runtime::ExecutorConfig;
pub use runtime::ExecutorError;
pub use runtime::FileEventSink;
pub use runtime::GateController;
pub use runtime::InMemoryProgressStore;
pub use runtime::MemoryEventSink;
pub use runtime::MigrationRegistry;
pub use runtime::MigrationStatus;
pub use runtime::NoopEventSink;
pub use runtime::PageReport;
pub use runtime::ProgressDriver;
pub use runtime::RedirectDriver;
pub use runtime::RedirectStep;
pub use runtime::RegistryEntry;
pub use runtime::RegistryError;
pub use runtime::SharedEventSink;
pub use runtime::SharedProgressStore;
pub use runtime::StderrEventSink;
pub use runtime::StepExecutor;
pub use runtime::StepProgress;
pub use runtime::StepStatus;
pub use runtime::redirect_query_params;
