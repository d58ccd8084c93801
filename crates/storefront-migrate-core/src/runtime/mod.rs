// crates/storefront-migrate-core/src/runtime/mod.rs
// ============================================================================
// Module: Storefront Migrate Runtime
// Description: Registry, step executor, continuation drivers, and gate.
// Purpose: Execute resumable migration steps against pluggable backends.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the page-at-a-time step executor and the two
//! continuation drivers built on it. Every surface (HTTP, CLI) calls into
//! the same executor so progress state cannot desynchronize.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod driver;
pub mod executor;
pub mod gate;
pub mod guard;
pub mod redirect;
pub mod registry;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileEventSink;
pub use audit::MemoryEventSink;
pub use audit::NoopEventSink;
pub use audit::SharedEventSink;
pub use audit::StderrEventSink;
pub use driver::ProgressDriver;
pub use driver::StepProgress;
pub use executor::DEFAULT_LEASE_TTL_MS;
pub use executor::ExecutorConfig;
pub use executor::ExecutorError;
pub use executor::PageReport;
pub use executor::StepExecutor;
pub use gate::GateController;
pub use gate::MigrationStatus;
pub use gate::StepStatus;
pub use guard::FlightGuard;
pub use guard::SingleFlight;
pub use redirect::RedirectDriver;
pub use redirect::RedirectStep;
pub use redirect::redirect_query_params;
pub use registry::MigrationRegistry;
pub use registry::RegistryEntry;
pub use registry::RegistryError;
pub use store::InMemoryProgressStore;
pub use store::SharedProgressStore;
