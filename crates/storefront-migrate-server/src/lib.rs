// crates/storefront-migrate-server/src/lib.rs
// ============================================================================
// Module: Storefront Migrate Server Library
// Description: HTTP endpoints and runtime wiring for migrations.
// Purpose: Expose step, status, upgrade, and legacy-removal endpoints.
// Dependencies: storefront-migrate-{config, core, store-sqlite, transformers}, axum
// ============================================================================

//! ## Overview
//! `storefront-migrate-server` builds a [`MigrationRuntime`] from
//! configuration and serves it over HTTP with axum. The CLI reuses the same
//! runtime for out-of-band bulk runs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod handlers;
pub mod runtime;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use handlers::LegacyRemovalRequest;
pub use handlers::StepRequest;
pub use handlers::UpgradeResponse;
pub use runtime::MigrationRuntime;
pub use server::MigrationServer;
pub use server::ServerError;
