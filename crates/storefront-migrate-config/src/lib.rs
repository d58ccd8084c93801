// crates/storefront-migrate-config/src/lib.rs
// ============================================================================
// Module: Storefront Migrate Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for storefront-migrate.toml semantics.
// Dependencies: storefront-migrate-core, storefront-migrate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `storefront-migrate-config` defines the configuration shared by the CLI
//! and the HTTP server. Loading is strict and fails closed: oversized files,
//! unknown journal modes, zero page sizes, and unparseable bind addresses
//! are all rejected before any database is opened.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
