// crates/storefront-migrate-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Migration Store
// Description: Durable ProgressStore and database handle using SQLite WAL.
// Purpose: Provide production persistence for migration progress and data.
// Dependencies: storefront-migrate-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`ProgressStore`] that keeps step
//! progress as hashed canonical JSON, a lease table for the single-flight
//! guard, and a shared [`SqliteDatabase`] handle over the legacy and
//! normalized schemas. Database contents are untrusted and verified on load.
//!
//! [`ProgressStore`]: storefront_migrate_core::ProgressStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod database;
pub mod schema;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use database::SqliteDatabase;
pub use schema::LEGACY_TABLES;
pub use schema::TARGET_TABLES;
pub use store::MAX_STATE_BYTES;
pub use store::SqliteProgressStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
