// crates/storefront-migrate-cli/src/lib.rs
// ============================================================================
// Module: Storefront Migrate CLI Library
// Description: Shared helpers for the Storefront Migrate command-line interface.
// Purpose: Provide reusable components (i18n) for the CLI binary and tests.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! This library module houses the message catalog used by the binary entry
//! point (`src/main.rs`) so every user-facing line goes through one place.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Internationalization helpers and message catalog.
pub mod i18n;
