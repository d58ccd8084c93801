// crates/storefront-migrate-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Provides message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings for future localization support.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The Storefront Migrate CLI stores user-facing strings in a small
//! translation catalog. All runtime output should be routed through the
//! [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to the key itself to avoid panics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"step"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static catalog entries loaded into the message bundle.
const CATALOG_ITEMS: &[(&str, &str)] = &[
    ("main.version", "storefront-migrate {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.json_failed", "Failed to serialize output: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config valid."),
    ("runtime.init_failed", "Failed to initialize migration runtime: {error}"),
    (
        "migrate.page",
        "{step}: {cursor}/{total} ({percent}%) migrated={migrated} skipped={skipped} \
         failed={failed}",
    ),
    ("migrate.step_done", "{step}: complete"),
    (
        "migrate.run.ok",
        "All migration steps complete. Remove legacy data with `migrate remove-legacy --confirm`.",
    ),
    ("migrate.failed", "Migration failed ({kind}): {error}"),
    ("migrate.busy", "Step {step} is already running elsewhere; try again later."),
    ("migrate.upgrade.ok", "{step}: complete ({cursor} records)"),
    (
        "legacy.confirm_required",
        "Legacy removal deletes the original records. Re-run with --confirm to proceed.",
    ),
    ("legacy.gate_closed", "Legacy removal is not permitted yet: {error}"),
    ("legacy.ok", "Legacy data removed."),
    ("reset.confirm_required", "Reset discards all migration progress. Re-run with --yes to proceed."),
    ("reset.ok", "Migration progress reset."),
    ("serve.listening", "Serving migrations on http://{bind}"),
    ("serve.init_failed", "Failed to initialize migration server: {error}"),
    ("serve.failed", "Migration server failed: {error}"),
];

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the English catalog while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

/// Returns the static English catalog used by the CLI.
fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

    CATALOG.get_or_init(|| CATALOG_ITEMS.iter().copied().collect())
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a message from a key and named arguments.
///
/// `$key` must match a catalog entry; named arguments are substituted into
/// `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
