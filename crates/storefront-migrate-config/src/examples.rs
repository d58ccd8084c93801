// crates/storefront-migrate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for `config example` and docs.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The example lists every key with its default value, except where a
//! commented alternative is more instructive.

/// Returns a canonical example `storefront-migrate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[database]
path = "storefront.sqlite"
busy_timeout_ms = 5000
journal_mode = "wal"
sync_mode = "full"

[migration]
default_page_size = 50
lease_ttl_ms = 300000
install_target_schema = false

[migration.page_sizes]
migrate_logs = 200
# remove_legacy_data = 1

[server]
bind = "127.0.0.1:8787"
max_body_bytes = 65536
allow_non_loopback = false

[logging]
sink = "stderr"
# sink = "file"
# path = "storefront-migrate.log"
"#,
    )
}
