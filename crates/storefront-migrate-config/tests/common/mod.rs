// crates/storefront-migrate-config/tests/common/mod.rs
// ============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for storefront-migrate-config.
// ============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use storefront_migrate_config::ConfigError;
use storefront_migrate_config::StorefrontMigrateConfig;

/// Outcome type for tests that report failures as strings.
pub type TestResult = Result<(), String>;

/// Parses a TOML string without validating it.
pub fn config_from_toml(toml_str: &str) -> Result<StorefrontMigrateConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a config with all defaults applied.
pub fn minimal_config() -> Result<StorefrontMigrateConfig, toml::de::Error> {
    config_from_toml("")
}

/// Checks that `result` is an error whose message contains `needle`.
pub fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}
