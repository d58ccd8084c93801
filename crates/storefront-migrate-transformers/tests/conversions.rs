// crates/storefront-migrate-transformers/tests/conversions.rs
// ============================================================================
// Module: Value Conversion Tests
// Description: Legacy date parsing and tax rate normalization.
// Purpose: Pin the edge cases of the shared conversion helpers.
// Dependencies: storefront-migrate-transformers, proptest
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::float_cmp,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use proptest::prelude::*;
use storefront_migrate_transformers::legacy_date;
use storefront_migrate_transformers::normalize_tax_rate;

/// Supported legacy layouts convert to RFC 3339 UTC.
#[test]
fn legacy_dates_convert_to_rfc3339() {
    assert_eq!(legacy_date("2020-03-04 05:06:07"), Some("2020-03-04T05:06:07Z".to_string()));
    assert_eq!(legacy_date(" 2020-03-04 "), Some("2020-03-04T00:00:00Z".to_string()));
    assert_eq!(legacy_date("12/31/2019 23:59:59"), Some("2019-12-31T23:59:59Z".to_string()));
    assert_eq!(legacy_date("12/31/2019"), Some("2019-12-31T00:00:00Z".to_string()));
}

/// Zero dates and garbage yield no date.
#[test]
fn invalid_legacy_dates_are_absent() {
    assert_eq!(legacy_date("0000-00-00 00:00:00"), None);
    assert_eq!(legacy_date(""), None);
    assert_eq!(legacy_date("yesterday"), None);
    assert_eq!(legacy_date("2020-02-30 00:00:00"), None);
}

/// Fractions scale to percentages; exactly one stays one percent.
#[test]
fn tax_rate_normalization_edges() {
    assert_eq!(normalize_tax_rate(0.0), 0.0);
    assert_eq!(normalize_tax_rate(0.25), 25.0);
    assert_eq!(normalize_tax_rate(1.0), 1.0);
    assert_eq!(normalize_tax_rate(7.5), 7.5);
    assert_eq!(normalize_tax_rate(250.0), 100.0);
    assert_eq!(normalize_tax_rate(-3.0), 0.0);
    assert_eq!(normalize_tax_rate(f64::NAN), 0.0);
}

proptest! {
    /// Normalized rates always land in the percentage range.
    #[test]
    fn normalized_tax_rate_is_a_percentage(rate in -1.0e6_f64..1.0e6_f64) {
        let normalized = normalize_tax_rate(rate);
        prop_assert!((0.0..=100.0).contains(&normalized));
    }
}
