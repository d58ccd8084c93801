// crates/storefront-migrate-core/src/core/time.rs
// ============================================================================
// Module: Wall Clock Helpers
// Description: Unix millisecond timestamps for progress and leases.
// Purpose: Keep clock access in one place.
// Dependencies: std
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Returns the current unix epoch in milliseconds.
#[must_use]
pub fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
