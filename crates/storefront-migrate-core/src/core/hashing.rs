// crates/storefront-migrate-core/src/core/hashing.rs
// ============================================================================
// Module: Progress Snapshot Hashing
// Description: Canonical JSON encoding and digests for persisted state.
// Purpose: Let durable stores detect torn or tampered progress rows.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Persisted progress records and run-state markers are written as RFC 8785
//! canonical JSON alongside a digest of those bytes. Stores recompute the
//! digest on every load and fail closed on mismatch, so a half-written or
//! hand-edited row can never silently rewind or skip a cursor.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Hash Algorithm
// ============================================================================

/// Supported digest algorithms for persisted snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
}

impl HashAlgorithm {
    /// Returns the stable label stored next to each digest.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }

    /// Parses a stored algorithm label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "sha256" => Some(Self::Sha256),
            _ => None,
        }
    }
}

/// Default digest algorithm.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

// ============================================================================
// SECTION: Digest
// ============================================================================

/// Hex-encoded digest of a canonical snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Algorithm used to compute `value`.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex digest.
    pub value: String,
}

/// Errors raised while canonicalizing snapshots.
#[derive(Debug, Error)]
pub enum HashError {
    /// Value could not be encoded as canonical JSON.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Encodes a value as RFC 8785 canonical JSON.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Digests raw bytes.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let digest = Sha256::digest(bytes);
            HashDigest {
                algorithm,
                value: hex_encode(&digest),
            }
        }
    }
}

/// Returns true when `bytes` digest to `expected` under `algorithm`.
#[must_use]
pub fn digest_matches(algorithm: HashAlgorithm, bytes: &[u8], expected: &str) -> bool {
    hash_bytes(algorithm, bytes).value == expected
}

/// Lowercase hex encoding.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}
