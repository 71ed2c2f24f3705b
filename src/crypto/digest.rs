//! SHA-256 fingerprints for license keys.
//!
//! Keys are bearer secrets, so logs and diagnostics refer to them only by a
//! truncated digest.

use sha2::{Digest, Sha256};

/// Number of hex characters kept in a fingerprint.
pub const FINGERPRINT_LEN: usize = 12;

/// Compute the full SHA-256 of a key, hex-encoded.
pub fn sha256_hex(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Short, log-safe fingerprint of a license key.
pub fn key_fingerprint(key: &str) -> String {
    let mut digest = sha256_hex(key);
    digest.truncate(FINGERPRINT_LEN);
    digest
}
