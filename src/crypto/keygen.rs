//! License key generation.

use rand::rngs::OsRng;
use rand::RngCore;

/// Entropy per key, in bytes.
pub const KEY_BYTES: usize = 16;

/// Generate a fresh, unpredictable license key as lowercase hex.
pub fn generate_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Whether a string has the shape of a generated key.
pub fn is_well_formed(key: &str) -> bool {
    key.len() == KEY_BYTES * 2 && key.bytes().all(|b| b.is_ascii_hexdigit())
}
