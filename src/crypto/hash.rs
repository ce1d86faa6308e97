//! Cryptographic hashing utilities
//!
//! Every condition fingerprint in this crate is a SHA-256 digest.

use sha2::{Digest, Sha256};

/// Length in bytes of a condition hash
pub const HASH_LENGTH: usize = 32;

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> [u8; HASH_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes SHA-256 over several byte slices as if they were concatenated
pub fn sha256_concat<T: AsRef<[u8]>>(parts: &[T]) -> [u8; HASH_LENGTH] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_ref());
    }
    hasher.finalize().into()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}
