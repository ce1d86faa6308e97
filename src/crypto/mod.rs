//! Cryptographic utilities for conditions
//!
//! This module provides:
//! - SHA-256 hashing
//! - Ed25519 and RSA-PSS key management
//! - Signature verification used by the signature fulfillments

pub mod hash;
pub mod keys;

pub use hash::{sha256, sha256_concat, sha256_hex, HASH_LENGTH};
pub use keys::{
    rsa_public_key_from_modulus, verify_ed25519, verify_rsa, KeyError, KeyPair, KeyType,
    PublicKey, ED25519_PUBLIC_KEY_LENGTH, ED25519_SIGNATURE_LENGTH, RSA_MAX_MODULUS_LENGTH,
    RSA_MIN_MODULUS_LENGTH, RSA_PUBLIC_EXPONENT,
};
