//! Fulfillments: proofs that unlock conditions
//!
//! This module provides:
//! - Leaf variants: preimage, Ed25519, RSA-PSS, timeout
//! - Composite variants: prefix and weighted threshold
//! - The [`Fulfillment`] sum type with its binary and URI forms

pub mod ed25519;
pub mod fulfillment;
pub mod prefix;
pub mod preimage;
pub mod rsa_sha256;
mod subset;
pub mod threshold;
pub mod timeout;

pub use ed25519::{Ed25519, ED25519_PAYLOAD_LENGTH};
pub use fulfillment::{Fulfillment, MAX_NESTING_DEPTH};
pub use prefix::Prefix;
pub use preimage::PreImage;
pub use rsa_sha256::Rsa;
pub use subset::MAX_WEIGHT_BUCKETS;
pub use threshold::{Threshold, MAX_PAYLOAD_SIZE, MAX_SUBFULFILLMENTS};
pub use timeout::Timeout;
