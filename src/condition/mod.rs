//! Conditions: public commitments that lock transaction outputs
//!
//! This module provides:
//! - Type identifiers and capability bitmasks
//! - The [`Condition`] value and its binary and URI forms
//! - The error type shared by conditions and fulfillments

pub mod condition;
pub mod error;
pub mod types;

pub use condition::{Condition, DEFAULT_WEIGHT};
pub use error::ConditionError;
pub use types::{
    Bitmask, TypeId, ED25519_BITMASK, PREFIX_BITMASK, PREIMAGE_BITMASK, RSA_BITMASK,
    THRESHOLD_BITMASK, TIMEOUT_BITMASK,
};
