//! Condition type identifiers and capability bitmasks

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

// =============================================================================
// Type Identifiers
// =============================================================================

/// Registered condition types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum TypeId {
    PreImage = 0,
    Prefix = 1,
    Threshold = 2,
    Rsa = 3,
    Ed25519 = 4,
    /// Extension type, outside the registered range
    Timeout = 99,
}

impl TypeId {
    /// Parse a type id from its wire value
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(TypeId::PreImage),
            1 => Some(TypeId::Prefix),
            2 => Some(TypeId::Threshold),
            3 => Some(TypeId::Rsa),
            4 => Some(TypeId::Ed25519),
            99 => Some(TypeId::Timeout),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Bits every condition of this type carries
    pub fn bitmask(self) -> Bitmask {
        match self {
            TypeId::PreImage => PREIMAGE_BITMASK,
            TypeId::Prefix => PREFIX_BITMASK,
            TypeId::Threshold => THRESHOLD_BITMASK,
            TypeId::Rsa => RSA_BITMASK,
            TypeId::Ed25519 => ED25519_BITMASK,
            TypeId::Timeout => TIMEOUT_BITMASK,
        }
    }

    /// Whether conditions of this type are built from other conditions
    pub fn is_compound(self) -> bool {
        matches!(self, TypeId::Prefix | TypeId::Threshold)
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeId::PreImage => "preimage-sha-256",
            TypeId::Prefix => "prefix-sha-256",
            TypeId::Threshold => "threshold-sha-256",
            TypeId::Rsa => "rsa-sha-256",
            TypeId::Ed25519 => "ed25519",
            TypeId::Timeout => "timeout-sha-256",
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Bitmasks
// =============================================================================

bitflags! {
    /// Features a verifier must support to check a condition and its subtree
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Bitmask: u64 {
        const SHA256 = 0x01;
        const PREIMAGE = 0x02;
        const PREFIX = 0x04;
        const THRESHOLD = 0x08;
        const RSA_PSS = 0x10;
        const ED25519 = 0x20;
        const TIMEOUT = 0x40;
    }
}

pub const PREIMAGE_BITMASK: Bitmask = Bitmask::SHA256.union(Bitmask::PREIMAGE);
pub const PREFIX_BITMASK: Bitmask = Bitmask::SHA256.union(Bitmask::PREFIX);
pub const THRESHOLD_BITMASK: Bitmask = Bitmask::SHA256.union(Bitmask::THRESHOLD);
pub const RSA_BITMASK: Bitmask = Bitmask::SHA256.union(Bitmask::RSA_PSS);
pub const ED25519_BITMASK: Bitmask = Bitmask::ED25519;
pub const TIMEOUT_BITMASK: Bitmask = Bitmask::SHA256.union(Bitmask::TIMEOUT);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_id_round_trip() {
        for id in [
            TypeId::PreImage,
            TypeId::Prefix,
            TypeId::Threshold,
            TypeId::Rsa,
            TypeId::Ed25519,
            TypeId::Timeout,
        ] {
            assert_eq!(TypeId::from_u16(id.as_u16()), Some(id));
        }
        assert_eq!(TypeId::from_u16(5), None);
    }

    #[test]
    fn test_bitmask_values() {
        assert_eq!(PREIMAGE_BITMASK.bits(), 0x03);
        assert_eq!(PREFIX_BITMASK.bits(), 0x05);
        assert_eq!(THRESHOLD_BITMASK.bits(), 0x09);
        assert_eq!(RSA_BITMASK.bits(), 0x11);
        assert_eq!(ED25519_BITMASK.bits(), 0x20);
        assert_eq!(TIMEOUT_BITMASK.bits(), 0x41);
        assert!(Bitmask::from_bits(0x80).is_none());
    }
}
