//! The secret-free commitment form of a fulfillment
//!
//! A condition is what a transaction output is locked with. It names the
//! condition type, the features needed to verify it, a 32-byte fingerprint,
//! and an upper bound on the size of any fulfillment that satisfies it.

use std::fmt;
use std::str::FromStr;

use crate::codec::{
    format_condition_uri, parse_condition_uri, var_octet_len, var_uint_len, Reader, Writer,
};
use crate::crypto::HASH_LENGTH;

use super::error::ConditionError;
use super::types::{Bitmask, TypeId};

/// Default weight of a condition inside a threshold
pub const DEFAULT_WEIGHT: u32 = 1;

/// A condition: `{type, bitmask, hash, size}` plus the weight it carries
/// inside an enclosing threshold
#[derive(Debug, Clone)]
pub struct Condition {
    type_id: TypeId,
    bitmask: Bitmask,
    hash: [u8; HASH_LENGTH],
    size: usize,
    weight: u32,
    public_key: Option<Vec<u8>>,
}

impl Condition {
    pub(crate) fn new(type_id: TypeId, bitmask: Bitmask, hash: [u8; HASH_LENGTH], size: usize) -> Self {
        Self {
            type_id,
            bitmask,
            hash,
            size,
            weight: DEFAULT_WEIGHT,
            public_key: None,
        }
    }

    /// Build a condition from its wire fields, checking they are consistent
    pub fn from_parts(
        type_id: TypeId,
        bitmask: Bitmask,
        hash: &[u8],
        size: usize,
    ) -> Result<Self, ConditionError> {
        if !bitmask.contains(type_id.bitmask()) {
            return Err(ConditionError::condition(format!(
                "bitmask {:#x} lacks the bits of type {}",
                bitmask.bits(),
                type_id
            )));
        }
        if !type_id.is_compound() && bitmask != type_id.bitmask() {
            return Err(ConditionError::condition(format!(
                "simple type {} must carry bitmask {:#x}, found {:#x}",
                type_id,
                type_id.bitmask().bits(),
                bitmask.bits()
            )));
        }
        let hash: [u8; HASH_LENGTH] = hash.try_into().map_err(|_| {
            ConditionError::condition(format!("hash must be {} bytes, found {}", HASH_LENGTH, hash.len()))
        })?;
        Ok(Self::new(type_id, bitmask, hash, size))
    }

    /// Set the weight this condition contributes to an enclosing threshold
    pub fn with_weight(mut self, weight: u32) -> Result<Self, ConditionError> {
        self.set_weight(weight)?;
        Ok(self)
    }

    pub(crate) fn set_weight(&mut self, weight: u32) -> Result<(), ConditionError> {
        if weight == 0 {
            return Err(ConditionError::InvalidWeight);
        }
        self.weight = weight;
        Ok(())
    }

    /// Attach the signer's public key for display
    pub fn with_public_key(mut self, public_key: Vec<u8>) -> Self {
        self.public_key = Some(public_key);
        self
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn bitmask(&self) -> Bitmask {
        self.bitmask
    }

    pub fn hash(&self) -> &[u8; HASH_LENGTH] {
        &self.hash
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn public_key(&self) -> Option<&[u8]> {
        self.public_key.as_deref()
    }

    /// Exact length of [`Condition::to_binary`]
    pub fn binary_len(&self) -> usize {
        2 + var_uint_len(self.bitmask.bits()) + var_octet_len(HASH_LENGTH) + var_uint_len(self.size as u64)
    }

    /// `u16(type) ∥ varuint(bitmask) ∥ varoctet(hash) ∥ varuint(size)`
    pub fn to_binary(&self) -> Vec<u8> {
        let mut w = Writer::new();
        self.write_to(&mut w);
        w.into_bytes()
    }

    pub(crate) fn write_to(&self, w: &mut Writer) {
        w.write_u16(self.type_id.as_u16());
        w.write_var_uint(self.bitmask.bits());
        w.write_var_octet(&self.hash);
        w.write_var_uint(self.size as u64);
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, ConditionError> {
        let mut r = Reader::new(bytes);
        let condition = Self::read_from(&mut r)?;
        r.finish().map_err(ConditionError::condition)?;
        Ok(condition)
    }

    pub(crate) fn read_from(r: &mut Reader<'_>) -> Result<Self, ConditionError> {
        let raw_type = r.read_u16().map_err(ConditionError::condition)?;
        let raw_bitmask = r.read_var_uint().map_err(ConditionError::condition)?;
        let hash = r.read_var_octet().map_err(ConditionError::condition)?;
        let size = r.read_var_uint().map_err(ConditionError::condition)?;
        Self::from_raw(raw_type, raw_bitmask, hash, size)
    }

    fn from_raw(raw_type: u16, raw_bitmask: u64, hash: &[u8], size: u64) -> Result<Self, ConditionError> {
        let type_id = TypeId::from_u16(raw_type)
            .ok_or_else(|| ConditionError::condition(format!("unknown type id {}", raw_type)))?;
        let bitmask = Bitmask::from_bits(raw_bitmask)
            .ok_or_else(|| ConditionError::condition(format!("unknown bitmask bits {:#x}", raw_bitmask)))?;
        let size = usize::try_from(size).map_err(|_| ConditionError::condition("size overflows"))?;
        Self::from_parts(type_id, bitmask, hash, size)
    }

    pub fn to_uri(&self) -> String {
        format_condition_uri(
            self.type_id.as_u16(),
            self.bitmask.bits(),
            &self.hash,
            self.size as u64,
        )
    }

    pub fn from_uri(uri: &str) -> Result<Self, ConditionError> {
        let parts = parse_condition_uri(uri).map_err(ConditionError::condition)?;
        Self::from_raw(parts.type_id, parts.bitmask, &parts.hash, parts.size)
    }

    /// Hex form of the fingerprint
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Conditions are equal when their wire forms are equal
impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
            && self.bitmask == other.bitmask
            && self.hash == other.hash
            && self.size == other.size
    }
}

impl Eq for Condition {}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}

impl FromStr for Condition {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uri(s)
    }
}
