//! Prefix fulfillment
//!
//! Wraps one subfulfillment and prepends a fixed prefix to every message
//! before handing it down.

use crate::codec::{var_octet_len, Reader, Writer};
use crate::condition::{Condition, ConditionError, TypeId, PREFIX_BITMASK};
use crate::crypto::sha256_concat;

use super::fulfillment::Fulfillment;

#[derive(Debug, Clone)]
pub struct Prefix {
    prefix: Vec<u8>,
    sub: Box<Fulfillment>,
    condition: Condition,
}

impl Prefix {
    pub fn new(prefix: impl Into<Vec<u8>>, sub: Fulfillment) -> Self {
        let prefix = prefix.into();
        let sub_condition = sub.condition();
        let hash = sha256_concat(&[prefix.as_slice(), &sub_condition.to_binary()[..]]);
        let bitmask = PREFIX_BITMASK | sub_condition.bitmask();
        // varoctet(prefix) ∥ u16 type ∥ varoctet(sub payload)
        let size = var_octet_len(prefix.len()) + 2 + var_octet_len(sub_condition.size());
        Self {
            prefix,
            sub: Box::new(sub),
            condition: Condition::new(TypeId::Prefix, bitmask, hash, size),
        }
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub fn subfulfillment(&self) -> &Fulfillment {
        &self.sub
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub(crate) fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }

    pub fn validate(&self, message: &[u8]) -> bool {
        let mut prefixed = Vec::with_capacity(self.prefix.len() + message.len());
        prefixed.extend_from_slice(&self.prefix);
        prefixed.extend_from_slice(message);
        self.sub.validate(&prefixed)
    }

    pub fn can_reveal(&self) -> bool {
        self.sub.can_reveal()
    }

    pub fn payload(&self) -> Result<Vec<u8>, ConditionError> {
        let mut w = Writer::new();
        w.write_var_octet(&self.prefix);
        w.write_bytes(&self.sub.to_binary()?);
        Ok(w.into_bytes())
    }

    pub(crate) fn from_payload(payload: &[u8], depth: usize) -> Result<Self, ConditionError> {
        let mut r = Reader::new(payload);
        let prefix = r.read_var_octet().map_err(ConditionError::fulfillment)?.to_vec();
        let sub = Fulfillment::read_from(&mut r, depth + 1)?;
        r.finish().map_err(ConditionError::fulfillment)?;
        Ok(Self::new(prefix, sub))
    }
}
