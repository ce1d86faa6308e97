//! Hash-preimage fulfillment
//!
//! Satisfied by revealing bytes whose SHA-256 equals the condition hash.
//! The message is ignored.

use crate::condition::{Condition, TypeId, PREIMAGE_BITMASK};
use crate::crypto::sha256;

#[derive(Debug, Clone)]
pub struct PreImage {
    preimage: Vec<u8>,
    condition: Condition,
}

impl PreImage {
    pub fn new(preimage: impl Into<Vec<u8>>) -> Self {
        let preimage = preimage.into();
        let condition = Condition::new(
            TypeId::PreImage,
            PREIMAGE_BITMASK,
            sha256(&preimage),
            preimage.len(),
        );
        Self {
            preimage,
            condition,
        }
    }

    pub fn preimage(&self) -> &[u8] {
        &self.preimage
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub(crate) fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }

    /// Always holds for a well-formed preimage, since the hash is derived
    /// from it; a wrong preimage is caught by `Fulfillment::verify`, which
    /// compares against the expected condition.
    pub fn validate(&self, _message: &[u8]) -> bool {
        sha256(&self.preimage) == *self.condition.hash()
    }

    pub fn payload(&self) -> Vec<u8> {
        self.preimage.clone()
    }

    pub(crate) fn from_payload(payload: &[u8]) -> Self {
        Self::new(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionError;
    use crate::fulfillment::Fulfillment;

    #[test]
    fn test_preimage_condition() {
        let f = PreImage::new(b"secret".to_vec());
        assert_eq!(f.condition().type_id(), TypeId::PreImage);
        assert_eq!(f.condition().hash(), &sha256(b"secret"));
        assert_eq!(f.condition().size(), 6);
        assert_eq!(f.payload(), b"secret");
    }

    #[test]
    fn test_preimage_ignores_message() {
        let f = PreImage::new(b"secret".to_vec());
        assert!(f.validate(b""));
        assert!(f.validate(b"anything at all"));
    }

    #[test]
    fn test_wrong_preimage_misses_condition() {
        let right = PreImage::new(b"secret".to_vec());
        let wrong = PreImage::new(b"Secret".to_vec());
        assert_ne!(right.condition(), wrong.condition());

        let expected = right.condition().clone();
        assert!(Fulfillment::PreImage(right).verify(&expected, b"").is_ok());
        assert!(matches!(
            Fulfillment::PreImage(wrong).verify(&expected, b""),
            Err(ConditionError::InvalidCondition(_))
        ));
    }
}
