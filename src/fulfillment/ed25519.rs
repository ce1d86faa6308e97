//! Ed25519 signature fulfillment
//!
//! The condition hash is the public key itself; the payload is the public
//! key followed by the 64-byte signature.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};

use crate::condition::{Condition, ConditionError, TypeId, ED25519_BITMASK};
use crate::crypto::{verify_ed25519, ED25519_PUBLIC_KEY_LENGTH, ED25519_SIGNATURE_LENGTH};

/// Payload length of a signed Ed25519 fulfillment
pub const ED25519_PAYLOAD_LENGTH: usize = ED25519_PUBLIC_KEY_LENGTH + ED25519_SIGNATURE_LENGTH;

#[derive(Debug, Clone)]
pub struct Ed25519 {
    public_key: VerifyingKey,
    signature: Option<[u8; ED25519_SIGNATURE_LENGTH]>,
    condition: Condition,
}

impl Ed25519 {
    /// An unsigned fulfillment, usable only for its condition
    pub fn new(public_key: VerifyingKey) -> Self {
        let key_bytes = public_key.to_bytes();
        let condition = Condition::new(
            TypeId::Ed25519,
            ED25519_BITMASK,
            key_bytes,
            ED25519_PAYLOAD_LENGTH,
        )
        .with_public_key(key_bytes.to_vec());
        Self {
            public_key,
            signature: None,
            condition,
        }
    }

    pub fn from_signature(public_key: VerifyingKey, signature: &[u8]) -> Result<Self, ConditionError> {
        let signature: [u8; ED25519_SIGNATURE_LENGTH] = signature.try_into().map_err(|_| {
            ConditionError::fulfillment(format!(
                "ed25519 signature must be {} bytes, found {}",
                ED25519_SIGNATURE_LENGTH,
                signature.len()
            ))
        })?;
        let mut fulfillment = Self::new(public_key);
        fulfillment.signature = Some(signature);
        Ok(fulfillment)
    }

    /// Sign `message` and embed the signature
    pub fn sign(signing_key: &SigningKey, message: &[u8]) -> Self {
        let mut fulfillment = Self::new(signing_key.verifying_key());
        fulfillment.signature = Some(signing_key.sign(message).to_bytes());
        fulfillment
    }

    pub fn public_key(&self) -> &VerifyingKey {
        &self.public_key
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_ref().map(|s| &s[..])
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub(crate) fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }

    pub fn validate(&self, message: &[u8]) -> bool {
        match &self.signature {
            Some(signature) => verify_ed25519(&self.public_key, message, signature),
            None => false,
        }
    }

    pub fn payload(&self) -> Result<Vec<u8>, ConditionError> {
        let signature = self
            .signature
            .ok_or_else(|| ConditionError::fulfillment("ed25519 fulfillment is unsigned"))?;
        let mut payload = Vec::with_capacity(ED25519_PAYLOAD_LENGTH);
        payload.extend_from_slice(self.public_key.as_bytes());
        payload.extend_from_slice(&signature);
        Ok(payload)
    }

    pub(crate) fn from_payload(payload: &[u8]) -> Result<Self, ConditionError> {
        if payload.len() != ED25519_PAYLOAD_LENGTH {
            return Err(ConditionError::fulfillment(format!(
                "ed25519 payload must be {} bytes, found {}",
                ED25519_PAYLOAD_LENGTH,
                payload.len()
            )));
        }
        let mut key = [0u8; ED25519_PUBLIC_KEY_LENGTH];
        key.copy_from_slice(&payload[..ED25519_PUBLIC_KEY_LENGTH]);
        let public_key = VerifyingKey::from_bytes(&key)
            .map_err(|_| ConditionError::fulfillment("invalid ed25519 public key"))?;
        Self::from_signature(public_key, &payload[ED25519_PUBLIC_KEY_LENGTH..])
    }
}
