//! RSA-PSS (SHA-256) signature fulfillment
//!
//! The condition hash is the SHA-256 of the modulus. The payload is the
//! modulus followed by a signature of the same length.

use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;

use crate::condition::{Condition, ConditionError, TypeId, RSA_BITMASK};
use crate::crypto::{
    rsa_public_key_from_modulus, sha256, verify_rsa, RSA_MAX_MODULUS_LENGTH,
    RSA_MIN_MODULUS_LENGTH,
};

#[derive(Debug, Clone)]
pub struct Rsa {
    public_key: RsaPublicKey,
    modulus: Vec<u8>,
    signature: Option<Vec<u8>>,
    condition: Condition,
}

impl Rsa {
    /// An unsigned fulfillment, usable only for its condition
    pub fn new(public_key: RsaPublicKey) -> Result<Self, ConditionError> {
        let modulus = public_key.n().to_bytes_be();
        if !(RSA_MIN_MODULUS_LENGTH..=RSA_MAX_MODULUS_LENGTH).contains(&modulus.len()) {
            return Err(ConditionError::InvalidType(format!(
                "rsa modulus of {} bytes is outside {}..={}",
                modulus.len(),
                RSA_MIN_MODULUS_LENGTH,
                RSA_MAX_MODULUS_LENGTH
            )));
        }
        let condition = Condition::new(TypeId::Rsa, RSA_BITMASK, sha256(&modulus), modulus.len() * 2)
            .with_public_key(modulus.clone());
        Ok(Self {
            public_key,
            modulus,
            signature: None,
            condition,
        })
    }

    pub fn from_signature(public_key: RsaPublicKey, signature: &[u8]) -> Result<Self, ConditionError> {
        let mut fulfillment = Self::new(public_key)?;
        if signature.len() != fulfillment.modulus.len() {
            return Err(ConditionError::fulfillment(format!(
                "rsa signature must be {} bytes, found {}",
                fulfillment.modulus.len(),
                signature.len()
            )));
        }
        fulfillment.signature = Some(signature.to_vec());
        Ok(fulfillment)
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
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
            Some(signature) => verify_rsa(&self.public_key, message, signature),
            None => false,
        }
    }

    pub fn payload(&self) -> Result<Vec<u8>, ConditionError> {
        let signature = self
            .signature
            .as_ref()
            .ok_or_else(|| ConditionError::fulfillment("rsa fulfillment is unsigned"))?;
        let mut payload = Vec::with_capacity(self.modulus.len() * 2);
        payload.extend_from_slice(&self.modulus);
        payload.extend_from_slice(signature);
        Ok(payload)
    }

    pub(crate) fn from_payload(payload: &[u8]) -> Result<Self, ConditionError> {
        if payload.len() % 2 != 0 {
            return Err(ConditionError::fulfillment(
                "rsa payload must split into equal modulus and signature halves",
            ));
        }
        let (modulus, signature) = payload.split_at(payload.len() / 2);
        if !(RSA_MIN_MODULUS_LENGTH..=RSA_MAX_MODULUS_LENGTH).contains(&modulus.len()) {
            return Err(ConditionError::fulfillment(format!(
                "rsa modulus of {} bytes is outside {}..={}",
                modulus.len(),
                RSA_MIN_MODULUS_LENGTH,
                RSA_MAX_MODULUS_LENGTH
            )));
        }
        let public_key = rsa_public_key_from_modulus(modulus)
            .map_err(|e| ConditionError::fulfillment(e.to_string()))?;
        Self::from_signature(public_key, signature)
    }
}
