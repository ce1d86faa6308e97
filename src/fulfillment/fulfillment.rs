//! The fulfillment sum type and its wire forms

use std::fmt;
use std::str::FromStr;

use crate::codec::{format_fulfillment_uri, parse_fulfillment_uri, Reader, Writer};
use crate::condition::{Bitmask, Condition, ConditionError, TypeId};
use crate::crypto::{KeyPair, PublicKey, HASH_LENGTH};

use super::ed25519::Ed25519;
use super::prefix::Prefix;
use super::preimage::PreImage;
use super::rsa_sha256::Rsa;
use super::threshold::Threshold;
use super::timeout::Timeout;

/// Deepest nesting of prefix and threshold fulfillments accepted on decode
pub const MAX_NESTING_DEPTH: usize = 16;

// =============================================================================
// Fulfillment
// =============================================================================

/// A proof that some condition is satisfied
///
/// `Condition` stands for a sub whose fulfillment is withheld: it keeps the
/// commitment but never validates.
#[derive(Debug, Clone)]
pub enum Fulfillment {
    PreImage(PreImage),
    Prefix(Prefix),
    Ed25519(Ed25519),
    Rsa(Rsa),
    Threshold(Threshold),
    Timeout(Timeout),
    Condition(Condition),
}

impl Fulfillment {
    /// Sign `message` with `key_pair`
    pub fn sign(key_pair: &KeyPair, message: &[u8]) -> Result<Self, ConditionError> {
        match key_pair {
            KeyPair::Ed25519(key) => Ok(Fulfillment::Ed25519(Ed25519::sign(key, message))),
            KeyPair::Rsa(key) => {
                let signature = key_pair.sign(message)?;
                Ok(Fulfillment::Rsa(Rsa::from_signature(
                    key.to_public_key(),
                    &signature,
                )?))
            }
        }
    }

    /// Unsigned fulfillment for `public_key`, good only for its condition
    pub fn from_public_key(public_key: &PublicKey) -> Result<Self, ConditionError> {
        match public_key {
            PublicKey::Ed25519(key) => Ok(Fulfillment::Ed25519(Ed25519::new(*key))),
            PublicKey::Rsa(key) => Ok(Fulfillment::Rsa(Rsa::new(key.clone())?)),
        }
    }

    /// Wrap a detached signature made by `public_key`
    pub fn from_signature(public_key: &PublicKey, signature: &[u8]) -> Result<Self, ConditionError> {
        match public_key {
            PublicKey::Ed25519(key) => Ok(Fulfillment::Ed25519(Ed25519::from_signature(
                *key, signature,
            )?)),
            PublicKey::Rsa(key) => Ok(Fulfillment::Rsa(Rsa::from_signature(
                key.clone(),
                signature,
            )?)),
        }
    }

    pub fn condition(&self) -> &Condition {
        match self {
            Fulfillment::PreImage(f) => f.condition(),
            Fulfillment::Prefix(f) => f.condition(),
            Fulfillment::Ed25519(f) => f.condition(),
            Fulfillment::Rsa(f) => f.condition(),
            Fulfillment::Threshold(f) => f.condition(),
            Fulfillment::Timeout(f) => f.condition(),
            Fulfillment::Condition(c) => c,
        }
    }

    fn condition_mut(&mut self) -> &mut Condition {
        match self {
            Fulfillment::PreImage(f) => f.condition_mut(),
            Fulfillment::Prefix(f) => f.condition_mut(),
            Fulfillment::Ed25519(f) => f.condition_mut(),
            Fulfillment::Rsa(f) => f.condition_mut(),
            Fulfillment::Threshold(f) => f.condition_mut(),
            Fulfillment::Timeout(f) => f.condition_mut(),
            Fulfillment::Condition(c) => c,
        }
    }

    /// The commitment this fulfillment proves, secrets dropped
    pub fn to_condition(&self) -> Condition {
        self.condition().clone()
    }

    pub fn type_id(&self) -> TypeId {
        self.condition().type_id()
    }

    pub fn bitmask(&self) -> Bitmask {
        self.condition().bitmask()
    }

    pub fn hash(&self) -> &[u8; HASH_LENGTH] {
        self.condition().hash()
    }

    pub fn size(&self) -> usize {
        self.condition().size()
    }

    pub fn weight(&self) -> u32 {
        self.condition().weight()
    }

    /// Set the weight this fulfillment carries in an enclosing threshold
    pub fn with_weight(mut self, weight: u32) -> Result<Self, ConditionError> {
        self.condition_mut().set_weight(weight)?;
        Ok(self)
    }

    /// Whether this value can be serialized as a full fulfillment
    pub fn can_reveal(&self) -> bool {
        match self {
            Fulfillment::PreImage(_) | Fulfillment::Timeout(_) => true,
            Fulfillment::Ed25519(f) => f.is_signed(),
            Fulfillment::Rsa(f) => f.is_signed(),
            Fulfillment::Prefix(f) => f.can_reveal(),
            Fulfillment::Threshold(f) => f.can_reveal(),
            Fulfillment::Condition(_) => false,
        }
    }

    pub fn validate(&self, message: &[u8]) -> bool {
        match self {
            Fulfillment::PreImage(f) => f.validate(message),
            Fulfillment::Prefix(f) => f.validate(message),
            Fulfillment::Ed25519(f) => f.validate(message),
            Fulfillment::Rsa(f) => f.validate(message),
            Fulfillment::Threshold(f) => f.validate(message),
            Fulfillment::Timeout(f) => f.validate(message),
            Fulfillment::Condition(_) => false,
        }
    }

    /// Check this fulfillment satisfies `condition` for `message`
    pub fn verify(&self, condition: &Condition, message: &[u8]) -> Result<(), ConditionError> {
        if self.condition() != condition {
            return Err(ConditionError::condition(format!(
                "fulfillment proves {}, expected {}",
                self.condition(),
                condition
            )));
        }
        if self.validate(message) {
            return Ok(());
        }
        match self {
            Fulfillment::Ed25519(_) | Fulfillment::Rsa(_) => Err(ConditionError::InvalidSignature),
            _ => Err(ConditionError::fulfillment(format!(
                "{} fulfillment does not validate",
                self.type_id()
            ))),
        }
    }

    pub fn payload(&self) -> Result<Vec<u8>, ConditionError> {
        match self {
            Fulfillment::PreImage(f) => Ok(f.payload()),
            Fulfillment::Prefix(f) => f.payload(),
            Fulfillment::Ed25519(f) => f.payload(),
            Fulfillment::Rsa(f) => f.payload(),
            Fulfillment::Threshold(f) => f.payload(),
            Fulfillment::Timeout(f) => Ok(f.payload()),
            Fulfillment::Condition(_) => Err(ConditionError::fulfillment(
                "a bare condition has no fulfillment payload",
            )),
        }
    }

    /// `u16(type) ∥ varoctet(payload)`
    pub fn to_binary(&self) -> Result<Vec<u8>, ConditionError> {
        let payload = self.payload()?;
        let mut w = Writer::new();
        w.write_u16(self.type_id().as_u16());
        w.write_var_octet(&payload);
        Ok(w.into_bytes())
    }

    pub fn to_uri(&self) -> Result<String, ConditionError> {
        Ok(format_fulfillment_uri(self.type_id().as_u16(), &self.payload()?))
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, ConditionError> {
        let mut r = Reader::new(bytes);
        let fulfillment = Self::read_from(&mut r, 0)?;
        r.finish().map_err(ConditionError::fulfillment)?;
        Ok(fulfillment)
    }

    pub fn from_uri(uri: &str) -> Result<Self, ConditionError> {
        let (raw_type, payload) = parse_fulfillment_uri(uri).map_err(ConditionError::fulfillment)?;
        Self::from_payload(raw_type, &payload, 0)
    }

    pub(crate) fn read_from(r: &mut Reader<'_>, depth: usize) -> Result<Self, ConditionError> {
        let raw_type = r.read_u16().map_err(ConditionError::fulfillment)?;
        let payload = r.read_var_octet().map_err(ConditionError::fulfillment)?;
        Self::from_payload(raw_type, payload, depth)
    }

    fn from_payload(raw_type: u16, payload: &[u8], depth: usize) -> Result<Self, ConditionError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(ConditionError::fulfillment(format!(
                "nesting deeper than {}",
                MAX_NESTING_DEPTH
            )));
        }
        let type_id = TypeId::from_u16(raw_type)
            .ok_or_else(|| ConditionError::fulfillment(format!("unknown type id {}", raw_type)))?;
        let fulfillment = match type_id {
            TypeId::PreImage => Fulfillment::PreImage(PreImage::from_payload(payload)),
            TypeId::Prefix => Fulfillment::Prefix(Prefix::from_payload(payload, depth)?),
            TypeId::Threshold => Fulfillment::Threshold(Threshold::from_payload(payload, depth)?),
            TypeId::Rsa => Fulfillment::Rsa(Rsa::from_payload(payload)?),
            TypeId::Ed25519 => Fulfillment::Ed25519(Ed25519::from_payload(payload)?),
            TypeId::Timeout => Fulfillment::Timeout(Timeout::from_payload(payload)?),
        };
        Ok(fulfillment)
    }
}

impl fmt::Display for Fulfillment {
    /// The fulfillment URI, or the condition URI when nothing can be revealed
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_uri() {
            Ok(uri) => write!(f, "{}", uri),
            Err(_) => write!(f, "{}", self.condition()),
        }
    }
}

impl FromStr for Fulfillment {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uri(s)
    }
}

impl From<Condition> for Fulfillment {
    fn from(condition: Condition) -> Self {
        Fulfillment::Condition(condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<Fulfillment> {
        let ed = KeyPair::generate_ed25519();
        let rsa = KeyPair::generate_rsa(1024).unwrap();
        let ed_sub = Fulfillment::sign(&ed, b"msg").unwrap();
        let preimage = Fulfillment::PreImage(PreImage::new(b"secret".to_vec()));
        let threshold = Threshold::new(
            2,
            vec![
                ed_sub.clone(),
                preimage.clone().with_weight(2).unwrap(),
                Fulfillment::sign(&KeyPair::generate_ed25519(), b"msg").unwrap(),
            ],
        )
        .unwrap();

        vec![
            preimage,
            ed_sub.clone(),
            Fulfillment::sign(&rsa, b"msg").unwrap(),
            Fulfillment::Timeout(Timeout::new(1_900_000_000)),
            Fulfillment::Prefix(Prefix::new(b"pre".to_vec(), ed_sub)),
            Fulfillment::Threshold(threshold),
        ]
    }

    #[test]
    fn test_uri_and_binary_round_trip() {
        for f in samples() {
            let uri = f.to_uri().unwrap();
            assert!(uri.starts_with("cf:"));
            let parsed: Fulfillment = uri.parse().unwrap();
            assert_eq!(parsed.hash(), f.hash());
            assert_eq!(parsed.condition(), f.condition());

            let decoded = Fulfillment::from_binary(&f.to_binary().unwrap()).unwrap();
            assert_eq!(decoded.hash(), f.hash());
            assert!(f.payload().unwrap().len() <= f.size());
        }
    }

    #[test]
    fn test_condition_form_drops_secrets() {
        let f = Fulfillment::PreImage(PreImage::new(b"secret".to_vec()));
        let reduced = Fulfillment::from(f.to_condition());

        assert_eq!(reduced.condition(), f.condition());
        assert!(!reduced.can_reveal());
        assert!(!reduced.validate(b""));
        assert!(reduced.to_uri().is_err());
        assert_eq!(reduced.to_string(), f.condition().to_uri());
    }

    #[test]
    fn test_verify_against_condition() {
        let right = Fulfillment::PreImage(PreImage::new(b"secret".to_vec()));
        let wrong = Fulfillment::PreImage(PreImage::new(b"guess".to_vec()));
        let condition = right.to_condition();

        assert!(right.verify(&condition, b"").is_ok());
        assert!(matches!(
            wrong.verify(&condition, b""),
            Err(ConditionError::InvalidCondition(_))
        ));
    }

    #[test]
    fn test_verify_reports_bad_signature() {
        let kp = KeyPair::generate_ed25519();
        let f = Fulfillment::sign(&kp, b"pay alice").unwrap();
        let condition = f.to_condition();

        assert!(f.verify(&condition, b"pay alice").is_ok());
        assert_eq!(
            f.verify(&condition, b"pay mallory"),
            Err(ConditionError::InvalidSignature)
        );
    }

    #[test]
    fn test_public_key_conditions_match_signed() {
        for kp in [
            KeyPair::generate_ed25519(),
            KeyPair::generate_rsa(1024).unwrap(),
        ] {
            let unsigned = Fulfillment::from_public_key(&kp.public_key()).unwrap();
            let signed = Fulfillment::sign(&kp, b"m").unwrap();
            assert_eq!(unsigned.condition(), signed.condition());
            assert!(!unsigned.can_reveal());
            assert!(signed.can_reveal());

            let signature = kp.sign(b"m").unwrap();
            let detached = Fulfillment::from_signature(&kp.public_key(), &signature).unwrap();
            assert!(detached.validate(b"m"));
        }
    }

    #[test]
    fn test_nested_prefix_and_threshold() {
        let kp = KeyPair::generate_ed25519();
        let inner = Fulfillment::sign(&kp, b"scope:msg").unwrap();
        let prefixed = Fulfillment::Prefix(Prefix::new(b"scope:".to_vec(), inner));
        let outer = Fulfillment::Threshold(Threshold::new(1, vec![prefixed]).unwrap());

        assert!(outer.validate(b"msg"));
        let decoded = Fulfillment::from_uri(&outer.to_uri().unwrap()).unwrap();
        assert!(decoded.validate(b"msg"));
        assert!(!decoded.validate(b"other"));
        assert!(decoded
            .bitmask()
            .contains(Bitmask::PREFIX | Bitmask::THRESHOLD | Bitmask::ED25519));
    }

    #[test]
    fn test_rejects_deep_nesting() {
        let mut f = Fulfillment::PreImage(PreImage::new(b"x".to_vec()));
        for _ in 0..=MAX_NESTING_DEPTH {
            f = Fulfillment::Prefix(Prefix::new(Vec::new(), f));
        }
        let bytes = f.to_binary().unwrap();
        assert!(Fulfillment::from_binary(&bytes).is_err());
    }

    #[test]
    fn test_decode_errors() {
        assert!(Fulfillment::from_uri("cf:5:AAAA").is_err());
        assert!(Fulfillment::from_uri("cc:0:3:AAAA:1").is_err());
        assert!(Fulfillment::from_binary(&[0x00, 0x00, 0x05, 0x01]).is_err());

        let mut bytes = Fulfillment::PreImage(PreImage::new(b"x".to_vec()))
            .to_binary()
            .unwrap();
        bytes.push(0);
        assert!(Fulfillment::from_binary(&bytes).is_err());
    }
}
