//! JSON description of an output condition
//!
//! Key-based conditions (Ed25519, RSA, and thresholds over them) are
//! described structurally so a spender can rebuild the fulfillment tree
//! from public keys alone. Any other condition appears as its URI.

use serde::{Deserialize, Serialize};

use crate::condition::{Condition, ConditionError, TypeId};
use crate::crypto::PublicKey;
use crate::fulfillment::{Fulfillment, Threshold};

/// Whether a details node describes a buildable fulfillment or only a
/// condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailsKind {
    Fulfillment,
    Condition,
}

/// One node of the `details` tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDetails {
    pub bitmask: u64,
    #[serde(rename = "type")]
    pub kind: DetailsKind,
    pub type_id: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subfulfillments: Option<Vec<ConditionDetails>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u32>,
    /// Weight inside the parent threshold; absent at the root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    /// Condition URI of an opaque node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl ConditionDetails {
    /// Describe `fulfillment` (signatures and secrets are never included)
    pub fn from_fulfillment(fulfillment: &Fulfillment) -> Self {
        Self::describe(fulfillment, None)
    }

    fn describe(fulfillment: &Fulfillment, weight: Option<u32>) -> Self {
        let condition = fulfillment.condition();
        let mut details = Self {
            bitmask: condition.bitmask().bits(),
            kind: DetailsKind::Fulfillment,
            type_id: condition.type_id().as_u16(),
            public_key: None,
            subfulfillments: None,
            threshold: None,
            weight,
            uri: None,
        };

        match fulfillment {
            Fulfillment::Ed25519(f) => {
                details.public_key = Some(PublicKey::Ed25519(*f.public_key()).to_base58());
            }
            Fulfillment::Rsa(f) => {
                details.public_key = Some(PublicKey::Rsa(f.public_key().clone()).to_base58());
            }
            Fulfillment::Threshold(f) => {
                details.threshold = Some(f.threshold());
                details.subfulfillments = Some(
                    f.subfulfillments()
                        .iter()
                        .map(|sub| Self::describe(sub, Some(sub.weight())))
                        .collect(),
                );
            }
            _ => {
                details.kind = DetailsKind::Condition;
                details.uri = Some(condition.to_uri());
            }
        }
        details
    }

    /// Rebuild the unsigned fulfillment tree this node describes
    pub fn to_fulfillment(&self) -> Result<Fulfillment, ConditionError> {
        let fulfillment = match self.kind {
            DetailsKind::Condition => {
                let uri = self
                    .uri
                    .as_deref()
                    .ok_or_else(|| ConditionError::condition("condition node without uri"))?;
                Fulfillment::Condition(Condition::from_uri(uri)?)
            }
            DetailsKind::Fulfillment => self.build()?,
        };

        if fulfillment.bitmask().bits() != self.bitmask {
            return Err(ConditionError::condition(format!(
                "details declare bitmask {:#x}, tree has {:#x}",
                self.bitmask,
                fulfillment.bitmask().bits()
            )));
        }
        match self.weight {
            Some(weight) => fulfillment.with_weight(weight),
            None => Ok(fulfillment),
        }
    }

    fn build(&self) -> Result<Fulfillment, ConditionError> {
        let type_id = TypeId::from_u16(self.type_id)
            .ok_or_else(|| ConditionError::InvalidType(format!("unknown type id {}", self.type_id)))?;
        match type_id {
            TypeId::Ed25519 | TypeId::Rsa => {
                let encoded = self
                    .public_key
                    .as_deref()
                    .ok_or_else(|| ConditionError::condition("signature node without public_key"))?;
                let public_key = PublicKey::from_base58(encoded)?;
                let fulfillment = Fulfillment::from_public_key(&public_key)?;
                if fulfillment.type_id() != type_id {
                    return Err(ConditionError::InvalidType(format!(
                        "{} key under a {} node",
                        public_key.key_type(),
                        type_id
                    )));
                }
                Ok(fulfillment)
            }
            TypeId::Threshold => {
                let threshold = self
                    .threshold
                    .ok_or_else(|| ConditionError::condition("threshold node without threshold"))?;
                let subs = self
                    .subfulfillments
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(ConditionDetails::to_fulfillment)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Fulfillment::Threshold(Threshold::new(threshold, subs)?))
            }
            other => Err(ConditionError::InvalidType(format!(
                "{} cannot be described structurally",
                other
            ))),
        }
    }
}

/// The `condition` object of an output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDocument {
    pub details: ConditionDetails,
    pub uri: String,
}

impl ConditionDocument {
    pub fn from_fulfillment(fulfillment: &Fulfillment) -> Self {
        Self {
            details: ConditionDetails::from_fulfillment(fulfillment),
            uri: fulfillment.condition().to_uri(),
        }
    }

    /// Parse the URI, checking the details describe the same condition
    pub fn to_condition(&self) -> Result<Condition, ConditionError> {
        let condition = Condition::from_uri(&self.uri)?;
        let described = self.details.to_fulfillment()?;
        if described.condition() != &condition {
            return Err(ConditionError::condition(format!(
                "details describe {}, uri is {}",
                described.condition(),
                self.uri
            )));
        }
        Ok(condition)
    }
}

/// Condition locking an output to `owners`
///
/// One key locks to that key's signature; several keys require all of
/// them through an n-of-n threshold.
pub fn owners_fulfillment(owners: &[PublicKey]) -> Result<Fulfillment, ConditionError> {
    match owners {
        [] => Err(ConditionError::condition("an output needs at least one owner")),
        [owner] => Fulfillment::from_public_key(owner),
        _ => {
            let subs = owners
                .iter()
                .map(Fulfillment::from_public_key)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Fulfillment::Threshold(Threshold::new(owners.len() as u32, subs)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::fulfillment::PreImage;

    #[test]
    fn test_single_key_details_json() {
        let kp = KeyPair::generate_ed25519();
        let f = owners_fulfillment(&[kp.public_key()]).unwrap();
        let json = serde_json::to_value(ConditionDocument::from_fulfillment(&f)).unwrap();

        assert_eq!(json["details"]["type"], "fulfillment");
        assert_eq!(json["details"]["type_id"], 4);
        assert_eq!(json["details"]["bitmask"], 0x20);
        assert_eq!(json["details"]["public_key"], kp.public_key().to_base58());
        assert!(json["details"].get("subfulfillments").is_none());
        assert!(json["uri"].as_str().unwrap().starts_with("cc:4:20:"));
    }

    #[test]
    fn test_threshold_details_round_trip() {
        let keys: Vec<PublicKey> = (0..3)
            .map(|_| KeyPair::generate_ed25519().public_key())
            .collect();
        let f = owners_fulfillment(&keys).unwrap();
        let document = ConditionDocument::from_fulfillment(&f);

        assert_eq!(document.details.threshold, Some(3));
        assert_eq!(document.details.subfulfillments.as_ref().unwrap().len(), 3);
        assert_eq!(document.to_condition().unwrap(), f.to_condition());

        let json = serde_json::to_string(&document).unwrap();
        let parsed: ConditionDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, document);
    }

    #[test]
    fn test_opaque_leaf_uses_uri() {
        let preimage = Fulfillment::PreImage(PreImage::new(b"secret".to_vec()));
        let kp = KeyPair::generate_ed25519();
        let f = Fulfillment::Threshold(
            Threshold::new(1, vec![preimage.clone(), Fulfillment::sign(&kp, b"m").unwrap()])
                .unwrap(),
        );
        let details = ConditionDetails::from_fulfillment(&f);
        let leaf = details
            .subfulfillments
            .as_ref()
            .unwrap()
            .iter()
            .find(|d| d.kind == DetailsKind::Condition)
            .unwrap();
        assert_eq!(leaf.uri.as_deref(), Some(preimage.condition().to_uri().as_str()));

        let rebuilt = details.to_fulfillment().unwrap();
        assert_eq!(rebuilt.condition(), f.condition());
    }

    #[test]
    fn test_mismatched_uri_rejected() {
        let a = owners_fulfillment(&[KeyPair::generate_ed25519().public_key()]).unwrap();
        let b = owners_fulfillment(&[KeyPair::generate_ed25519().public_key()]).unwrap();
        let mut document = ConditionDocument::from_fulfillment(&a);
        document.uri = b.condition().to_uri();
        assert!(matches!(
            document.to_condition(),
            Err(ConditionError::InvalidCondition(_))
        ));
    }

    #[test]
    fn test_no_owners_rejected() {
        assert!(owners_fulfillment(&[]).is_err());
    }
}
