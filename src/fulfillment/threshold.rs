//! Weighted M-of-N threshold fulfillment
//!
//! A threshold commits to every subcondition and its weight, in canonical
//! order (weight descending, then condition binary ascending). Which subs
//! are revealed in the payload is decided at construction by the
//! minimal-payload search in [`super::subset`]; a decoded threshold keeps
//! exactly the subs its sender revealed. The condition hash never depends
//! on that choice.

use std::cmp::Reverse;

use log::debug;

use crate::codec::{var_octet_len, var_uint_len, Reader, Writer};
use crate::condition::{Condition, ConditionError, TypeId, THRESHOLD_BITMASK};
use crate::crypto::sha256;

use super::fulfillment::Fulfillment;
use super::subset::{cheapest_reveal, largest_feasible_len, SizeEntry, SubsetEntry};

/// Most subfulfillments a single threshold may carry
pub const MAX_SUBFULFILLMENTS: usize = 32;

/// Largest threshold payload this crate will produce
pub const MAX_PAYLOAD_SIZE: usize = 4095;

/// Outcome of the minimal-payload search
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selection {
    /// One flag per canonical sub: revealed or reduced to its condition
    Revealed(Vec<bool>),
    /// The revealable subs carry too little weight
    Unsatisfied { available: u64 },
    /// The cheapest satisfying payload is over [`MAX_PAYLOAD_SIZE`]
    TooLarge(usize),
}

#[derive(Debug, Clone)]
pub struct Threshold {
    threshold: u32,
    subs: Vec<Fulfillment>,
    selection: Selection,
    condition: Condition,
}

impl Threshold {
    /// Assemble a threshold over `subs`
    ///
    /// Subs that are bare conditions count toward the committed weight but
    /// can never be revealed. Fails with `InsufficientThreshold` when even
    /// the full weight of every sub falls short of `threshold`.
    pub fn new(threshold: u32, mut subs: Vec<Fulfillment>) -> Result<Self, ConditionError> {
        check_shape(threshold, subs.len())?;
        subs.sort_by_cached_key(canonical_key);

        let condition = threshold_condition(threshold, &subs)?;
        let selection = select(threshold, &subs)?;
        Ok(Self {
            threshold,
            subs,
            selection,
            condition,
        })
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Subfulfillments in canonical order
    pub fn subfulfillments(&self) -> &[Fulfillment] {
        &self.subs
    }

    /// Whether the canonical sub at `index` is revealed in the payload
    pub fn is_revealed(&self, index: usize) -> bool {
        match &self.selection {
            Selection::Revealed(flags) => flags.get(index).copied().unwrap_or(false),
            _ => false,
        }
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub(crate) fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }

    pub fn can_reveal(&self) -> bool {
        matches!(self.selection, Selection::Revealed(_))
    }

    /// Subs carrying a full fulfillment rather than a bare condition
    fn live(&self) -> impl Iterator<Item = &Fulfillment> + '_ {
        self.subs.iter().filter(|sub| sub.can_reveal())
    }

    /// Validate every live sub against the same message
    ///
    /// Passes when the weight of the live subs that validate reaches the
    /// threshold, whichever of them the payload would reveal.
    pub fn validate(&self, message: &[u8]) -> bool {
        let weight: u64 = self
            .live()
            .filter(|sub| sub.validate(message))
            .map(|sub| u64::from(sub.weight()))
            .sum();
        weight >= u64::from(self.threshold)
    }

    /// Validate with one var-octet message segment per live sub
    ///
    /// Segments are consumed in canonical order. A missing, malformed, or
    /// surplus segment fails the whole check.
    pub fn validate_segments(&self, message: &[u8]) -> bool {
        let mut r = Reader::new(message);
        let mut weight = 0u64;
        for sub in self.live() {
            let segment = match r.read_var_octet() {
                Ok(segment) => segment,
                Err(_) => return false,
            };
            if sub.validate(segment) {
                weight += u64::from(sub.weight());
            }
        }
        r.finish().is_ok() && weight >= u64::from(self.threshold)
    }

    /// `BE32(threshold) ∥ varuint(n) ∥ Σ [varuint(weight) ∥ varoctet(fulfillment) ∥ varoctet(condition)]`
    pub fn payload(&self) -> Result<Vec<u8>, ConditionError> {
        let flags = match &self.selection {
            Selection::Revealed(flags) => flags,
            Selection::Unsatisfied { available } => {
                return Err(ConditionError::InsufficientThreshold {
                    threshold: self.threshold,
                    available: *available,
                })
            }
            Selection::TooLarge(len) => return Err(ConditionError::PayloadTooLarge(*len)),
        };

        let mut w = Writer::new();
        w.write_u32(self.threshold);
        w.write_var_uint(self.subs.len() as u64);
        for (sub, &revealed) in self.subs.iter().zip(flags) {
            w.write_bytes(&entry(sub, revealed)?);
        }
        Ok(w.into_bytes())
    }

    /// Decode a payload, keeping the sender's choice of revealed subs
    pub(crate) fn from_payload(payload: &[u8], depth: usize) -> Result<Self, ConditionError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ConditionError::PayloadTooLarge(payload.len()));
        }
        let mut r = Reader::new(payload);
        let threshold = r.read_u32().map_err(ConditionError::fulfillment)?;
        let count = r.read_var_uint().map_err(ConditionError::fulfillment)?;
        if count == 0 || count > MAX_SUBFULFILLMENTS as u64 {
            return Err(ConditionError::fulfillment(format!(
                "threshold declares {} subfulfillments",
                count
            )));
        }

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let weight = r.read_var_uint().map_err(ConditionError::fulfillment)?;
            let weight = u32::try_from(weight).map_err(|_| ConditionError::InvalidWeight)?;
            let fulfillment = r.read_var_octet().map_err(ConditionError::fulfillment)?;
            let condition = r.read_var_octet().map_err(ConditionError::fulfillment)?;

            let (sub, revealed) = match (fulfillment.is_empty(), condition.is_empty()) {
                (false, true) => {
                    let mut inner = Reader::new(fulfillment);
                    let sub = Fulfillment::read_from(&mut inner, depth + 1)?;
                    inner.finish().map_err(ConditionError::fulfillment)?;
                    (sub, true)
                }
                (true, false) => {
                    let condition = Condition::from_binary(condition)?;
                    (Fulfillment::Condition(condition), false)
                }
                _ => {
                    return Err(ConditionError::fulfillment(
                        "threshold entry must carry exactly one of fulfillment or condition",
                    ))
                }
            };
            entries.push((sub.with_weight(weight)?, revealed));
        }
        r.finish().map_err(ConditionError::fulfillment)?;
        check_shape(threshold, entries.len())?;

        let revealed_weight: u64 = entries
            .iter()
            .filter(|(_, revealed)| *revealed)
            .map(|(sub, _)| u64::from(sub.weight()))
            .sum();
        if revealed_weight < u64::from(threshold) {
            return Err(ConditionError::fulfillment(
                "revealed subfulfillments do not reach the threshold",
            ));
        }

        entries.sort_by_cached_key(|(sub, _)| canonical_key(sub));
        let (subs, flags): (Vec<Fulfillment>, Vec<bool>) = entries.into_iter().unzip();
        let condition = threshold_condition(threshold, &subs)?;
        Ok(Self {
            threshold,
            subs,
            selection: Selection::Revealed(flags),
            condition,
        })
    }
}

fn check_shape(threshold: u32, count: usize) -> Result<(), ConditionError> {
    if threshold == 0 {
        return Err(ConditionError::fulfillment("threshold must be at least 1"));
    }
    if count == 0 {
        return Err(ConditionError::fulfillment("threshold has no subfulfillments"));
    }
    if count > MAX_SUBFULFILLMENTS {
        return Err(ConditionError::TooManySubfulfillments(count));
    }
    Ok(())
}

fn canonical_key(sub: &Fulfillment) -> (Reverse<u32>, Vec<u8>) {
    (Reverse(sub.weight()), sub.condition().to_binary())
}

/// Condition over subs already in canonical order
fn threshold_condition(threshold: u32, subs: &[Fulfillment]) -> Result<Condition, ConditionError> {
    let bitmask = subs
        .iter()
        .fold(THRESHOLD_BITMASK, |acc, sub| acc | sub.condition().bitmask());
    let hash = sha256(&fingerprint(threshold, subs));
    let size = max_payload_len(threshold, subs)?;
    Ok(Condition::new(TypeId::Threshold, bitmask, hash, size))
}

/// Hash preimage: every sub in condition form, whatever is revealed
fn fingerprint(threshold: u32, subs: &[Fulfillment]) -> Vec<u8> {
    let mut w = Writer::new();
    w.write_u32(threshold);
    w.write_var_uint(subs.len() as u64);
    for sub in subs {
        w.write_var_uint(u64::from(sub.weight()));
        sub.condition().write_to(&mut w);
    }
    w.into_bytes()
}

/// Encoded payload entry for one sub
fn entry(sub: &Fulfillment, revealed: bool) -> Result<Vec<u8>, ConditionError> {
    let mut w = Writer::new();
    w.write_var_uint(u64::from(sub.weight()));
    if revealed {
        w.write_var_octet(&sub.to_binary()?);
        w.write_var_octet(&[]);
    } else {
        w.write_var_octet(&[]);
        w.write_var_octet(&sub.condition().to_binary());
    }
    Ok(w.into_bytes())
}

/// Worst-case payload length over every assignment that meets the threshold
fn max_payload_len(threshold: u32, subs: &[Fulfillment]) -> Result<usize, ConditionError> {
    let entries: Vec<SizeEntry> = subs
        .iter()
        .map(|sub| {
            let condition = sub.condition();
            let weight_len = var_uint_len(u64::from(condition.weight()));
            SizeEntry {
                weight: condition.weight(),
                revealed_len: weight_len + var_octet_len(2 + var_octet_len(condition.size())) + 1,
                hidden_len: weight_len + 1 + var_octet_len(condition.binary_len()),
            }
        })
        .collect();

    let body = largest_feasible_len(&entries, threshold)?.ok_or_else(|| {
        ConditionError::InsufficientThreshold {
            threshold,
            available: subs.iter().map(|sub| u64::from(sub.weight())).sum(),
        }
    })?;
    Ok(4 + var_uint_len(subs.len() as u64) + body)
}

fn select(threshold: u32, subs: &[Fulfillment]) -> Result<Selection, ConditionError> {
    let mut hidden = Vec::with_capacity(subs.len());
    let mut revealed = Vec::with_capacity(subs.len());
    for sub in subs {
        hidden.push(entry(sub, false)?);
        revealed.push(if sub.can_reveal() {
            Some(entry(sub, true)?)
        } else {
            None
        });
    }

    let entries: Vec<SubsetEntry<'_>> = subs
        .iter()
        .zip(hidden.iter().zip(&revealed))
        .map(|(sub, (hidden, revealed))| SubsetEntry {
            weight: sub.weight(),
            revealed: revealed.as_deref(),
            hidden,
        })
        .collect();

    let header_len = 4 + var_uint_len(subs.len() as u64);
    let selection = match cheapest_reveal(&entries, threshold)? {
        Some((_, body)) if header_len + body.len() > MAX_PAYLOAD_SIZE => {
            Selection::TooLarge(header_len + body.len())
        }
        Some((flags, body)) => {
            debug!(
                "threshold {} of {}: revealing {} subs in {} bytes",
                threshold,
                subs.len(),
                flags.iter().filter(|f| **f).count(),
                header_len + body.len()
            );
            Selection::Revealed(flags)
        }
        None => {
            let available = subs
                .iter()
                .filter(|sub| sub.can_reveal())
                .map(|sub| u64::from(sub.weight()))
                .sum();
            debug!(
                "threshold {} of {}: only weight {} can be revealed",
                threshold,
                subs.len(),
                available
            );
            Selection::Unsatisfied { available }
        }
    };
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fulfillment::{Ed25519, PreImage};
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    fn signed(key: &SigningKey, message: &[u8], weight: u32) -> Fulfillment {
        Fulfillment::Ed25519(Ed25519::sign(key, message))
            .with_weight(weight)
            .unwrap()
    }

    fn keys(n: usize) -> Vec<SigningKey> {
        (0..n).map(|_| SigningKey::generate(&mut OsRng)).collect()
    }

    #[test]
    fn test_weighted_three_of_four() {
        let keys = keys(4);
        let weights = [1, 1, 2, 1];
        let mut subs: Vec<Fulfillment> = keys
            .iter()
            .zip(weights)
            .map(|(key, weight)| signed(key, b"msg", weight))
            .collect();
        // Leave the last weight-1 sub unrevealable
        subs[3] = Fulfillment::Condition(subs[3].to_condition());

        let f = Threshold::new(4, subs.clone()).unwrap();
        assert!(f.validate(b"msg"));
        assert!(!f.validate(b"other"));

        // One passing weight-1 sub now signs something else: 3 < 4
        subs[0] = signed(&keys[0], b"other", 1);
        let f = Threshold::new(4, subs).unwrap();
        assert!(!f.validate(b"msg"));
    }

    /// Payload revealing every sub, in the given order
    fn reveal_all(threshold: u32, subs: &[Fulfillment]) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_u32(threshold);
        w.write_var_uint(subs.len() as u64);
        for sub in subs {
            w.write_bytes(&entry(sub, true).unwrap());
        }
        w.into_bytes()
    }

    #[test]
    fn test_weighted_all_live_one_failing() {
        let keys = keys(4);
        let weights = [1, 1, 2, 1];
        let mut subs: Vec<Fulfillment> = keys
            .iter()
            .zip(weights)
            .map(|(key, weight)| signed(key, b"msg", weight))
            .collect();

        // 1 + 2 + 1 still passes with one weight-1 sub signing elsewhere
        subs[0] = signed(&keys[0], b"other", 1);
        let f = Threshold::new(4, subs.clone()).unwrap();
        assert!(f.validate(b"msg"));

        // 2 + 1 < 4
        subs[1] = signed(&keys[1], b"other", 1);
        let f = Threshold::new(4, subs).unwrap();
        assert!(!f.validate(b"msg"));
    }

    #[test]
    fn test_decoded_keeps_every_revealed_sub() {
        let keys = keys(4);
        let weights = [1, 1, 2, 1];
        let mut subs: Vec<Fulfillment> = keys
            .iter()
            .zip(weights)
            .map(|(key, weight)| signed(key, b"msg", weight))
            .collect();
        subs[0] = signed(&keys[0], b"other", 1);
        let canonical = Threshold::new(4, subs.clone()).unwrap();

        let payload = reveal_all(4, canonical.subfulfillments());
        let decoded = Threshold::from_payload(&payload, 0).unwrap();
        assert_eq!(decoded.condition(), canonical.condition());
        assert!((0..4).all(|i| decoded.is_revealed(i)));
        assert_eq!(decoded.payload().unwrap(), payload);
        assert!(decoded.validate(b"msg"));

        subs[1] = signed(&keys[1], b"other", 1);
        let canonical = Threshold::new(4, subs).unwrap();
        let decoded =
            Threshold::from_payload(&reveal_all(4, canonical.subfulfillments()), 0).unwrap();
        assert!(!decoded.validate(b"msg"));
    }

    #[test]
    fn test_decoded_one_of_two_with_failing_sub() {
        for _ in 0..20 {
            let keys = keys(2);
            let subs = vec![signed(&keys[0], b"m", 1), signed(&keys[1], b"other", 1)];
            let decoded = Threshold::from_payload(&reveal_all(1, &subs), 0).unwrap();
            assert!(decoded.validate(b"m"));
            assert!(decoded.validate(b"other"));
            assert!(!decoded.validate(b"neither"));
        }
    }

    #[test]
    fn test_decode_rejects_exploding_weight_sums() {
        // Weights 2^i reach every sum up to the threshold
        let subs: Vec<Fulfillment> = (0..13u32)
            .map(|i| {
                Fulfillment::PreImage(PreImage::new(vec![i as u8]))
                    .with_weight(1 << i)
                    .unwrap()
            })
            .collect();
        let threshold = (1 << 13) - 1;

        assert!(matches!(
            Threshold::from_payload(&reveal_all(threshold, &subs), 0),
            Err(ConditionError::InvalidFulfillment(_))
        ));
        assert!(matches!(
            Threshold::new(threshold, subs),
            Err(ConditionError::InvalidFulfillment(_))
        ));
    }

    #[test]
    fn test_hash_ignores_revealed_subset() {
        let keys = keys(3);
        let full: Vec<Fulfillment> = keys.iter().map(|k| signed(k, b"m", 1)).collect();

        let mut first_two = full.clone();
        first_two[2] = Fulfillment::Condition(full[2].to_condition());
        let mut last_two = full.clone();
        last_two[0] = Fulfillment::Condition(full[0].to_condition());

        let a = Threshold::new(2, first_two).unwrap();
        let b = Threshold::new(2, last_two).unwrap();
        let c = Threshold::new(2, full).unwrap();
        assert_eq!(a.condition(), b.condition());
        assert_eq!(a.condition(), c.condition());
        assert_ne!(a.payload().unwrap(), b.payload().unwrap());
    }

    #[test]
    fn test_canonical_order_is_input_independent() {
        let keys = keys(3);
        let subs = vec![
            signed(&keys[0], b"m", 1),
            signed(&keys[1], b"m", 3),
            signed(&keys[2], b"m", 1),
        ];
        let mut reversed = subs.clone();
        reversed.reverse();

        let a = Threshold::new(2, subs).unwrap();
        let b = Threshold::new(2, reversed).unwrap();
        assert_eq!(a.condition(), b.condition());
        assert_eq!(a.subfulfillments()[0].weight(), 3);
        assert!(
            a.subfulfillments()[1].condition().to_binary()
                < a.subfulfillments()[2].condition().to_binary()
        );
    }

    #[test]
    fn test_selection_prefers_smaller_payload() {
        let key = SigningKey::generate(&mut OsRng);
        let f = Threshold::new(
            1,
            vec![
                signed(&key, b"m", 1),
                Fulfillment::PreImage(PreImage::new(b"tiny".to_vec())),
            ],
        )
        .unwrap();

        let revealed: Vec<TypeId> = (0..2)
            .filter(|i| f.is_revealed(*i))
            .map(|i| f.subfulfillments()[i].type_id())
            .collect();
        assert_eq!(revealed, vec![TypeId::PreImage]);
        assert!(f.payload().unwrap().len() <= f.condition().size());
    }

    #[test]
    fn test_size_bounds_every_payload() {
        let keys = keys(4);
        let subs: Vec<Fulfillment> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| signed(k, b"m", 1 + i as u32 % 2))
            .collect();
        for threshold in 1..=6 {
            let f = Threshold::new(threshold, subs.clone()).unwrap();
            assert!(f.payload().unwrap().len() <= f.condition().size());
        }
    }

    #[test]
    fn test_payload_round_trip() {
        let keys = keys(3);
        let subs = vec![
            signed(&keys[0], b"m", 2),
            signed(&keys[1], b"m", 1),
            Fulfillment::Condition(signed(&keys[2], b"m", 1).to_condition()),
        ];
        let f = Threshold::new(3, subs).unwrap();

        let decoded = Threshold::from_payload(&f.payload().unwrap(), 0).unwrap();
        assert_eq!(decoded.condition(), f.condition());
        assert!(decoded.validate(b"m"));
        assert!(!decoded.validate(b"n"));
    }

    #[test]
    fn test_validate_segments() {
        let keys = keys(2);
        let f = Threshold::new(
            2,
            vec![signed(&keys[0], b"left", 1), signed(&keys[1], b"right", 1)],
        )
        .unwrap();
        let order: Vec<&[u8]> = f
            .subfulfillments()
            .iter()
            .map(|sub| if sub.validate(b"left") { &b"left"[..] } else { &b"right"[..] })
            .collect();

        let mut w = Writer::new();
        for segment in &order {
            w.write_var_octet(segment);
        }
        let message = w.into_bytes();
        assert!(f.validate_segments(&message));
        assert!(!f.validate_segments(&message[..message.len() - 1]));
        assert!(!f.validate(b"left"));
    }

    #[test]
    fn test_construction_errors() {
        let key = SigningKey::generate(&mut OsRng);
        let sub = signed(&key, b"m", 1);

        assert!(matches!(
            Threshold::new(2, vec![sub.clone()]),
            Err(ConditionError::InsufficientThreshold { threshold: 2, available: 1 })
        ));
        assert!(Threshold::new(0, vec![sub.clone()]).is_err());
        assert!(Threshold::new(1, vec![]).is_err());
        assert!(matches!(
            Threshold::new(1, vec![sub; MAX_SUBFULFILLMENTS + 1]),
            Err(ConditionError::TooManySubfulfillments(33))
        ));
    }

    #[test]
    fn test_unrevealable_threshold_has_condition_only() {
        let key = SigningKey::generate(&mut OsRng);
        let unsigned = Fulfillment::Ed25519(Ed25519::new(key.verifying_key()));
        let f = Threshold::new(1, vec![unsigned]).unwrap();

        assert!(!f.can_reveal());
        assert!(!f.validate(b"m"));
        assert!(matches!(
            f.payload(),
            Err(ConditionError::InsufficientThreshold { threshold: 1, available: 0 })
        ));
    }

    #[test]
    fn test_decode_rejects_malformed_entries() {
        let mut w = Writer::new();
        w.write_u32(1);
        w.write_var_uint(1);
        w.write_var_uint(1);
        w.write_var_octet(&[]);
        w.write_var_octet(&[]);
        assert!(Threshold::from_payload(&w.into_bytes(), 0).is_err());

        let mut w = Writer::new();
        w.write_u32(1);
        w.write_var_uint(0);
        assert!(Threshold::from_payload(&w.into_bytes(), 0).is_err());
    }
}
