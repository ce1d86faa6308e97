//! Weighted subset search for threshold fulfillments
//!
//! Each subfulfillment of a threshold is either revealed (its full
//! fulfillment is encoded) or hidden (only its condition is encoded). The
//! search walks the subfulfillments in canonical order and keeps one
//! bucket per reached weight, capped at the threshold. Weights and threshold
//! may come off the wire, so a search that would hold more than
//! [`MAX_WEIGHT_BUCKETS`] distinct sums fails with `InvalidFulfillment`.
//!
//! Within a bucket the survivor is the candidate with the shorter encoding,
//! then the lexicographically smaller one. Two candidates in the same bucket
//! with equal length have equal-length prefixes, so whatever suffix follows
//! preserves their order and keeping only the best per bucket is exact.

use std::collections::BTreeMap;

use crate::condition::ConditionError;

/// Most distinct reached weights either search keeps at once
pub const MAX_WEIGHT_BUCKETS: usize = 4096;

/// A subfulfillment as seen by the minimal-payload search
#[derive(Debug, Clone, Copy)]
pub(crate) struct SubsetEntry<'a> {
    pub weight: u32,
    /// Encoded entry when revealed; `None` if the sub cannot be revealed
    pub revealed: Option<&'a [u8]>,
    /// Encoded entry when reduced to its condition
    pub hidden: &'a [u8],
}

/// A subfulfillment as seen by the worst-case size bound
#[derive(Debug, Clone, Copy)]
pub(crate) struct SizeEntry {
    pub weight: u32,
    pub revealed_len: usize,
    pub hidden_len: usize,
}

#[derive(Debug, Clone, Default)]
struct Candidate {
    encoding: Vec<u8>,
    reveal: Vec<bool>,
}

impl Candidate {
    fn extend(&self, entry: &[u8], revealed: bool) -> Self {
        let mut encoding = Vec::with_capacity(self.encoding.len() + entry.len());
        encoding.extend_from_slice(&self.encoding);
        encoding.extend_from_slice(entry);
        let mut reveal = self.reveal.clone();
        reveal.push(revealed);
        Self { encoding, reveal }
    }

    fn beats(&self, other: &Candidate) -> bool {
        (self.encoding.len(), &self.encoding) < (other.encoding.len(), &other.encoding)
    }
}

fn offer(buckets: &mut BTreeMap<u64, Candidate>, reached: u64, candidate: Candidate) {
    match buckets.get(&reached) {
        Some(current) if !candidate.beats(current) => {}
        _ => {
            buckets.insert(reached, candidate);
        }
    }
}

fn check_buckets(count: usize) -> Result<(), ConditionError> {
    if count > MAX_WEIGHT_BUCKETS {
        return Err(ConditionError::fulfillment(format!(
            "threshold weights reach more than {} distinct sums",
            MAX_WEIGHT_BUCKETS
        )));
    }
    Ok(())
}

/// Cheapest way to reach `threshold`
///
/// Returns the reveal flags (one per entry) and the concatenated entry
/// encodings, or `None` when the revealable weight falls short.
pub(crate) fn cheapest_reveal(
    entries: &[SubsetEntry<'_>],
    threshold: u32,
) -> Result<Option<(Vec<bool>, Vec<u8>)>, ConditionError> {
    let target = u64::from(threshold);
    let mut buckets = BTreeMap::new();
    buckets.insert(0u64, Candidate::default());

    for entry in entries {
        let mut next = BTreeMap::new();
        for (&reached, candidate) in &buckets {
            offer(&mut next, reached, candidate.extend(entry.hidden, false));
            if let Some(revealed) = entry.revealed {
                let reached = (reached + u64::from(entry.weight)).min(target);
                offer(&mut next, reached, candidate.extend(revealed, true));
            }
        }
        check_buckets(next.len())?;
        buckets = next;
    }

    Ok(buckets
        .remove(&target)
        .map(|best| (best.reveal, best.encoding)))
}

/// Largest total entry length over all assignments that reach `threshold`
///
/// `None` when even revealing every entry falls short.
pub(crate) fn largest_feasible_len(
    entries: &[SizeEntry],
    threshold: u32,
) -> Result<Option<usize>, ConditionError> {
    let target = u64::from(threshold);
    let mut buckets: BTreeMap<u64, usize> = BTreeMap::new();
    buckets.insert(0, 0);

    for entry in entries {
        let mut next: BTreeMap<u64, usize> = BTreeMap::new();
        for (&reached, &len) in &buckets {
            let hidden = next.entry(reached).or_insert(0);
            *hidden = (*hidden).max(len + entry.hidden_len);

            let reached = (reached + u64::from(entry.weight)).min(target);
            let revealed = next.entry(reached).or_insert(0);
            *revealed = (*revealed).max(len + entry.revealed_len);
        }
        check_buckets(next.len())?;
        buckets = next;
    }

    Ok(buckets.get(&target).copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    struct Owned {
        weight: u32,
        revealed: Option<Vec<u8>>,
        hidden: Vec<u8>,
    }

    fn borrow(owned: &[Owned]) -> Vec<SubsetEntry<'_>> {
        owned
            .iter()
            .map(|o| SubsetEntry {
                weight: o.weight,
                revealed: o.revealed.as_deref(),
                hidden: &o.hidden,
            })
            .collect()
    }

    /// Exhaustive reference: every in/out assignment, best by (length, bytes)
    fn brute_force(entries: &[SubsetEntry<'_>], threshold: u32) -> Option<(Vec<bool>, Vec<u8>)> {
        let mut best: Option<(Vec<bool>, Vec<u8>)> = None;
        for mask in 0u32..(1 << entries.len()) {
            let mut weight = 0u64;
            let mut encoding = Vec::new();
            let mut reveal = Vec::new();
            let mut possible = true;
            for (i, entry) in entries.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    match entry.revealed {
                        Some(bytes) => {
                            weight += u64::from(entry.weight);
                            encoding.extend_from_slice(bytes);
                            reveal.push(true);
                        }
                        None => possible = false,
                    }
                } else {
                    encoding.extend_from_slice(entry.hidden);
                    reveal.push(false);
                }
            }
            if !possible || weight < u64::from(threshold) {
                continue;
            }
            let better = match &best {
                None => true,
                Some((_, current)) => (encoding.len(), &encoding) < (current.len(), current),
            };
            if better {
                best = Some((reveal, encoding));
            }
        }
        best
    }

    fn random_entries(rng: &mut StdRng, n: usize) -> Vec<Owned> {
        (0..n)
            .map(|_| {
                let weight = rng.gen_range(1..=4);
                let revealed_len = rng.gen_range(2..=6);
                let hidden_len = rng.gen_range(2..=6);
                // Real entries differ in their first bytes whenever the
                // choice differs; keep that property here
                let revealed = if rng.gen_bool(0.8) {
                    let mut bytes = vec![rng.gen_range(1..3)];
                    bytes.extend((1..revealed_len).map(|_| rng.gen_range(0..3u8)));
                    Some(bytes)
                } else {
                    None
                };
                let mut hidden = vec![0u8];
                hidden.extend((1..hidden_len).map(|_| rng.gen_range(0..3u8)));
                Owned {
                    weight,
                    revealed,
                    hidden,
                }
            })
            .collect()
    }

    #[test]
    fn test_matches_exhaustive_search() {
        let mut rng = StdRng::seed_from_u64(7);
        for round in 0..300 {
            let n = 1 + round % 9;
            let owned = random_entries(&mut rng, n);
            let entries = borrow(&owned);
            let threshold = rng.gen_range(1..=(2 * n as u32 + 1));
            assert_eq!(
                cheapest_reveal(&entries, threshold).unwrap(),
                brute_force(&entries, threshold),
                "round {} threshold {}",
                round,
                threshold
            );
        }
    }

    #[test]
    fn test_duplicate_weights_break_ties_lexicographically() {
        let owned = vec![
            Owned {
                weight: 1,
                revealed: Some(vec![9, 9]),
                hidden: vec![1, 1],
            },
            Owned {
                weight: 1,
                revealed: Some(vec![5, 5]),
                hidden: vec![1, 1],
            },
        ];
        let entries = borrow(&owned);
        let (reveal, encoding) = cheapest_reveal(&entries, 1).unwrap().unwrap();
        // [1,1,5,5] < [9,9,1,1]
        assert_eq!(reveal, vec![false, true]);
        assert_eq!(encoding, vec![1, 1, 5, 5]);
    }

    #[test]
    fn test_prefers_shorter_payload_over_fewer_reveals() {
        let owned = vec![
            Owned {
                weight: 2,
                revealed: Some(vec![0; 50]),
                hidden: vec![0; 5],
            },
            Owned {
                weight: 1,
                revealed: Some(vec![0; 3]),
                hidden: vec![0; 5],
            },
            Owned {
                weight: 1,
                revealed: Some(vec![0; 3]),
                hidden: vec![0; 5],
            },
        ];
        let (reveal, encoding) = cheapest_reveal(&borrow(&owned), 2).unwrap().unwrap();
        assert_eq!(reveal, vec![false, true, true]);
        assert_eq!(encoding.len(), 11);
    }

    #[test]
    fn test_unreachable_threshold() {
        let owned = vec![
            Owned {
                weight: 3,
                revealed: None,
                hidden: vec![0; 4],
            },
            Owned {
                weight: 1,
                revealed: Some(vec![0; 4]),
                hidden: vec![0; 4],
            },
        ];
        assert!(cheapest_reveal(&borrow(&owned), 2).unwrap().is_none());
    }

    #[test]
    fn test_largest_feasible_len() {
        let entries = [
            SizeEntry {
                weight: 1,
                revealed_len: 100,
                hidden_len: 40,
            },
            SizeEntry {
                weight: 1,
                revealed_len: 10,
                hidden_len: 40,
            },
        ];
        // Threshold 1: reveal the large one, hide the small one
        assert_eq!(largest_feasible_len(&entries, 1), Ok(Some(140)));
        // Threshold 2: both must be revealed
        assert_eq!(largest_feasible_len(&entries, 2), Ok(Some(110)));
        assert_eq!(largest_feasible_len(&entries, 3), Ok(None));
    }

    #[test]
    fn test_distinct_weight_sums_are_capped() {
        // Powers of two reach every sum up to 2^n - 1
        let n = 13;
        let entries: Vec<SizeEntry> = (0..n)
            .map(|i| SizeEntry {
                weight: 1 << i,
                revealed_len: 4,
                hidden_len: 4,
            })
            .collect();
        let threshold = (1u32 << n) - 1;
        assert!(matches!(
            largest_feasible_len(&entries, threshold),
            Err(ConditionError::InvalidFulfillment(_))
        ));

        let owned: Vec<Owned> = (0..n)
            .map(|i| Owned {
                weight: 1 << i,
                revealed: Some(vec![1, i as u8]),
                hidden: vec![0, i as u8],
            })
            .collect();
        assert!(matches!(
            cheapest_reveal(&borrow(&owned), threshold),
            Err(ConditionError::InvalidFulfillment(_))
        ));

        // One fewer entry stays within the cap
        assert!(largest_feasible_len(&entries[..12], (1 << 12) - 1)
            .unwrap()
            .is_some());
    }
}
