// Copyright 2025-present webdex contributors
// SPDX-License-Identifier: Apache-2.0

//! SimHash near-duplicate detection (spec.md §4.2).
//!
//! Ported directly from the original's bit-summing construction: each
//! token is MD5-hashed to 128 bits, weighted by its frequency in the
//! document, and each bit position accumulates `±weight` according to
//! whether that bit of the hash is set. The final fingerprint bit is 1
//! where the accumulated sum is positive.

use std::collections::BTreeMap;

use md5::{Digest, Md5};

const FINGERPRINT_BITS: usize = 128;
const FINGERPRINT_BYTES: usize = FINGERPRINT_BITS / 8;

pub type Fingerprint = [u8; FINGERPRINT_BYTES];

/// Compute the 128-bit SimHash fingerprint of a document's token frequency
/// map (spec.md §4.2). Tokens are weighted by their frequency within the
/// document being fingerprinted.
pub fn fingerprint(token_frequencies: &BTreeMap<String, u64>) -> Fingerprint {
    let mut bit_sums = [0i64; FINGERPRINT_BITS];

    for (token, &weight) in token_frequencies {
        let mut hasher = Md5::new();
        hasher.update(token.as_bytes());
        let digest = hasher.finalize();

        for bit in 0..FINGERPRINT_BITS {
            let byte = digest[bit / 8];
            let set = (byte >> (7 - (bit % 8))) & 1 == 1;
            if set {
                bit_sums[bit] += weight as i64;
            } else {
                bit_sums[bit] -= weight as i64;
            }
        }
    }

    let mut out = [0u8; FINGERPRINT_BYTES];
    for bit in 0..FINGERPRINT_BITS {
        if bit_sums[bit] > 0 {
            out[bit / 8] |= 1 << (7 - (bit % 8));
        }
    }
    out
}

fn hamming_distance(a: &Fingerprint, b: &Fingerprint) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Similarity in `[0, 1]`; `1 - hamming(a, b) / 128`.
pub fn similarity(a: &Fingerprint, b: &Fingerprint) -> f64 {
    1.0 - (hamming_distance(a, b) as f64) / (FINGERPRINT_BITS as f64)
}

/// The set of fingerprints accepted so far during a build.
///
/// Reference semantics per spec.md §4.2 are an unbounded linear scan
/// against every kept fingerprint; for very large corpora this is the
/// dominant cost of the near-duplicate filter, and implementers may choose
/// to cap the set and fall back to bit-sampled LSH. This implementation
/// keeps the reference linear-scan behavior.
#[derive(Debug, Default)]
pub struct SimHashSet {
    fingerprints: Vec<Fingerprint>,
    threshold: f64,
}

impl SimHashSet {
    pub fn new(threshold: f64) -> Self {
        SimHashSet {
            fingerprints: Vec::new(),
            threshold,
        }
    }

    /// Returns `true` if `fp` is within the similarity threshold of any
    /// fingerprint already accepted, i.e. the document is a duplicate.
    pub fn is_duplicate(&self, fp: &Fingerprint) -> bool {
        self.fingerprints
            .iter()
            .any(|kept| similarity(kept, fp) >= self.threshold)
    }

    /// Record `fp` as accepted. Callers should check `is_duplicate` first;
    /// this does not check for you so that duplicate documents can still
    /// be recorded deliberately by tests.
    pub fn insert(&mut self, fp: Fingerprint) {
        self.fingerprints.push(fp);
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}
