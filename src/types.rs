// Copyright 2025-present webdex contributors
// SPDX-License-Identifier: Apache-2.0

//! The building blocks of the index: documents, tokens, postings, and the
//! records that live on disk.
//!
//! # Invariants
//!
//! - **TagFrequencies**: `other ≥ 0` and the sum over all buckets equals the
//!   token's total occurrence count in the document.
//! - **Posting**: `frequency == tag_frequencies.total()`.
//! - **TokenEntry**: `df == postings.len()`, and after a merge no two
//!   postings in the same entry share a `doc_id`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// NEWTYPES
// =============================================================================

/// Stable document identifier assigned by the `PathMapper` in discovery
/// order. Starts at 1; `0` is reserved as a sentinel for "not found" at the
/// API boundary (`get_id` returns `Option<DocId>`, never the sentinel
/// itself — see `pathmapper.rs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct DocId(pub u32);

impl DocId {
    #[inline]
    pub fn new(id: u32) -> Self {
        DocId(id)
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for DocId {
    fn from(id: u32) -> Self {
        DocId(id)
    }
}

impl From<DocId> for u64 {
    fn from(id: DocId) -> Self {
        id.0 as u64
    }
}

/// A normalized token: lowercase, alphanumeric, length ≥ 2, lemmatized.
pub type Token = String;

// =============================================================================
// TAG BUCKETS
// =============================================================================

/// The fixed set of tags the tokenizer tracks frequencies for, plus the
/// `Other` residual bucket for text outside any weighted tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagBucket {
    H1,
    H2,
    H3,
    Title,
    B,
    Strong,
    Other,
}

impl TagBucket {
    /// Every weighted tag, in the order the tokenizer default configures
    /// them (does not include `Other`, which is computed, not extracted).
    pub const WEIGHTED: [TagBucket; 6] = [
        TagBucket::H1,
        TagBucket::H2,
        TagBucket::H3,
        TagBucket::Title,
        TagBucket::B,
        TagBucket::Strong,
    ];

    /// The HTML tag name this bucket is extracted from, lowercase.
    pub fn tag_name(self) -> &'static str {
        match self {
            TagBucket::H1 => "h1",
            TagBucket::H2 => "h2",
            TagBucket::H3 => "h3",
            TagBucket::Title => "title",
            TagBucket::B => "b",
            TagBucket::Strong => "strong",
            TagBucket::Other => "other",
        }
    }

    /// Tag weight used by the searcher's TF-IDF scoring (spec §4.9).
    pub fn weight(self) -> f64 {
        match self {
            TagBucket::H1 => 0.20,
            TagBucket::H2 => 0.15,
            TagBucket::H3 => 0.10,
            TagBucket::Title => 0.40,
            TagBucket::B => 0.075,
            TagBucket::Strong => 0.055,
            TagBucket::Other => 0.02,
        }
    }
}

/// Per-document, per-tag occurrence counts for one token.
///
/// Stored as a dense map over all seven buckets rather than a sparse
/// `HashMap` — the bucket set is fixed and small, so a flat struct avoids
/// both the allocation and the serialization overhead of a generic map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TagFrequencies {
    pub h1: u64,
    pub h2: u64,
    pub h3: u64,
    pub title: u64,
    pub b: u64,
    pub strong: u64,
    pub other: u64,
}

impl TagFrequencies {
    pub fn get(&self, bucket: TagBucket) -> u64 {
        match bucket {
            TagBucket::H1 => self.h1,
            TagBucket::H2 => self.h2,
            TagBucket::H3 => self.h3,
            TagBucket::Title => self.title,
            TagBucket::B => self.b,
            TagBucket::Strong => self.strong,
            TagBucket::Other => self.other,
        }
    }

    pub fn add(&mut self, bucket: TagBucket, count: u64) {
        match bucket {
            TagBucket::H1 => self.h1 += count,
            TagBucket::H2 => self.h2 += count,
            TagBucket::H3 => self.h3 += count,
            TagBucket::Title => self.title += count,
            TagBucket::B => self.b += count,
            TagBucket::Strong => self.strong += count,
            TagBucket::Other => self.other += count,
        }
    }

    /// Sum across all buckets, including `other`.
    pub fn total(&self) -> u64 {
        self.h1 + self.h2 + self.h3 + self.title + self.b + self.strong + self.other
    }
}

// =============================================================================
// POSTINGS
// =============================================================================

/// One token's occurrence record within a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub frequency: u64,
    pub tag_frequencies: TagFrequencies,
}

impl Posting {
    /// `frequency == tag_frequencies.total()` must hold; callers construct
    /// through this helper rather than the struct literal so the invariant
    /// can't be forgotten.
    pub fn new(doc_id: DocId, tag_frequencies: TagFrequencies) -> Self {
        Posting {
            doc_id,
            frequency: tag_frequencies.total(),
            tag_frequencies,
        }
    }
}

/// A token's complete disk record: how many documents contain it, and the
/// per-document postings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenEntry {
    pub df: u64,
    pub postings: Vec<Posting>,
}

impl TokenEntry {
    pub fn new() -> Self {
        TokenEntry::default()
    }

    pub fn push(&mut self, posting: Posting) {
        self.postings.push(posting);
        self.df += 1;
    }

    /// Merge `other` into `self`: concatenate postings, add `df`s. Per
    /// spec.md's resolution of the posting-merge open question, this never
    /// sums postings for a repeated `(token, doc_id)` pair — each document
    /// is tokenized exactly once per build, so the pairs cannot repeat
    /// within a single build.
    pub fn merge(&mut self, mut other: TokenEntry) {
        self.df += other.df;
        self.postings.append(&mut other.postings);
    }
}

// =============================================================================
// DOCUMENT VECTORS
// =============================================================================

/// Plain term-frequency vector over a document's full visible text, with no
/// tag weighting. Used only by the cosine re-rank stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentVector {
    pub frequencies: BTreeMap<Token, u64>,
}

impl DocumentVector {
    pub fn magnitude(&self) -> f64 {
        self.frequencies
            .values()
            .map(|&f| (f * f) as f64)
            .sum::<f64>()
            .sqrt()
    }

    /// Cosine similarity against a sparse query frequency vector.
    pub fn cosine_similarity(&self, query: &BTreeMap<Token, u64>) -> f64 {
        let dot: f64 = query
            .iter()
            .filter_map(|(token, &qf)| {
                self.frequencies
                    .get(token)
                    .map(|&df| (qf as f64) * (df as f64))
            })
            .sum();

        let query_mag = query
            .values()
            .map(|&f| (f * f) as f64)
            .sum::<f64>()
            .sqrt();
        let doc_mag = self.magnitude();

        if query_mag == 0.0 || doc_mag == 0.0 {
            0.0
        } else {
            dot / (query_mag * doc_mag)
        }
    }
}

// =============================================================================
// PARTITION ROUTING
// =============================================================================

/// A single routing entry: the minimum token held by one partition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionRoute {
    pub min_token: Token,
    pub file_name: String,
}
