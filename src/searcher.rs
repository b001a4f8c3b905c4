// Copyright 2025-present webdex contributors
// SPDX-License-Identifier: Apache-2.0

//! Query-time ranking: tag-weighted TF-IDF filtered conjunctively, then
//! re-ranked by cosine similarity over precomputed document vectors
//! (spec.md §4.9).
//!
//! The field-weight-hierarchy shape (title dominates headings dominate
//! plain content) is generalized from the teacher's `scoring/core.rs`
//! field-type base scores; the actual weights and formula here are the
//! spec's own tag weight table, not the teacher's suffix-array scoring
//! constants.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Instant;

use crate::config::SearchConfig;
use crate::error::{IndexError, Result};
use crate::normalize::TokenNormalizer;
use crate::partition::lookup_token;
use crate::pathmapper::PathMapper;
use crate::types::{DocId, PartitionRoute, TagBucket, Token};
use crate::vectors::VectorStore;

/// Above this length a query is rejected outright rather than tokenized,
/// so a pathological input can't force an unbounded per-token scan over
/// every partition file.
const MAX_QUERY_LEN: usize = 1_024;

/// Pluggable query spell-correction contract, parallel to
/// `TokenNormalizer`. Returns `None` when no correction is proposed.
pub trait SpellCorrector: Send + Sync {
    fn correct(&self, token: &str) -> Option<String>;
}

/// No-op corrector used when spell-correction is disabled.
#[derive(Default)]
pub struct NoopSpellCorrector;

impl SpellCorrector for NoopSpellCorrector {
    fn correct(&self, _token: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub url: String,
    pub primary_score: f64,
    pub cosine_similarity: f64,
}

/// One ordinal per original query word (spec.md §4.9 step 1: the
/// conjunctive filter is "must contain every *query word*", not every
/// surface form of it). Each ordinal carries the union of that word's raw
/// lowercased form with its (optional) spell-corrected and normalized
/// forms — since the index only ever stores the normalized token (see
/// `tokenizer.rs`), it's the normalized form that actually matches in the
/// common case, but all forms are looked up and OR'd together so a direct
/// index hit on the raw surface form (e.g. under `IdentityNormalizer`, or
/// a query word the normalizer leaves unchanged) still counts.
fn expand_query_tokens(
    query: &str,
    normalizer: &dyn TokenNormalizer,
    spell: Option<&dyn SpellCorrector>,
    use_spellcheck: bool,
) -> Vec<Vec<Token>> {
    let mut ordinals = Vec::new();

    for word in query.split_whitespace() {
        let mut seen = std::collections::HashSet::new();
        let mut forms = Vec::new();
        let mut push = |seen: &mut std::collections::HashSet<String>, forms: &mut Vec<String>, t: String| {
            if seen.insert(t.clone()) {
                forms.push(t);
            }
        };

        let lower = word.to_lowercase();
        push(&mut seen, &mut forms, lower.clone());

        if use_spellcheck {
            if let Some(corrector) = spell {
                if let Some(corrected) = corrector.correct(&lower) {
                    push(&mut seen, &mut forms, corrected);
                }
            }
        }

        push(&mut seen, &mut forms, normalizer.normalize(&lower));

        ordinals.push(forms);
    }

    ordinals
}

/// Raw query-word frequency vector, in the same normalized token space the
/// document vectors use, for the cosine re-rank stage.
fn query_frequency_vector(query: &str, normalizer: &dyn TokenNormalizer) -> BTreeMap<Token, u64> {
    let mut freq = BTreeMap::new();
    for word in query.split_whitespace() {
        let token = normalizer.normalize(&word.to_lowercase());
        *freq.entry(token).or_insert(0) += 1;
    }
    freq
}

fn tag_weighted_score(tag_frequencies: &crate::types::TagFrequencies, idf: f64) -> f64 {
    let mut score = 0.0;
    for bucket in TagBucket::WEIGHTED.into_iter().chain([TagBucket::Other]) {
        let freq = tag_frequencies.get(bucket);
        if freq == 0 {
            continue;
        }
        score += bucket.weight() * (1.0 + (freq as f64).ln()) * idf;
    }
    score
}

/// Run one query end to end: normalize, score, conjunctively filter,
/// primary-rank, cosine re-rank, and resolve DocIDs to URLs. Returns the
/// ranked results plus a human-readable timing string (spec.md §4.9,
/// §6 Search API).
#[allow(clippy::too_many_arguments)]
pub fn search(
    query: &str,
    partitions_dir: &Path,
    routes: &[PartitionRoute],
    mapper: &PathMapper,
    vectors: &VectorStore,
    page_count: u64,
    normalizer: &dyn TokenNormalizer,
    spell: Option<&dyn SpellCorrector>,
    config: &SearchConfig,
) -> Result<(Vec<SearchResult>, String)> {
    let started = Instant::now();

    if query.len() > MAX_QUERY_LEN {
        return Err(IndexError::Query {
            message: format!("query exceeds maximum length of {MAX_QUERY_LEN} bytes"),
        });
    }

    if query.trim().is_empty() {
        return Ok((Vec::new(), String::new()));
    }

    let ordinals = expand_query_tokens(query, normalizer, spell, config.use_spellcheck);
    if ordinals.is_empty() {
        return Ok((Vec::new(), String::new()));
    }

    // `None` = none of this ordinal's forms matched for this document;
    // `Some(score)` = at least one form matched, summed across forms, even
    // if the score itself evaluates to zero (idf=0).
    let mut doc_scores: HashMap<DocId, Vec<Option<f64>>> = HashMap::new();

    for (ordinal, forms) in ordinals.iter().enumerate() {
        for form in forms {
            let entry = lookup_token(partitions_dir, routes, form)?;
            let df = entry.df;
            let idf = if df > 0 {
                (page_count as f64 / df as f64).ln()
            } else {
                0.0
            };

            for posting in &entry.postings {
                let score = tag_weighted_score(&posting.tag_frequencies, idf);
                let slots = doc_scores
                    .entry(posting.doc_id)
                    .or_insert_with(|| vec![None; ordinals.len()]);
                slots[ordinal] = Some(slots[ordinal].unwrap_or(0.0) + score);
            }
        }
    }

    // Conjunctive filter: every ordinal must be covered.
    let mut primary: Vec<(DocId, f64)> = doc_scores
        .into_iter()
        .filter(|(_, slots)| slots.iter().all(Option::is_some))
        .map(|(doc_id, slots)| {
            let total = slots.into_iter().map(|s| s.unwrap_or(0.0)).sum();
            (doc_id, total)
        })
        .collect();

    primary.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    primary.truncate(config.primary_rank_limit);

    let query_vector = query_frequency_vector(query, normalizer);

    // Stable sort by cosine similarity descending. A stable sort preserves
    // the existing primary-rank relative order for ties, which is exactly
    // the tie-break rule in spec.md §4.9 step 5.
    let mut reranked: Vec<(DocId, f64, f64)> = primary
        .into_iter()
        .map(|(doc_id, primary_score)| {
            let cosine = vectors
                .get(doc_id)
                .map(|v| v.cosine_similarity(&query_vector))
                .unwrap_or(0.0);
            (doc_id, primary_score, cosine)
        })
        .collect();

    reranked.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let results: Vec<SearchResult> = reranked
        .into_iter()
        .filter_map(|(doc_id, primary_score, cosine_similarity)| {
            mapper.get_url_by_id(doc_id).and_then(|url| {
                if url.is_empty() {
                    None
                } else {
                    Some(SearchResult {
                        doc_id,
                        url: url.to_string(),
                        primary_score,
                        cosine_similarity,
                    })
                }
            })
        })
        .take(config.result_limit)
        .collect();

    let timing = format!("{:.3}ms", started.elapsed().as_secs_f64() * 1000.0);
    Ok((results, timing))
}
