// Copyright 2025-present webdex contributors
// SPDX-License-Identifier: Apache-2.0

//! Extracts `{token → TagFrequencies}` from one document's HTML.
//!
//! Parsing is always lenient (spec.md §4.1 step 1): `scraper` never aborts
//! on malformed markup, it just does its best. The only failure mode this
//! module reports is a document with no extractable text at all.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use scraper::{Html, Selector};

use crate::error::{IndexError, Result};
use crate::normalize::TokenNormalizer;
use crate::types::{TagBucket, TagFrequencies, Token};

/// Minimum token length; shorter tokens are dropped (spec.md §3 Token).
const MIN_TOKEN_LEN: usize = 2;

fn weighted_selector(bucket: TagBucket) -> &'static Selector {
    static SELECTORS: OnceLock<[Selector; 6]> = OnceLock::new();
    let table = SELECTORS.get_or_init(|| {
        TagBucket::WEIGHTED.map(|b| {
            Selector::parse(b.tag_name())
                .unwrap_or_else(|_| panic!("invalid built-in selector for {:?}", b))
        })
    });
    let idx = TagBucket::WEIGHTED
        .iter()
        .position(|b| *b == bucket)
        .expect("bucket is in WEIGHTED");
    &table[idx]
}

/// Split on runs of non-alphanumeric characters, lowercase, drop short
/// tokens. Mirrors `[^a-zA-Z\d]+` from spec.md §3.
fn split_words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| w.len() >= MIN_TOKEN_LEN)
        .map(|w| w.to_lowercase())
}

/// Direct (non-recursive) text-node children of every element matched by
/// `selector`, concatenated with single-space separators.
fn direct_child_text(document: &Html, selector: &Selector) -> String {
    let mut out = String::new();
    for element in document.select(selector) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(text);
            }
        }
    }
    out
}

/// All visible text nodes in the document, concatenated with single-space
/// separators. `scraper`'s text-node walk already excludes comments and
/// doctype declarations.
fn full_visible_text(document: &Html) -> String {
    document
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tokenize one document's HTML into `{token → TagFrequencies}`.
///
/// `path` is used only to attribute errors/warnings to the originating
/// file; this function has no side effects on disk.
pub fn tokenize_document(
    html: &str,
    normalizer: &dyn TokenNormalizer,
    path: &Path,
) -> Result<BTreeMap<Token, TagFrequencies>> {
    let document = Html::parse_document(html);

    let total_text = full_visible_text(&document);
    if total_text.trim().is_empty() {
        tracing::warn!(path = %path.display(), "document has no extractable text");
        return Err(IndexError::HtmlParse {
            path: path.to_path_buf(),
        });
    }

    let mut total_counts: BTreeMap<Token, u64> = BTreeMap::new();
    for word in split_words(&total_text) {
        let token = normalizer.normalize(&word);
        *total_counts.entry(token).or_insert(0) += 1;
    }

    let mut per_tag: BTreeMap<Token, TagFrequencies> = BTreeMap::new();
    for token in total_counts.keys() {
        per_tag.insert(token.clone(), TagFrequencies::default());
    }

    for bucket in TagBucket::WEIGHTED {
        let selector = weighted_selector(bucket);
        let tag_text = direct_child_text(&document, selector);
        let mut tag_counts: BTreeMap<Token, u64> = BTreeMap::new();
        for word in split_words(&tag_text) {
            let token = normalizer.normalize(&word);
            *tag_counts.entry(token).or_insert(0) += 1;
        }
        for (token, count) in tag_counts {
            per_tag
                .entry(token)
                .or_insert_with(TagFrequencies::default)
                .add(bucket, count);
        }
    }

    for (token, total) in &total_counts {
        let freqs = per_tag.entry(token.clone()).or_insert_with(TagFrequencies::default);
        let weighted_sum: u64 = TagBucket::WEIGHTED.iter().map(|b| freqs.get(*b)).sum();
        let other = *total as i64 - weighted_sum as i64;
        if other < 0 {
            return Err(IndexError::DataIntegrity {
                path: path.to_path_buf(),
                token: token.clone(),
                other,
            });
        }
        freqs.other = other as u64;
    }

    // Tokens that only appeared inside weighted tags but were somehow absent
    // from total_counts cannot occur: every weighted-tag text run is also a
    // subset of the full visible text. Tokens present only via per_tag with
    // no total_counts entry would indicate a parser inconsistency; none are
    // expected here, so per_tag is already keyed exactly by total_counts.

    Ok(per_tag)
}

/// Independent raw word-frequency count over a document's full visible
/// text, for SimHash fingerprinting (spec.md §4.2: "tokenize the plain
/// text" is distinct from §4.1's normalized `normalized_token` extraction).
/// Lowercases and splits the same way `tokenize_document` does but never
/// applies a `TokenNormalizer`, so a pluggable stemmer can't collapse
/// distinct surface forms ("running"/"runs"/"run") into one fingerprint
/// input and produce false near-duplicate collisions.
pub fn raw_word_frequencies(html: &str) -> BTreeMap<String, u64> {
    let document = Html::parse_document(html);
    let text = full_visible_text(&document);
    let mut counts = BTreeMap::new();
    for word in split_words(&text) {
        *counts.entry(word).or_insert(0) += 1;
    }
    counts
}
