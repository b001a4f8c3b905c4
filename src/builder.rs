// Copyright 2025-present webdex contributors
// SPDX-License-Identifier: Apache-2.0

//! The streaming inverted-index builder (spec.md §4.4).
//!
//! Stages one document at a time through the near-duplicate filter and
//! tokenizer, accumulates postings in a token-sorted in-memory buffer, and
//! flushes that buffer to a sorted run file whenever either the posting
//! count or the available-memory threshold is crossed. Staging shape
//! (load → process → flush, explicit stage boundaries) is generalized from
//! the teacher's `build::run_build` pipeline.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use sysinfo::System;

use crate::config::BuildConfig;
use crate::error::{IndexError, Result};
use crate::format::RecordWriter;
use crate::normalize::TokenNormalizer;
use crate::pathmapper::CorpusDocument;
use crate::simhash::{self, SimHashSet};
use crate::tokenizer::tokenize_document;
use crate::types::{DocId, Posting, Token, TokenEntry};

#[derive(Debug, Default, Clone, Copy)]
pub struct BuildStats {
    pub documents_indexed: usize,
    pub documents_skipped_duplicate: usize,
    pub documents_skipped_corpus_error: usize,
    pub documents_indexed_empty: usize,
    pub runs_flushed: usize,
}

pub struct Builder<'a> {
    config: BuildConfig,
    normalizer: &'a dyn TokenNormalizer,
    dup_filter: Option<SimHashSet>,
    buffer: BTreeMap<Token, TokenEntry>,
    posting_count: usize,
    run_paths: Vec<PathBuf>,
    runs_dir: PathBuf,
    next_run: usize,
    system: System,
    stats: BuildStats,
}

impl<'a> Builder<'a> {
    pub fn new(
        config: BuildConfig,
        normalizer: &'a dyn TokenNormalizer,
        runs_dir: PathBuf,
        duplicate_detection: bool,
    ) -> Result<Self> {
        std::fs::create_dir_all(&runs_dir)?;
        Ok(Builder {
            dup_filter: duplicate_detection
                .then(|| SimHashSet::new(config.duplicate_similarity_threshold)),
            config,
            normalizer,
            buffer: BTreeMap::new(),
            posting_count: 0,
            run_paths: Vec::new(),
            runs_dir,
            next_run: 0,
            system: System::new(),
            stats: BuildStats::default(),
        })
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Index one document (spec.md §4.4 per-document procedure). Corpus
    /// JSON errors and empty-text HTML parse failures are recoverable: the
    /// document is skipped or indexed empty, and the build continues.
    /// `DataIntegrityError` is fatal and propagates to abort the build.
    pub fn index_document(&mut self, doc_id: DocId, path: &Path) -> Result<()> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not read corpus document");
                self.stats.documents_skipped_corpus_error += 1;
                return Ok(());
            }
        };

        let doc: CorpusDocument = match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(source) => {
                let err = IndexError::CorpusFormat {
                    path: path.to_path_buf(),
                    source,
                };
                tracing::warn!(%err, "malformed corpus document, skipping");
                self.stats.documents_skipped_corpus_error += 1;
                return Ok(());
            }
        };

        let per_tag = match tokenize_document(&doc.content, self.normalizer, path) {
            Ok(map) => map,
            Err(IndexError::HtmlParse { .. }) => {
                self.stats.documents_indexed_empty += 1;
                BTreeMap::new()
            }
            Err(other) => return Err(other),
        };

        if let Some(filter) = &mut self.dup_filter {
            // Fingerprinted from an independent raw tokenize pass, not from
            // `per_tag` (spec.md §4.2: SimHash tokenizes the plain text,
            // a distinct operation from §4.1's normalized extraction) so a
            // stemming normalizer can't collapse distinct words into one
            // fingerprint input.
            let plain = crate::tokenizer::raw_word_frequencies(&doc.content);
            let fp = simhash::fingerprint(&plain);
            if filter.is_duplicate(&fp) {
                self.stats.documents_skipped_duplicate += 1;
                return Ok(());
            }
            filter.insert(fp);
        }

        for (token, tag_freqs) in per_tag {
            self.buffer
                .entry(token)
                .or_default()
                .push(Posting::new(doc_id, tag_freqs));
            self.posting_count += 1;
        }
        self.stats.documents_indexed += 1;

        if self.should_flush() {
            self.flush()?;
        }
        Ok(())
    }

    fn should_flush(&mut self) -> bool {
        if self.posting_count >= self.config.max_postings_per_run {
            return true;
        }
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return false;
        }
        let available_percent = (self.system.available_memory() as f64 / total as f64) * 100.0;
        (available_percent as f32) < self.config.min_avail_memory_percent
    }

    /// Write the current buffer to a new sorted run file and clear it.
    /// `BTreeMap` iteration is already token-ascending, satisfying the
    /// "flush sorts by token on write" invariant for free.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let run_path = self.runs_dir.join(format!("partition_{}.bin", self.next_run));
        self.next_run += 1;

        let file = File::create(&run_path)?;
        let mut writer = RecordWriter::new(BufWriter::new(file));
        for (token, entry) in &self.buffer {
            writer.write_record(token, entry)?;
        }
        writer.finish()?;

        self.run_paths.push(run_path);
        self.stats.runs_flushed += 1;
        self.buffer.clear();
        self.posting_count = 0;
        Ok(())
    }

    /// Flush any residual buffer and return the complete list of run
    /// files produced.
    pub fn finish(mut self) -> Result<(Vec<PathBuf>, BuildStats)> {
        self.flush()?;
        Ok((self.run_paths, self.stats))
    }
}
