// Copyright 2025-present webdex contributors
// SPDX-License-Identifier: Apache-2.0

//! Application paths and tunables.
//!
//! Replaces the free-function, module-global style of the original
//! implementation (a single process-wide `_INDEXES_DIR` constant, wiped on
//! import) with an explicit value constructed once by the caller and
//! threaded through every component that touches disk.

use std::path::{Path, PathBuf};

use crate::error::{IndexError, Result};

/// Resolves every on-disk location a build or search session needs.
///
/// Defaults to the OS application-data directory (via `dirs::data_dir`),
/// the Rust analogue of Python's `platformdirs`, under a `webdex` namespace.
#[derive(Debug, Clone)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    /// Use the platform's standard application-data directory.
    pub fn discover() -> Result<Self> {
        let base = dirs::data_dir().ok_or_else(|| IndexError::Config {
            message: "could not determine platform application data directory".into(),
        })?;
        Ok(Self {
            root: base.join("webdex"),
        })
    }

    /// Pin every path under an explicit root. Used by tests and by callers
    /// that want a disposable index location.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Per-index working directory, keyed by a caller-chosen name (usually
    /// derived from the corpus root path).
    pub fn index_dir(&self, name: &str) -> PathBuf {
        self.root.join("indexes").join(name)
    }

    pub fn mappers_dir(&self, name: &str) -> PathBuf {
        self.index_dir(name).join("mappers")
    }

    pub fn runs_dir(&self, name: &str) -> PathBuf {
        self.index_dir(name).join("runs")
    }

    pub fn partitions_dir(&self, name: &str) -> PathBuf {
        self.index_dir(name).join("partitions")
    }

    pub fn vectors_dir(&self, name: &str) -> PathBuf {
        self.index_dir(name).join("vectors")
    }

    pub fn merged_path(&self, name: &str) -> PathBuf {
        self.index_dir(name).join("merged.bin")
    }

    pub fn routes_path(&self, name: &str) -> PathBuf {
        self.index_dir(name).join("routes.json")
    }

    /// Advisory marker file guarding against two concurrent builds of the
    /// same named index (spec.md §5 "filesystem is the only shared
    /// resource").
    pub fn lock_path(&self, name: &str) -> PathBuf {
        self.index_dir(name).join(".build.lock")
    }

    pub fn ensure_dirs(&self, name: &str) -> Result<()> {
        for dir in [
            self.mappers_dir(name),
            self.runs_dir(name),
            self.partitions_dir(name),
            self.vectors_dir(name),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

/// Tunables for the build pipeline (spec.md §4.4, §5).
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Flush a sorted run to disk once the in-memory posting count reaches
    /// this threshold.
    pub max_postings_per_run: usize,

    /// Flush early if available system memory drops below this percentage,
    /// regardless of posting count. Mirrors the original's
    /// `psutil.virtual_memory()` backpressure check.
    pub min_avail_memory_percent: f32,

    /// Target postings per final partition file (spec.md §4.4
    /// `partition_posting_size`).
    pub partition_posting_size: usize,

    /// SimHash similarity threshold at or above which a document is treated
    /// as a near-duplicate of one already seen and is dropped from the
    /// build.
    pub duplicate_similarity_threshold: f64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            max_postings_per_run: 50_000,
            min_avail_memory_percent: 50.0,
            partition_posting_size: 5_000,
            duplicate_similarity_threshold: 0.95,
        }
    }
}

/// Tunables for query-time ranking (spec.md §4.9).
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Candidates carried from the primary TF-IDF rank into the cosine
    /// re-rank stage (spec.md §4.9 step 4: "take the top 50").
    pub primary_rank_limit: usize,

    /// Final result count returned to the caller after re-ranking.
    pub result_limit: usize,

    /// Enable query spell-correction (`use_spellcheck`, spec.md §6).
    pub use_spellcheck: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            primary_rank_limit: 50,
            result_limit: 20,
            use_spellcheck: false,
        }
    }
}
