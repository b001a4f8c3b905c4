// Copyright 2025-present webdex contributors
// SPDX-License-Identifier: Apache-2.0

//! The index lifecycle state machine (spec.md §4.10) and the `SearchIndex`
//! type that drives the whole build pipeline end to end.

use std::path::{Path, PathBuf};

use crate::builder::Builder;
use crate::config::{AppPaths, BuildConfig, SearchConfig};
use crate::error::{IndexError, Result};
use crate::merge::merge_runs;
use crate::normalize::TokenNormalizer;
use crate::partition::partition_merged;
use crate::pathmapper::PathMapper;
use crate::searcher::{self, SearchResult, SpellCorrector};
use crate::types::{DocId, PartitionRoute};
use crate::vectors::VectorStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Created,
    Building,
    FlushedRuns,
    Merged,
    Partitioned,
    Vectorized,
    Queryable,
    Destroyed,
}

/// Options recognized by `SearchIndex::build` (spec.md §6 Configuration
/// options).
pub struct BuildOptions {
    pub name: String,
    pub persist: bool,
    pub no_duplicate_detection: bool,
    pub build_config: BuildConfig,
    /// If a previously persisted index with this `name` exists, reuse it
    /// instead of rebuilding. A missing or incomplete directory falls back
    /// to a full rebuild rather than erroring.
    pub load_existing: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            name: "default".to_string(),
            persist: true,
            no_duplicate_detection: false,
            build_config: BuildConfig::default(),
            load_existing: false,
        }
    }
}

/// A built, queryable index. Owns the mapper, routing table, and document
/// vectors for the lifetime of the process; on drop, deletes its on-disk
/// directory unless `persist` was requested (spec.md §3 ownership rules,
/// §9 "object finalizer cleanup" re-architected as scoped `Drop`).
pub struct SearchIndex {
    state: IndexState,
    name: String,
    app_paths: AppPaths,
    mapper: PathMapper,
    routes: Vec<PartitionRoute>,
    vectors: VectorStore,
    persist: bool,
}

impl SearchIndex {
    /// Run the full build pipeline: PathMapper → Builder → Merger →
    /// Partitioner → Vector Store, in that order (spec.md §2).
    pub fn build(
        source_dir: &Path,
        app_paths: AppPaths,
        options: BuildOptions,
        normalizer: &dyn TokenNormalizer,
    ) -> Result<Self> {
        let mapper_path = app_paths
            .mappers_dir(&options.name)
            .join(format!("{}.json", crate::pathmapper::sanitize_root(source_dir)));
        let vectors_path = app_paths
            .vectors_dir(&options.name)
            .join(format!("{}.json", crate::pathmapper::sanitize_root(source_dir)));
        let routes_path = app_paths.routes_path(&options.name);
        let partitions_dir = app_paths.partitions_dir(&options.name);

        // `load_existing` (spec.md §6): reuse a prior build for this name
        // if its full persisted state is present. A missing or partial
        // directory is a ConfigError per spec.md §7 — logged as a warning,
        // falling back to a full rebuild rather than erroring.
        if options.load_existing
            && mapper_path.is_file()
            && vectors_path.is_file()
            && routes_path.is_file()
            && partitions_dir.is_dir()
        {
            match Self::load(app_paths.clone(), &options, &mapper_path, &vectors_path, &routes_path) {
                Ok(index) => return Ok(index),
                Err(err) => {
                    tracing::warn!(name = %options.name, error = %err, "load_existing failed, rebuilding");
                }
            }
        } else if options.load_existing {
            tracing::warn!(name = %options.name, "load_existing requested but no complete saved index found, rebuilding");
        }

        let mut state = IndexState::Created;
        app_paths.ensure_dirs(&options.name)?;
        let _lock = BuildLock::acquire(app_paths.lock_path(&options.name))?;

        let mapper = PathMapper::build(source_dir)?;
        mapper.save(&mapper_path)?;

        state = IndexState::Building;
        let mut builder = Builder::new(
            options.build_config.clone(),
            normalizer,
            app_paths.runs_dir(&options.name),
            !options.no_duplicate_detection,
        )?;
        for (doc_id, path) in mapper.paths() {
            builder.index_document(doc_id, path)?;
        }
        let (runs, stats) = builder.finish()?;
        state = IndexState::FlushedRuns;
        tracing::info!(
            documents_indexed = stats.documents_indexed,
            documents_skipped_duplicate = stats.documents_skipped_duplicate,
            runs_flushed = stats.runs_flushed,
            "ingest complete"
        );

        let merged_path = app_paths.merged_path(&options.name);
        merge_runs(&runs, &merged_path, options.build_config.max_postings_per_run)?;
        state = IndexState::Merged;

        let routes = partition_merged(
            &merged_path,
            &partitions_dir,
            options.build_config.partition_posting_size,
        )?;
        state = IndexState::Partitioned;
        tracing::info!(partitions = routes.len(), "partitioning complete");
        save_routes(&routes_path, &routes)?;

        let vectors = VectorStore::build(&mapper, normalizer)?;
        vectors.save(&vectors_path)?;
        state = IndexState::Vectorized;

        state = IndexState::Queryable;

        Ok(SearchIndex {
            state,
            name: options.name,
            app_paths,
            mapper,
            routes,
            vectors,
            persist: options.persist,
        })
    }

    /// Reconstruct a `Queryable` index from a previously persisted build
    /// (spec.md §6 `load_existing`). Called only once every required file
    /// has been confirmed present by the caller in `build`.
    fn load(
        app_paths: AppPaths,
        options: &BuildOptions,
        mapper_path: &Path,
        vectors_path: &Path,
        routes_path: &Path,
    ) -> Result<Self> {
        let mapper = PathMapper::load(mapper_path)?;
        let vectors = VectorStore::load(vectors_path)?;
        let routes = load_routes(routes_path)?;

        tracing::info!(name = %options.name, pages = mapper.len(), "loaded existing index");

        Ok(SearchIndex {
            state: IndexState::Queryable,
            name: options.name.clone(),
            app_paths,
            mapper,
            routes,
            vectors,
            persist: options.persist,
        })
    }

    pub fn state(&self) -> IndexState {
        self.state
    }

    pub fn page_count(&self) -> usize {
        self.mapper.len()
    }

    /// Query the index. Calling this before the index reaches `Queryable`
    /// is a programmer error (spec.md §4.10) — it panics rather than
    /// returning a `Result`, since no caller can legitimately construct a
    /// `SearchIndex` in any other state.
    pub fn search(
        &self,
        query: &str,
        normalizer: &dyn TokenNormalizer,
        spell: Option<&dyn SpellCorrector>,
        config: &SearchConfig,
    ) -> Result<(Vec<SearchResult>, String)> {
        assert_eq!(
            self.state,
            IndexState::Queryable,
            "search() called before the index reached QUERYABLE"
        );

        searcher::search(
            query,
            &self.app_paths.partitions_dir(&self.name),
            &self.routes,
            &self.mapper,
            &self.vectors,
            self.mapper.len() as u64,
            normalizer,
            spell,
            config,
        )
    }

    /// Used by the external summary layer (spec.md §6 Search API).
    pub fn get_path_by_id(&self, id: DocId) -> Option<&Path> {
        self.mapper.get_path_by_id(id)
    }
}

/// Exclusive-create marker file held for the duration of one build, so a
/// second concurrent build of the same named index fails fast with a
/// `Config` error instead of corrupting the first build's run files.
/// Released on drop, including on an early `?` return.
struct BuildLock {
    path: PathBuf,
}

impl BuildLock {
    fn acquire(path: PathBuf) -> Result<Self> {
        match std::fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(BuildLock { path }),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(IndexError::Config {
                    message: format!(
                        "a build is already in progress for this index (lock file present at {})",
                        path.display()
                    ),
                })
            }
            Err(err) => Err(IndexError::Storage(err)),
        }
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to release build lock");
            }
        }
    }
}

fn save_routes(path: &Path, routes: &[PartitionRoute]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    serde_json::to_writer(file, routes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    Ok(())
}

fn load_routes(path: &Path) -> Result<Vec<PartitionRoute>> {
    let file = std::fs::File::open(path)?;
    let routes = serde_json::from_reader(file)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(routes)
}

impl Drop for SearchIndex {
    fn drop(&mut self) {
        if self.persist || self.state == IndexState::Destroyed {
            return;
        }
        let dir = self.app_paths.index_dir(&self.name);
        if let Err(err) = std::fs::remove_dir_all(&dir) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %dir.display(), error = %err, "failed to clean up index directory");
            }
        }
        self.state = IndexState::Destroyed;
    }
}
