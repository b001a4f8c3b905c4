// Copyright 2025-present webdex contributors
// SPDX-License-Identifier: Apache-2.0

//! Command-line surface: build an index from a corpus directory, query one,
//! or inspect its summary statistics (spec.md §6).

pub mod display;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{AppPaths, BuildConfig, SearchConfig};
use crate::error::Result;
use crate::index::{BuildOptions, SearchIndex};
use crate::normalize::{IdentityNormalizer, StemNormalizer, TokenNormalizer};
use crate::searcher::NoopSpellCorrector;

#[derive(Parser, Debug)]
#[command(name = "webdex", version, about = "Disk-resident inverted-index search over a crawled HTML corpus")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build an index from a directory of corpus JSON documents.
    Build {
        /// Directory containing `{url, content, encoding}` JSON documents.
        source: PathBuf,

        /// Name this index is stored under. Defaults to a sanitized form
        /// of `source`.
        #[arg(long)]
        name: Option<String>,

        /// Keep the index on disk after the process exits. Defaults to
        /// persisting; pass `--no-persist` for a throwaway build.
        #[arg(long, default_value_t = true)]
        persist: bool,

        /// Disable SimHash near-duplicate filtering during ingest.
        #[arg(long)]
        no_duplicate_detection: bool,

        /// Reuse a previously built index with this name instead of
        /// rebuilding from scratch.
        #[arg(long)]
        load_existing: bool,

        /// Skip stemming; index and query against raw lowercase tokens.
        #[arg(long)]
        no_stemming: bool,

        #[arg(long, default_value_t = BuildConfig::default().max_postings_per_run)]
        max_postings_per_run: usize,

        #[arg(long, default_value_t = BuildConfig::default().min_avail_memory_percent)]
        min_avail_memory_percent: f32,

        #[arg(long, default_value_t = BuildConfig::default().partition_posting_size)]
        partition_posting_size: usize,
    },

    /// Run a query against a previously built index.
    Search {
        /// Directory the index was built from (used to resolve the stored
        /// name).
        source: PathBuf,

        /// Query text.
        query: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value_t = SearchConfig::default().result_limit)]
        limit: usize,

        #[arg(long)]
        no_stemming: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let app_paths = AppPaths::discover()?;

    match cli.command {
        Command::Build {
            source,
            name,
            persist,
            no_duplicate_detection,
            load_existing,
            no_stemming,
            max_postings_per_run,
            min_avail_memory_percent,
            partition_posting_size,
        } => {
            let name = name.unwrap_or_else(|| crate::pathmapper::sanitize_root(&source));
            let normalizer: Box<dyn TokenNormalizer> = pick_normalizer(no_stemming);

            let options = BuildOptions {
                name: name.clone(),
                persist,
                no_duplicate_detection,
                load_existing,
                build_config: BuildConfig {
                    max_postings_per_run,
                    min_avail_memory_percent,
                    partition_posting_size,
                    ..BuildConfig::default()
                },
            };

            display::building(&source, &name);
            let index = SearchIndex::build(&source, app_paths, options, normalizer.as_ref())?;
            display::build_summary(index.page_count());
        }
        Command::Search {
            source,
            query,
            name,
            limit,
            no_stemming,
        } => {
            let name = name.unwrap_or_else(|| crate::pathmapper::sanitize_root(&source));
            let normalizer: Box<dyn TokenNormalizer> = pick_normalizer(no_stemming);
            let spell = NoopSpellCorrector;

            let index = SearchIndex::build(
                &source,
                app_paths,
                BuildOptions {
                    name,
                    persist: true,
                    no_duplicate_detection: false,
                    load_existing: true,
                    build_config: BuildConfig::default(),
                },
                normalizer.as_ref(),
            )?;

            let config = SearchConfig {
                result_limit: limit,
                ..SearchConfig::default()
            };
            let (results, timing) = index.search(&query, normalizer.as_ref(), Some(&spell), &config)?;
            display::results(&results, &timing);
        }
    }

    Ok(())
}

fn pick_normalizer(no_stemming: bool) -> Box<dyn TokenNormalizer> {
    if no_stemming {
        Box::new(IdentityNormalizer)
    } else {
        Box::new(StemNormalizer::english())
    }
}
