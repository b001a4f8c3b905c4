// Copyright 2025-present webdex contributors
// SPDX-License-Identifier: Apache-2.0

//! webdex CLI: build and query a disk-resident inverted index over a
//! crawled HTML corpus.
//!
//! ```bash
//! # Build an index from a directory of corpus JSON documents
//! webdex build ./docs
//!
//! # Search a previously built index
//! webdex search ./docs "query text"
//! ```

use tracing_subscriber::EnvFilter;
use webdex::cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = cli::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
