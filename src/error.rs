// Copyright 2025-present webdex contributors
// SPDX-License-Identifier: Apache-2.0

//! The error taxonomy shared by every stage of the index lifecycle.
//!
//! Document-level problems (malformed corpus JSON, unparsable HTML) are
//! recoverable: the offending document is skipped and the build continues.
//! Everything else here is fatal to the operation in progress.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("malformed corpus document at {path}: {source}")]
    CorpusFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no extractable text in document at {path}")]
    HtmlParse { path: PathBuf },

    #[error(
        "tag frequency accounting for token {token:?} in {path} went negative by {other} \
         (sum of tagged occurrences exceeded total occurrences)"
    )]
    DataIntegrity {
        path: PathBuf,
        token: String,
        other: i64,
    },

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("query error: {message}")]
    Query { message: String },
}

pub type Result<T> = std::result::Result<T, IndexError>;
