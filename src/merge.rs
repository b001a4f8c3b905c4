// Copyright 2025-present webdex contributors
// SPDX-License-Identifier: Apache-2.0

//! K-way merge of sorted run files into a single `merged.bin` (spec.md
//! §4.5).
//!
//! A min-heap seeded with the head of every run drives a standard external
//! merge: pop the smallest `(token, entry, stream)`, push the next record
//! from that same stream, and either start a new output entry or fold into
//! the still-open one if the token repeats. A bounded batch amortizes
//! writes; everything in the batch except the still-open trailing entry is
//! drained once the batch crosses the configured threshold.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::format::{RecordReader, RecordWriter};
use crate::types::TokenEntry;

struct HeapEntry {
    token: String,
    entry: TokenEntry,
    stream: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so `BinaryHeap` (a max-heap) pops the lexicographically smallest
// token first.
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.token.cmp(&self.token)
    }
}

/// Merge `run_paths` into a single token-ascending file at `merged_path`.
/// Deletes the input runs on success (spec.md §4.5 post-condition).
pub fn merge_runs(run_paths: &[PathBuf], merged_path: &Path, batch_threshold: usize) -> Result<()> {
    let mut readers: Vec<RecordReader> = run_paths
        .iter()
        .map(|p| Ok(RecordReader::new(std::io::BufReader::new(File::open(p)?))?))
        .collect::<Result<_>>()?;

    let mut heap = BinaryHeap::new();
    for (stream, reader) in readers.iter_mut().enumerate() {
        if let Some((token, entry)) = reader.next_record()? {
            heap.push(HeapEntry { token, entry, stream });
        }
    }

    let out_file = File::create(merged_path)?;
    let mut writer = RecordWriter::new(BufWriter::new(out_file));

    let mut batch: Vec<(String, TokenEntry)> = Vec::new();
    let mut batch_postings = 0usize;

    while let Some(item) = heap.pop() {
        if let Some((next_token, next_entry)) = readers[item.stream].next_record()? {
            heap.push(HeapEntry {
                token: next_token,
                entry: next_entry,
                stream: item.stream,
            });
        }

        match batch.last_mut() {
            Some((open_token, open_entry)) if *open_token == item.token => {
                batch_postings += item.entry.postings.len();
                open_entry.merge(item.entry);
            }
            _ => {
                batch_postings += item.entry.postings.len();
                batch.push((item.token, item.entry));
            }
        }

        if batch_postings > batch_threshold && batch.len() > 1 {
            let keep_open = batch.pop().expect("batch non-empty");
            for (token, entry) in batch.drain(..) {
                writer.write_record(&token, &entry)?;
            }
            batch_postings = keep_open.1.postings.len();
            batch.push(keep_open);
        }
    }

    for (token, entry) in batch.drain(..) {
        writer.write_record(&token, &entry)?;
    }
    writer.finish()?;

    drop(readers);
    for path in run_paths {
        std::fs::remove_file(path)?;
    }

    Ok(())
}
