// Copyright 2025-present webdex contributors
// SPDX-License-Identifier: Apache-2.0

//! Splits `merged.bin` into lexicographic partition files and builds the
//! routing-key table used for point lookups (spec.md §4.6).
//!
//! Binary search over routing keys follows the teacher's `types.rs`
//! "last boundary whose start ≤ offset" idiom (`partition_point`),
//! generalized here to "last partition whose minimum token ≤ target".

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::format::{RecordReader, RecordWriter};
use crate::types::{PartitionRoute, TokenEntry};

/// Stream `merged_path` into partition files under `partitions_dir`, each
/// holding at least `target_postings` postings (entries for a single token
/// are never split). Deletes `merged_path` on success and returns the
/// sorted routing-key table.
pub fn partition_merged(
    merged_path: &Path,
    partitions_dir: &Path,
    target_postings: usize,
) -> Result<Vec<PartitionRoute>> {
    std::fs::create_dir_all(partitions_dir)?;
    let mut reader = RecordReader::new(std::io::BufReader::new(File::open(merged_path)?))?;

    let mut routes = Vec::new();
    let mut buffer: Vec<(String, TokenEntry)> = Vec::new();
    let mut posting_count = 0usize;

    while let Some((token, entry)) = reader.next_record()? {
        posting_count += entry.postings.len();
        buffer.push((token, entry));
        if posting_count >= target_postings {
            routes.push(flush_partition(&mut buffer, partitions_dir)?);
            posting_count = 0;
        }
    }
    if !buffer.is_empty() {
        routes.push(flush_partition(&mut buffer, partitions_dir)?);
    }

    drop(reader);
    std::fs::remove_file(merged_path)?;

    Ok(routes)
}

fn flush_partition(buffer: &mut Vec<(String, TokenEntry)>, dir: &Path) -> Result<PartitionRoute> {
    let min_token = buffer[0].0.clone();
    let file_name = format!("partition_{min_token}.bin");
    let path = dir.join(&file_name);

    let file = File::create(&path)?;
    let mut writer = RecordWriter::new(BufWriter::new(file));
    for (token, entry) in buffer.drain(..) {
        writer.write_record(&token, &entry)?;
    }
    writer.finish()?;

    Ok(PartitionRoute { min_token, file_name })
}

/// Locate the partition that contains `target`: the last routing entry
/// whose `min_token` is ≤ `target`, or the first partition if `target` is
/// less than every routing key.
pub fn find_partition<'a>(routes: &'a [PartitionRoute], target: &str) -> Option<&'a PartitionRoute> {
    if routes.is_empty() {
        return None;
    }
    let idx = routes.partition_point(|r| r.min_token.as_str() <= target);
    Some(if idx == 0 { &routes[0] } else { &routes[idx - 1] })
}

/// Resolve a partition's path under `partitions_dir` and scan it for
/// `target`. A missing token yields an empty `TokenEntry` (`df=0`), not an
/// error (spec.md §4.9).
pub fn lookup_token(
    partitions_dir: &Path,
    routes: &[PartitionRoute],
    target: &str,
) -> Result<TokenEntry> {
    let Some(route) = find_partition(routes, target) else {
        return Ok(TokenEntry::new());
    };
    let path = partitions_dir.join(&route.file_name);
    let mut reader = RecordReader::new(std::io::BufReader::new(File::open(path)?))?;
    while let Some((token, entry)) = reader.next_record()? {
        if token == target {
            return Ok(entry);
        }
    }
    Ok(TokenEntry::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::RecordWriter as Writer;
    use crate::types::{DocId, Posting, TagFrequencies};
    use tempfile::tempdir;

    fn entry_for(doc_id: u32) -> TokenEntry {
        let mut entry = TokenEntry::new();
        entry.push(Posting::new(
            DocId::new(doc_id),
            TagFrequencies {
                other: 1,
                ..Default::default()
            },
        ));
        entry
    }

    fn write_merged(path: &Path, tokens: &[&str]) {
        let file = File::create(path).unwrap();
        let mut writer = Writer::new(BufWriter::new(file));
        for (i, token) in tokens.iter().enumerate() {
            writer.write_record(token, &entry_for(i as u32 + 1)).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn partitions_never_split_a_single_token_and_routing_resolves_every_token() {
        let dir = tempdir().unwrap();
        let merged = dir.path().join("merged.bin");
        let tokens = ["alderis", "apple", "banana", "cherry", "master", "zhu"];
        write_merged(&merged, &tokens);

        let partitions_dir = dir.path().join("partitions");
        let routes = partition_merged(&merged, &partitions_dir, 2).unwrap();

        assert!(!merged.exists());
        assert!(routes.len() >= 2);

        let mut sorted_mins: Vec<_> = routes.iter().map(|r| r.min_token.clone()).collect();
        let mut check = sorted_mins.clone();
        check.sort();
        assert_eq!(sorted_mins, check, "routing keys must be strictly ascending");
        sorted_mins.dedup();
        assert_eq!(sorted_mins.len(), routes.len());

        for token in tokens {
            let entry = lookup_token(&partitions_dir, &routes, token).unwrap();
            assert_eq!(entry.df, 1, "token {token} should resolve via routing");
        }
    }

    #[test]
    fn missing_token_yields_empty_entry_not_error() {
        let dir = tempdir().unwrap();
        let merged = dir.path().join("merged.bin");
        write_merged(&merged, &["alderis", "zhu"]);
        let partitions_dir = dir.path().join("partitions");
        let routes = partition_merged(&merged, &partitions_dir, 100).unwrap();

        let entry = lookup_token(&partitions_dir, &routes, "nonexistent").unwrap();
        assert_eq!(entry.df, 0);
        assert!(entry.postings.is_empty());
    }

    #[test]
    fn target_below_all_keys_falls_back_to_first_partition() {
        let dir = tempdir().unwrap();
        let merged = dir.path().join("merged.bin");
        write_merged(&merged, &["mango", "zhu"]);
        let partitions_dir = dir.path().join("partitions");
        let routes = partition_merged(&merged, &partitions_dir, 1).unwrap();

        let route = find_partition(&routes, "aardvark").unwrap();
        assert_eq!(route.min_token, routes[0].min_token);
    }
}
