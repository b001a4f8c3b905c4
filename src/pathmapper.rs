// Copyright 2025-present webdex contributors
// SPDX-License-Identifier: Apache-2.0

//! Stable DocID assignment over a corpus directory tree (spec.md §4.3).
//!
//! The original carried path→id and url→id as two separately-walked
//! classes (`PathMapper` and `URLMapper`); later revisions folded them
//! together (see the commented-out merge in `index/path_mapper.py`). This
//! port does that unification from the start: one directory walk builds
//! both bimaps.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::DocId;

/// One corpus document as read from disk: `{url, content, encoding}`
/// (spec.md §3 Document).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub url: String,
    pub content: String,
    pub encoding: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PathMapperData {
    next_id: u32,
    path_to_id: HashMap<PathBuf, DocId>,
    id_to_path: HashMap<DocId, PathBuf>,
    url_to_id: HashMap<String, DocId>,
    id_to_url: HashMap<DocId, String>,
}

/// id↔path and url↔id bimaps, built by walking the corpus root once.
#[derive(Debug)]
pub struct PathMapper {
    data: PathMapperData,
}

impl PathMapper {
    /// Walk `root` recursively, assigning DocIDs 1, 2, … in discovery order
    /// to every `*.json` file. Malformed JSON is logged and skipped for URL
    /// extraction but still receives a DocID (spec.md §4.3).
    pub fn build(root: &Path) -> std::io::Result<Self> {
        let mut data = PathMapperData {
            next_id: 1,
            ..Default::default()
        };

        let mut entries = Vec::new();
        collect_json_files(root, &mut entries)?;
        entries.sort();

        for path in entries {
            let id = DocId::new(data.next_id);
            data.next_id += 1;
            data.path_to_id.insert(path.clone(), id);
            data.id_to_path.insert(id, path.clone());

            let raw = match std::fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "could not read corpus document for URL extraction");
                    continue;
                }
            };

            match serde_json::from_str::<CorpusDocument>(&raw) {
                Ok(doc) => {
                    // First occurrence wins: subsequent documents claiming
                    // a URL already seen do not overwrite the mapping.
                    data.url_to_id.entry(doc.url.clone()).or_insert(id);
                    data.id_to_url.entry(id).or_insert(doc.url);
                }
                Err(source) => {
                    let err = crate::error::IndexError::CorpusFormat {
                        path: path.clone(),
                        source,
                    };
                    tracing::warn!(%err, "skipping malformed corpus document for URL extraction");
                }
            }
        }

        Ok(PathMapper { data })
    }

    pub fn get_id(&self, path: &Path) -> Option<DocId> {
        self.data.path_to_id.get(path).copied()
    }

    pub fn get_id_by_url(&self, url: &str) -> Option<DocId> {
        self.data.url_to_id.get(url).copied()
    }

    pub fn get_url_by_id(&self, id: DocId) -> Option<&str> {
        self.data.id_to_url.get(&id).map(String::as_str)
    }

    pub fn get_path_by_id(&self, id: DocId) -> Option<&Path> {
        self.data.id_to_path.get(&id).map(PathBuf::as_path)
    }

    /// All paths in discovery (DocID) order.
    pub fn paths(&self) -> impl Iterator<Item = (DocId, &Path)> {
        let mut ids: Vec<_> = self.data.id_to_path.keys().copied().collect();
        ids.sort();
        ids.into_iter()
            .map(move |id| (id, self.data.id_to_path[&id].as_path()))
    }

    pub fn len(&self) -> usize {
        self.data.id_to_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.id_to_path.is_empty()
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(file, &self.data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let data: PathMapperData = serde_json::from_reader(file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(PathMapper { data })
    }
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("json") {
            out.push(path);
        }
    }
    Ok(())
}

/// Derive a filesystem-safe slug for a corpus root, used to key persisted
/// mapper/vector files (spec.md §6).
pub fn sanitize_root(root: &Path) -> String {
    root.to_string_lossy()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_doc(dir: &Path, name: &str, url: &str) {
        let path = dir.join(name);
        fs::write(
            &path,
            format!(
                r#"{{"url":"{url}","content":"<p>hi</p>","encoding":"utf-8"}}"#
            ),
        )
        .unwrap();
    }

    #[test]
    fn assigns_sequential_ids_and_maps_urls() {
        let dir = tempdir().unwrap();
        write_doc(dir.path(), "a.json", "https://example.com/a");
        write_doc(dir.path(), "b.json", "https://example.com/b");

        let mapper = PathMapper::build(dir.path()).unwrap();
        assert_eq!(mapper.len(), 2);

        let id_a = mapper.get_id(&dir.path().join("a.json")).unwrap();
        assert_eq!(
            mapper.get_url_by_id(id_a).unwrap(),
            "https://example.com/a"
        );
        assert_eq!(
            mapper.get_id_by_url("https://example.com/a").unwrap(),
            id_a
        );
    }

    #[test]
    fn first_url_occurrence_wins() {
        let dir = tempdir().unwrap();
        write_doc(dir.path(), "a.json", "https://example.com/dup");
        write_doc(dir.path(), "b.json", "https://example.com/dup");

        let mapper = PathMapper::build(dir.path()).unwrap();
        let id_a = mapper.get_id(&dir.path().join("a.json")).unwrap();
        assert_eq!(
            mapper.get_id_by_url("https://example.com/dup").unwrap(),
            id_a
        );
    }

    #[test]
    fn malformed_json_still_gets_a_path_id() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "not json").unwrap();

        let mapper = PathMapper::build(dir.path()).unwrap();
        assert_eq!(mapper.len(), 1);
        let id = mapper.get_id(&dir.path().join("broken.json")).unwrap();
        assert!(mapper.get_url_by_id(id).is_none());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        write_doc(dir.path(), "a.json", "https://example.com/a");
        let mapper = PathMapper::build(dir.path()).unwrap();

        let saved = dir.path().join("mapper.json");
        mapper.save(&saved).unwrap();
        let loaded = PathMapper::load(&saved).unwrap();

        assert_eq!(loaded.len(), mapper.len());
        let id = mapper.get_id(&dir.path().join("a.json")).unwrap();
        assert_eq!(loaded.get_url_by_id(id), mapper.get_url_by_id(id));
    }
}
