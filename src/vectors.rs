// Copyright 2025-present webdex contributors
// SPDX-License-Identifier: Apache-2.0

//! The document vector store used by the cosine re-ranker (spec.md §4.8).
//!
//! Built once, after partitioning, by re-reading every document via the
//! `PathMapper` and tokenizing its plain visible text with no tag
//! weighting. Persisted as a single JSON file keyed by the sanitized
//! corpus root (spec.md §6).

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::normalize::TokenNormalizer;
use crate::pathmapper::{CorpusDocument, PathMapper};
use crate::tokenizer::tokenize_document;
use crate::types::{DocId, DocumentVector};

#[derive(Debug, Default, Serialize, Deserialize)]
struct VectorStoreData {
    vectors: Vec<(DocId, DocumentVector)>,
}

#[derive(Debug, Default)]
pub struct VectorStore {
    vectors: HashMap<DocId, DocumentVector>,
}

impl VectorStore {
    /// Materialize a vector for every document the mapper knows about.
    /// Documents whose corpus JSON is unreadable are skipped (they were
    /// already logged during the build); documents with no extractable
    /// text get an empty (all-zero) vector.
    pub fn build(mapper: &PathMapper, normalizer: &dyn TokenNormalizer) -> Result<Self> {
        let mut vectors = HashMap::with_capacity(mapper.len());

        for (doc_id, path) in mapper.paths() {
            let Ok(raw) = std::fs::read_to_string(path) else {
                continue;
            };
            let Ok(doc) = serde_json::from_str::<CorpusDocument>(&raw) else {
                continue;
            };

            let vector = match tokenize_document(&doc.content, normalizer, path) {
                Ok(per_tag) => {
                    let mut frequencies = BTreeMap::new();
                    for (token, freqs) in per_tag {
                        frequencies.insert(token, freqs.total());
                    }
                    DocumentVector { frequencies }
                }
                Err(IndexError::HtmlParse { .. }) => DocumentVector::default(),
                Err(other) => return Err(other),
            };

            vectors.insert(doc_id, vector);
        }

        Ok(VectorStore { vectors })
    }

    pub fn get(&self, id: DocId) -> Option<&DocumentVector> {
        self.vectors.get(&id)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = VectorStoreData {
            vectors: self.vectors.iter().map(|(k, v)| (*k, v.clone())).collect(),
        };
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(file, &data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let data: VectorStoreData = serde_json::from_reader(file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(VectorStore {
            vectors: data.vectors.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::IdentityNormalizer;
    use tempfile::tempdir;

    #[test]
    fn builds_one_vector_per_document_and_round_trips() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"url":"https://example.com/a","content":"<p>alderis alderis zhu</p>","encoding":"utf-8"}"#,
        )
        .unwrap();

        let mapper = PathMapper::build(dir.path()).unwrap();
        let normalizer = IdentityNormalizer;
        let store = VectorStore::build(&mapper, &normalizer).unwrap();
        assert_eq!(store.len(), 1);

        let id = mapper.get_id(&dir.path().join("a.json")).unwrap();
        let vector = store.get(id).unwrap();
        assert_eq!(vector.frequencies.get("alderis"), Some(&2));
        assert_eq!(vector.frequencies.get("zhu"), Some(&1));

        let saved = dir.path().join("vectors.json");
        store.save(&saved).unwrap();
        let loaded = VectorStore::load(&saved).unwrap();
        assert_eq!(loaded.get(id).unwrap().frequencies, vector.frequencies);
    }
}
