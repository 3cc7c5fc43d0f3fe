//! File-backed document store
//!
//! Loads claim and release documents from a directory of JSON files and
//! answers the queries a map frontend makes: a snapshot for an instant,
//! full documents for a clicked cell, and the instants worth scrubbing to.
//!
//! Each `*.json` file holds either one document or an array of them.
//! Subdirectories are walked recursively, in sorted order, so the load order
//! (and therefore `cell_documents` ordering) is stable across platforms.

mod error;

pub use error::StoreError;

use std::fs;
use std::path::{Path, PathBuf};

use cellmap_types::{CellXY, Document, EngineConfig, MapSnapshot};
use hashbrown::HashMap;
use time::OffsetDateTime;

use crate::engine::{EngineError, generate_map_snapshot, parse_documents};

#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: Vec<Document>,
    by_id: HashMap<String, usize>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-parsed documents. Ids must be unique.
    pub fn from_documents(documents: Vec<Document>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for doc in documents {
            store.insert(doc)?;
        }
        Ok(store)
    }

    /// Load every JSON document under `dir`
    pub fn load_dir(dir: &Path) -> Result<Self, StoreError> {
        if !dir.is_dir() {
            return Err(StoreError::MissingDirectory {
                path: dir.to_path_buf(),
            });
        }

        let mut files = Vec::new();
        collect_json_files(dir, &mut files)?;
        files.sort();

        let mut store = Self::new();
        for path in &files {
            let content = fs::read_to_string(path).map_err(|source| StoreError::ReadFile {
                path: path.clone(),
                source,
            })?;
            let documents =
                parse_documents(&content).map_err(|source| StoreError::InvalidDocument {
                    path: path.clone(),
                    source,
                })?;
            for doc in documents {
                store.insert(doc)?;
            }
        }

        tracing::info!(
            dir = %dir.display(),
            files = files.len(),
            documents = store.len(),
            "Document store loaded"
        );
        Ok(store)
    }

    fn insert(&mut self, doc: Document) -> Result<(), StoreError> {
        if self.by_id.contains_key(doc.id()) {
            return Err(StoreError::DuplicateId {
                id: doc.id().to_string(),
            });
        }
        self.by_id.insert(doc.id().to_string(), self.documents.len());
        self.documents.push(doc);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn all_documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.by_id.get(id).map(|&idx| &self.documents[idx])
    }

    /// Fetch documents by id, in request order. Unknown ids are skipped.
    pub fn documents<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&Document> {
        ids.iter().filter_map(|id| self.get(id.as_ref())).collect()
    }

    /// Every stored document touching `cell`, regardless of when it was created
    pub fn cell_documents(&self, cell: CellXY) -> Vec<&Document> {
        self.documents
            .iter()
            .filter(|doc| doc.cells().contains(&cell))
            .collect()
    }

    pub fn snapshot(
        &self,
        at: OffsetDateTime,
        config: &EngineConfig,
    ) -> Result<MapSnapshot, EngineError> {
        generate_map_snapshot(&self.documents, at, config)
    }

    /// Sorted, de-duplicated instants at which a snapshot can change
    pub fn timeline(&self) -> Vec<OffsetDateTime> {
        let mut times: Vec<OffsetDateTime> = Vec::new();
        for doc in &self.documents {
            times.push(doc.created_at());
            match doc {
                Document::Claim(claim) => {
                    times.extend(claim.updates.iter().map(|update| update.change_date));
                }
                Document::Release(release) => {
                    times.push(release.start_date);
                    times.extend(release.release_date);
                }
            }
        }
        times.sort_unstable();
        times.dedup();
        times
    }
}

fn collect_json_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), StoreError> {
    let entries = fs::read_dir(dir).map_err(|source| StoreError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| StoreError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|source| StoreError::ReadDir {
            path: path.clone(),
            source,
        })?;

        if file_type.is_dir() {
            collect_json_files(&path, files)?;
        } else if file_type.is_symlink() && path.is_dir() {
            // Symlinked directories may point back up the tree
            tracing::debug!(path = %path.display(), "Skipping symlinked directory");
        } else if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        } else {
            tracing::debug!(path = %path.display(), "Skipping non-JSON file");
        }
    }

    Ok(())
}
