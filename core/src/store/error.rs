//! Error types for the document store

use std::path::PathBuf;
use thiserror::Error;

use crate::engine::EngineError;

/// Errors while loading documents from disk
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document directory {path} does not exist")]
    MissingDirectory { path: PathBuf },

    #[error("failed to read directory {path}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid document in {path}")]
    InvalidDocument {
        path: PathBuf,
        #[source]
        source: EngineError,
    },

    #[error("duplicate document id '{id}'")]
    DuplicateId { id: String },
}
