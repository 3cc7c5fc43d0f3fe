//! Error types for snapshot generation

use thiserror::Error;

/// Data-integrity failures. Any of these aborts the whole snapshot, since a
/// partial map would misrepresent progress.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("claim {claim_id} has no updates; a claim must have at least one")]
    ClaimWithoutUpdates { claim_id: String },

    #[error("document {id} has unexpected type '{kind}'")]
    UnknownDocumentType { id: String, kind: String },

    #[error("document {id} has no type tag")]
    MissingDocumentType { id: String },

    #[error("invalid {kind} document {id}")]
    InvalidDocument {
        id: String,
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected a document object or an array of documents, found {found}")]
    UnexpectedJson { found: &'static str },

    #[error("malformed document JSON")]
    Json(#[from] serde_json::Error),

    #[error("invalid snapshot time '{input}': expected an RFC 3339 instant or YYYY-MM-DD")]
    InvalidSnapshotTime {
        input: String,
        #[source]
        source: time::error::Parse,
    },
}
