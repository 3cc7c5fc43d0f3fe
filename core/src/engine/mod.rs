//! Map snapshot generation
//!
//! Turns an immutable log of claims and releases plus a query instant into a
//! [`MapSnapshot`](cellmap_types::MapSnapshot).
//!
//! # Pipeline
//!
//! ```text
//!   documents + snapshot time
//!              │
//!              ▼
//!   index_documents ──► cell → documents, exterior claims, releases
//!              │
//!              ▼
//!   assemble_blobs  ──► border blobs + cells they claim
//!              │
//!              ▼
//!   remaining cells ──► CellFacts::gather ──► classify_cell   (rayon fan-out)
//!              │
//!              ▼
//!        MapSnapshot
//! ```

mod blobs;
mod builder;
mod cell_status;
mod claim_status;
mod documents;
mod error;

#[cfg(test)]
mod fixtures;

pub use blobs::{BlobAssembly, assemble_blobs, exterior_blob_status, release_blob_status};
pub use builder::generate_map_snapshot;
pub use cell_status::{CellFacts, FinishedRelease, ReleaseCoverage, classify_cell};
pub use claim_status::claim_status_at;
pub use documents::{DocumentIndex, index_documents, parse_document, parse_documents};
pub use error::EngineError;

use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{Date, OffsetDateTime, Time};

/// Parse a query instant: an RFC 3339 timestamp, or a calendar date taken
/// as midnight UTC.
pub fn parse_snapshot_time(input: &str) -> Result<OffsetDateTime, EngineError> {
    let input = input.trim();
    match OffsetDateTime::parse(input, &Rfc3339) {
        Ok(at) => Ok(at),
        Err(source) => Date::parse(input, &Iso8601::DATE)
            .map(|date| date.with_time(Time::MIDNIGHT).assume_utc())
            .map_err(|_| EngineError::InvalidSnapshotTime {
                input: input.to_string(),
                source,
            }),
    }
}
