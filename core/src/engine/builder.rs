//! Snapshot orchestration

use std::collections::BTreeMap;

use cellmap_types::{CellStatus, CellXY, Document, EngineConfig, MapSnapshot};
use rayon::prelude::*;
use time::OffsetDateTime;

use super::EngineError;
use super::blobs::assemble_blobs;
use super::cell_status::{CellFacts, classify_cell};
use super::documents::index_documents;

/// Derive the map as it stood at `at`.
///
/// This is a pure function of its inputs: no state survives between calls
/// and identical inputs give identical snapshots.
pub fn generate_map_snapshot(
    documents: &[Document],
    at: OffsetDateTime,
    config: &EngineConfig,
) -> Result<MapSnapshot, EngineError> {
    let index = index_documents(documents, at)?;
    let assembly = assemble_blobs(&index, at, config)?;

    // Cells left for per-status coloring, sorted so the buckets come out sorted
    let mut arena: Vec<(CellXY, &[&Document])> = index
        .cells
        .iter()
        .filter(|(cell, _)| !assembly.claimed_cells.contains(*cell))
        .map(|(cell, docs)| (*cell, docs.as_slice()))
        .collect();
    arena.sort_unstable_by_key(|(cell, _)| *cell);

    let classify = |(cell, docs): &(CellXY, &[&Document])| {
        CellFacts::gather(docs, at, &config.vanilla_creator)
            .map(|facts| (*cell, classify_cell(&facts)))
    };

    let statuses: Vec<(CellXY, CellStatus)> = if arena.len() >= config.parallel_cell_threshold {
        arena.par_iter().map(classify).collect::<Result<_, _>>()?
    } else {
        arena.iter().map(classify).collect::<Result<_, _>>()?
    };

    let mut status_blobs: BTreeMap<CellStatus, Vec<CellXY>> = CellStatus::ALL
        .iter()
        .map(|status| (*status, Vec::new()))
        .collect();
    for (cell, status) in statuses {
        status_blobs.entry(status).or_default().push(cell);
    }

    let cell_documents: BTreeMap<CellXY, Vec<String>> = index
        .cells
        .iter()
        .map(|(cell, docs)| (*cell, docs.iter().map(|doc| doc.id().to_string()).collect()))
        .collect();

    tracing::debug!(
        at = %at,
        documents = documents.len(),
        cells = cell_documents.len(),
        border_blobs = assembly.border_blobs.len(),
        bucketed_cells = arena.len(),
        "Map snapshot generated"
    );

    Ok(MapSnapshot {
        border_blobs: assembly.border_blobs,
        status_blobs,
        cell_documents,
    })
}
