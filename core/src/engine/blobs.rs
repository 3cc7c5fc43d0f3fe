//! Border blob assembly for releases and exterior claims
//!
//! Blob survival cannot be decided one cell at a time: an overlap found on
//! the last cell scanned voids an exterior blob whose other cells all looked
//! fine. Assembly therefore runs in two phases. The gather phase walks every
//! indexed cell once, routing release-covered cells to their owning release
//! and recording every invalidation signal. The finalize phase then builds
//! the surviving blobs.

use cellmap_types::{
    BlobOrigin, CellStatus, CellXY, ClaimStatus, ClaimType, Document, EngineConfig, MapBlob,
    Release,
};
use hashbrown::{HashMap, HashSet};
use time::OffsetDateTime;

use super::EngineError;
use super::cell_status::ReleaseCoverage;
use super::claim_status::claim_status_at;
use super::documents::DocumentIndex;

/// Output of blob assembly.
#[derive(Debug, Default)]
pub struct BlobAssembly {
    /// Release blobs ordered by release id, then exterior blobs ordered by claim id
    pub border_blobs: Vec<MapBlob>,
    /// Union of all cells placed into a border blob
    pub claimed_cells: HashSet<CellXY>,
}

/// Status a release blob renders with.
pub fn release_blob_status(release: &Release, at: OffsetDateTime, vanilla_creator: &str) -> CellStatus {
    if !release.is_released_at(at) {
        CellStatus::UnderRevision
    } else if release.is_created_by(vanilla_creator) {
        CellStatus::Vanilla
    } else {
        CellStatus::Released
    }
}

/// Status an exterior blob renders with, or `None` when a claim in that
/// state does not get a border. Finished exteriors are colored through the
/// ordinary per-cell rules instead.
pub fn exterior_blob_status(status: ClaimStatus) -> Option<CellStatus> {
    match status {
        ClaimStatus::NotStarted | ClaimStatus::InProgress => Some(CellStatus::HasNoExterior),
        ClaimStatus::Closed => Some(CellStatus::Blank),
        ClaimStatus::Done => None,
    }
}

fn sorted_cells(mut cells: Vec<CellXY>) -> Vec<CellXY> {
    cells.sort_unstable();
    cells.dedup();
    cells
}

pub fn assemble_blobs(
    index: &DocumentIndex<'_>,
    at: OffsetDateTime,
    config: &EngineConfig,
) -> Result<BlobAssembly, EngineError> {
    // Gather
    let mut release_cells: HashMap<&str, Vec<CellXY>> = HashMap::new();
    let mut voided_exteriors: HashSet<&str> = HashSet::new();

    for (cell, documents) in &index.cells {
        let mut coverage = ReleaseCoverage::default();
        let mut exteriors: Vec<&str> = Vec::new();

        for doc in documents {
            match doc {
                Document::Release(release) => coverage.add(release, at),
                Document::Claim(claim) if claim.claim_type == ClaimType::Exterior => {
                    exteriors.push(&claim.id);
                }
                Document::Claim(_) => {}
            }
        }

        if exteriors.len() > 1 || coverage.is_finished() {
            voided_exteriors.extend(exteriors);
        }
        if let Some(owner) = coverage.blob_owner() {
            release_cells.entry(owner.id.as_str()).or_default().push(*cell);
        }
    }

    // Finalize
    let mut assembly = BlobAssembly::default();

    let mut releases = index.releases.clone();
    releases.sort_by(|a, b| a.id.cmp(&b.id));
    for release in releases {
        let Some(cells) = release_cells.remove(release.id.as_str()) else {
            continue;
        };
        let cells = sorted_cells(cells);
        assembly.claimed_cells.extend(cells.iter().copied());
        assembly.border_blobs.push(MapBlob {
            origin: BlobOrigin::Release {
                id: release.id.clone(),
            },
            cell_status: release_blob_status(release, at, &config.vanilla_creator),
            cells,
        });
    }

    let mut exterior_claims = index.exterior_claims.clone();
    exterior_claims.sort_by(|a, b| a.id.cmp(&b.id));
    for claim in exterior_claims {
        if voided_exteriors.contains(claim.id.as_str()) || claim.cells.is_empty() {
            continue;
        }
        let Some(cell_status) = exterior_blob_status(claim_status_at(claim, at)?) else {
            continue;
        };
        let cells = sorted_cells(claim.cells.clone());
        assembly.claimed_cells.extend(cells.iter().copied());
        assembly.border_blobs.push(MapBlob {
            origin: BlobOrigin::ExteriorClaim {
                id: claim.id.clone(),
            },
            cell_status,
            cells,
        });
    }

    tracing::debug!(
        release_blobs = assembly
            .border_blobs
            .iter()
            .filter(|b| matches!(b.origin, BlobOrigin::Release { .. }))
            .count(),
        exterior_blobs = assembly
            .border_blobs
            .iter()
            .filter(|b| matches!(b.origin, BlobOrigin::ExteriorClaim { .. }))
            .count(),
        voided_exteriors = voided_exteriors.len(),
        "Border blobs assembled"
    );

    Ok(assembly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::documents::index_documents;
    use crate::engine::fixtures::{cells, claim, claim_doc, release, release_doc, t};

    fn assemble(docs: &[Document], at: OffsetDateTime) -> BlobAssembly {
        let index = index_documents(docs, at).unwrap();
        assemble_blobs(&index, at, &EngineConfig::default()).unwrap()
    }

    fn origin_ids(assembly: &BlobAssembly) -> Vec<&str> {
        assembly
            .border_blobs
            .iter()
            .map(|blob| match &blob.origin {
                BlobOrigin::Release { id } | BlobOrigin::ExteriorClaim { id } => id.as_str(),
                BlobOrigin::StatusBucket => "",
            })
            .collect()
    }

    #[test]
    fn test_release_blob_statuses() {
        let finished = release("r", "TR", &[(0, 0)], Some(t(1)));
        let vanilla = release("v", "BETHESDA", &[(0, 0)], Some(t(1)));
        let ongoing = release("o", "BETHESDA", &[(0, 0)], None);

        assert_eq!(release_blob_status(&finished, t(2), "BETHESDA"), CellStatus::Released);
        assert_eq!(release_blob_status(&vanilla, t(2), "BETHESDA"), CellStatus::Vanilla);
        assert_eq!(release_blob_status(&vanilla, t(0), "BETHESDA"), CellStatus::UnderRevision);
        assert_eq!(release_blob_status(&ongoing, t(2), "BETHESDA"), CellStatus::UnderRevision);
    }

    #[test]
    fn test_cells_join_latest_finished_release() {
        let docs = vec![
            release_doc("a-old", "TR", &[(0, 0), (0, 1)], Some(t(1))),
            release_doc("b-new", "TR", &[(0, 1)], Some(t(3))),
        ];
        let assembly = assemble(&docs, t(4));

        assert_eq!(origin_ids(&assembly), vec!["a-old", "b-new"]);
        assert_eq!(assembly.border_blobs[0].cells, cells(&[(0, 0)]));
        assert_eq!(assembly.border_blobs[1].cells, cells(&[(0, 1)]));
        assert_eq!(assembly.claimed_cells.len(), 2);
    }

    #[test]
    fn test_ongoing_only_cells_are_not_release_blobbed() {
        let docs = vec![release_doc("wip", "TR", &[(3, 3)], None)];
        let assembly = assemble(&docs, t(1));

        assert!(assembly.border_blobs.is_empty());
        assert!(assembly.claimed_cells.is_empty());
    }

    #[test]
    fn test_exterior_blob_survives_alone() {
        let docs = vec![claim_doc(
            "ro-1",
            ClaimType::Exterior,
            &[(1, 0), (0, 0)],
            ClaimStatus::InProgress,
        )];
        let assembly = assemble(&docs, t(1));

        assert_eq!(assembly.border_blobs.len(), 1);
        let blob = &assembly.border_blobs[0];
        assert_eq!(blob.cell_status, CellStatus::HasNoExterior);
        assert_eq!(blob.cells, cells(&[(0, 0), (1, 0)]));
        assert!(blob.requires_border());
    }

    #[test]
    fn test_closed_exterior_blob_is_blank() {
        let docs = vec![claim_doc("gone", ClaimType::Exterior, &[(0, 0)], ClaimStatus::Closed)];
        let assembly = assemble(&docs, t(1));
        assert_eq!(assembly.border_blobs[0].cell_status, CellStatus::Blank);
    }

    #[test]
    fn test_done_exterior_is_not_blobbed() {
        let docs = vec![claim_doc("done", ClaimType::Exterior, &[(0, 0)], ClaimStatus::Done)];
        let assembly = assemble(&docs, t(1));
        assert!(assembly.border_blobs.is_empty());
    }

    #[test]
    fn test_overlap_voids_both_exterior_blobs() {
        // The shared cell sorts last in both claims
        let docs = vec![
            claim_doc("a", ClaimType::Exterior, &[(0, 0), (0, 1), (9, 9)], ClaimStatus::InProgress),
            claim_doc("b", ClaimType::Exterior, &[(5, 5), (9, 9)], ClaimStatus::NotStarted),
            claim_doc("c", ClaimType::Exterior, &[(20, 20)], ClaimStatus::InProgress),
        ];
        let assembly = assemble(&docs, t(1));

        assert_eq!(origin_ids(&assembly), vec!["c"]);
    }

    #[test]
    fn test_closed_claim_still_counts_for_overlap() {
        let docs = vec![
            claim_doc("open", ClaimType::Exterior, &[(0, 0)], ClaimStatus::InProgress),
            claim_doc("closed", ClaimType::Exterior, &[(0, 0)], ClaimStatus::Closed),
        ];
        assert!(assemble(&docs, t(1)).border_blobs.is_empty());
    }

    #[test]
    fn test_finished_release_voids_exterior_blob() {
        let docs = vec![
            claim_doc("ext", ClaimType::Exterior, &[(0, 0), (0, 1)], ClaimStatus::InProgress),
            release_doc("rel", "TR", &[(0, 1)], Some(t(2))),
        ];

        // Before the release date the release is only ongoing
        let before = assemble(&docs, t(1));
        assert_eq!(origin_ids(&before), vec!["ext"]);

        let after = assemble(&docs, t(3));
        assert_eq!(origin_ids(&after), vec!["rel"]);
        assert_eq!(after.border_blobs[0].cells, cells(&[(0, 1)]));
    }

    #[test]
    fn test_exterior_status_uses_snapshot_time() {
        let ext = claim(
            "ext",
            ClaimType::Exterior,
            &[(0, 0)],
            &[(ClaimStatus::InProgress, t(1)), (ClaimStatus::Done, t(5))],
        );
        let docs = vec![Document::Claim(ext)];

        assert_eq!(assemble(&docs, t(2)).border_blobs.len(), 1);
        assert!(assemble(&docs, t(6)).border_blobs.is_empty());
    }
}
