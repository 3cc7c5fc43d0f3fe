//! Shared data model for cellmap
//!
//! This crate contains the serializable document, status, and snapshot types
//! that are shared between the snapshot engine (cellmap-core) and whatever
//! consumes its output (the REPL, a renderer, a web frontend).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use time::OffsetDateTime;

// ─────────────────────────────────────────────────────────────────────────────
// Cells
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while constructing a [`CellXY`] from untyped input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CellXYError {
    #[error("non-integer x value {0} given for a cell")]
    NonIntegerX(f64),

    #[error("non-integer y value {0} given for a cell")]
    NonIntegerY(f64),

    #[error("cell coordinate {0} is out of range")]
    OutOfRange(f64),

    #[error("invalid cell key '{0}': expected \"x,y\"")]
    InvalidKey(String),
}

/// Location of a cell in the game world grid.
///
/// Deserialization accepts any JSON number but rejects values with a
/// fractional part, so a document naming cell `(1.5, 2)` fails to load.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "RawCellXY")]
pub struct CellXY {
    pub x: i32,
    pub y: i32,
}

#[derive(Deserialize)]
struct RawCellXY {
    x: f64,
    y: f64,
}

impl TryFrom<RawCellXY> for CellXY {
    type Error = CellXYError;

    fn try_from(raw: RawCellXY) -> Result<Self, Self::Error> {
        CellXY::from_f64(raw.x, raw.y)
    }
}

impl CellXY {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Validate and convert untyped coordinates.
    pub fn from_f64(x: f64, y: f64) -> Result<Self, CellXYError> {
        if x.fract() != 0.0 || !x.is_finite() {
            return Err(CellXYError::NonIntegerX(x));
        }
        if y.fract() != 0.0 || !y.is_finite() {
            return Err(CellXYError::NonIntegerY(y));
        }
        Ok(Self {
            x: coordinate(x)?,
            y: coordinate(y)?,
        })
    }
}

fn coordinate(value: f64) -> Result<i32, CellXYError> {
    if value < i32::MIN as f64 || value > i32::MAX as f64 {
        return Err(CellXYError::OutOfRange(value));
    }
    Ok(value as i32)
}

/// Cells display as `x,y`, which is also their key form in JSON maps.
impl fmt::Display for CellXY {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for CellXY {
    type Err = CellXYError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CellXYError::InvalidKey(s.to_string());
        let (x, y) = s.split_once(',').ok_or_else(invalid)?;
        let x = x.trim().parse::<i32>().map_err(|_| invalid())?;
        let y = y.trim().parse::<i32>().map_err(|_| invalid())?;
        Ok(Self { x, y })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Claims
// ─────────────────────────────────────────────────────────────────────────────

/// Development phase a claim belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimType {
    /// Must be finished before a cell leaves `HAS_NO_EXTERIOR`
    Exterior,
    /// Must all be finished before a cell reaches `INTERIORS_FINISHED`
    Interior,
    Quest,
    /// Never required, but makes an otherwise empty cell non-blank
    Concept,
    /// Never required, but makes an otherwise empty cell non-blank
    Asset,
}

/// Progress of a single claim. Not to be confused with [`CellStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    NotStarted,
    InProgress,
    /// Merged. Named `DONE` to keep it distinct from any cell status.
    Done,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimUpdate {
    #[serde(with = "time::serde::rfc3339")]
    pub change_date: OffsetDateTime,
    /// Status of the claim after this update applied
    pub new_claim_status: ClaimStatus,
}

/// A unit of work against a set of cells.
///
/// Everything except `updates` is time-insensitive: the cells and type of a
/// claim apply retroactively to any snapshot taken after `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: String,
    #[serde(rename = "date", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Link to the claim on its tracker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub claim_type: ClaimType,
    pub cells: Vec<CellXY>,
    /// Ordered by `change_date` ascending, never empty for valid claims
    pub updates: Vec<ClaimUpdate>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Releases
// ─────────────────────────────────────────────────────────────────────────────

/// A public release. Finished releases force their cells to a
/// release-derived status regardless of claim progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: String,
    #[serde(rename = "date", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub released_cells: Vec<CellXY>,
    pub creator: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    /// `None` while the release is still being worked on
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub release_date: Option<OffsetDateTime>,
}

impl Release {
    /// Work on the release had begun by `at`
    pub fn has_started_at(&self, at: OffsetDateTime) -> bool {
        self.start_date <= at
    }

    /// The release was published on or before `at`
    pub fn is_released_at(&self, at: OffsetDateTime) -> bool {
        self.release_date.is_some_and(|date| date <= at)
    }

    pub fn is_created_by(&self, creator: &str) -> bool {
        self.creator == creator
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Documents
// ─────────────────────────────────────────────────────────────────────────────

/// Value of the `type` tag on a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Claim,
    Release,
}

impl DocumentType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "CLAIM" => Some(Self::Claim),
            "RELEASE" => Some(Self::Release),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Claim => "CLAIM",
            DocumentType::Release => "RELEASE",
        }
    }
}

/// A stored document that can affect the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Document {
    Claim(Claim),
    Release(Release),
}

impl Document {
    pub fn id(&self) -> &str {
        match self {
            Document::Claim(claim) => &claim.id,
            Document::Release(release) => &release.id,
        }
    }

    pub fn created_at(&self) -> OffsetDateTime {
        match self {
            Document::Claim(claim) => claim.created_at,
            Document::Release(release) => release.created_at,
        }
    }

    /// Cells this document touches
    pub fn cells(&self) -> &[CellXY] {
        match self {
            Document::Claim(claim) => &claim.cells,
            Document::Release(release) => &release.released_cells,
        }
    }

    pub fn document_type(&self) -> DocumentType {
        match self {
            Document::Claim(_) => DocumentType::Claim,
            Document::Release(_) => DocumentType::Release,
        }
    }

    /// Display name, falling back to the id
    pub fn display_name(&self) -> &str {
        let name = match self {
            Document::Claim(claim) => claim.name.as_deref(),
            Document::Release(release) => release.name.as_deref(),
        };
        name.unwrap_or_else(|| self.id())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cell Status
// ─────────────────────────────────────────────────────────────────────────────

/// Display state of a cell, combining claim and release facts.
///
/// Variants are declared from least to most advanced along the claim
/// pipeline; `Released`, `Vanilla` and `UnderRevision` form the release
/// override class that sits outside that order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CellStatus {
    /// Renders the same as a cell that does not exist
    Blank,
    HasNoExterior,
    ExteriorFinished,
    InteriorsFinished,
    HasQuests,
    /// Included in a finished public release
    Released,
    /// Part of the base game, released by the marker creator
    Vanilla,
    /// Previously released and part of a newer, unfinished release
    UnderRevision,
}

impl CellStatus {
    pub const ALL: [CellStatus; 8] = [
        CellStatus::Blank,
        CellStatus::HasNoExterior,
        CellStatus::ExteriorFinished,
        CellStatus::InteriorsFinished,
        CellStatus::HasQuests,
        CellStatus::Released,
        CellStatus::Vanilla,
        CellStatus::UnderRevision,
    ];

    pub fn is_release_override(&self) -> bool {
        matches!(
            self,
            CellStatus::Released | CellStatus::Vanilla | CellStatus::UnderRevision
        )
    }

    /// RGBA fill color used when rendering cells of this status
    pub fn fill_color(&self) -> &'static str {
        match self {
            CellStatus::Blank => "#ffffff00",
            CellStatus::Released => "#0000dd80",
            CellStatus::Vanilla => "#33333380",
            CellStatus::UnderRevision => "#dd00dd80",
            CellStatus::HasNoExterior => "#dd000080",
            CellStatus::ExteriorFinished => "#dd771180",
            CellStatus::InteriorsFinished => "#dddd0080",
            CellStatus::HasQuests => "#00dd0080",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CellStatus::Blank => "BLANK",
            CellStatus::HasNoExterior => "HAS_NO_EXTERIOR",
            CellStatus::ExteriorFinished => "EXTERIOR_FINISHED",
            CellStatus::InteriorsFinished => "INTERIORS_FINISHED",
            CellStatus::HasQuests => "HAS_QUESTS",
            CellStatus::Released => "RELEASED",
            CellStatus::Vanilla => "VANILLA",
            CellStatus::UnderRevision => "UNDER_REVISION",
        }
    }
}

impl fmt::Display for CellStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Map Snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// Where a blob came from. Release and exterior-claim blobs get a border.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlobOrigin {
    Release { id: String },
    ExteriorClaim { id: String },
    StatusBucket,
}

/// A group of same-colored cells rendered as one (multi)polygon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapBlob {
    pub origin: BlobOrigin,
    pub cell_status: CellStatus,
    /// Sorted, without duplicates
    pub cells: Vec<CellXY>,
}

impl MapBlob {
    pub fn requires_border(&self) -> bool {
        match self.origin {
            BlobOrigin::Release { .. } | BlobOrigin::ExteriorClaim { .. } => true,
            BlobOrigin::StatusBucket => false,
        }
    }
}

/// Everything needed to color the map at one instant and to look up the
/// documents behind a clicked cell.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSnapshot {
    pub border_blobs: Vec<MapBlob>,
    /// Cells outside any border blob, grouped by status
    pub status_blobs: BTreeMap<CellStatus, Vec<CellXY>>,
    /// Ids of every document referencing each cell, in input order
    #[serde(with = "cell_keyed")]
    pub cell_documents: BTreeMap<CellXY, Vec<String>>,
}

impl MapSnapshot {
    /// Status a cell is rendered with, if it appears on the map at all
    pub fn status_of(&self, cell: CellXY) -> Option<CellStatus> {
        self.border_blobs
            .iter()
            .find(|blob| blob.cells.binary_search(&cell).is_ok())
            .map(|blob| blob.cell_status)
            .or_else(|| {
                self.status_blobs
                    .iter()
                    .find(|(_, cells)| cells.binary_search(&cell).is_ok())
                    .map(|(status, _)| *status)
            })
    }

    /// Blob containing a cell, with status buckets materialized on demand
    pub fn blob_containing(&self, cell: CellXY) -> Option<MapBlob> {
        if let Some(blob) = self
            .border_blobs
            .iter()
            .find(|blob| blob.cells.binary_search(&cell).is_ok())
        {
            return Some(blob.clone());
        }
        let status = self.status_of(cell)?;
        self.status_blob(status)
    }

    /// The unbordered blob for one status, or `None` if no cell has it
    pub fn status_blob(&self, status: CellStatus) -> Option<MapBlob> {
        let cells = self.status_blobs.get(&status)?;
        if cells.is_empty() {
            return None;
        }
        Some(MapBlob {
            origin: BlobOrigin::StatusBucket,
            cell_status: status,
            cells: cells.clone(),
        })
    }

    /// Every renderable blob: border blobs first, then non-empty buckets
    pub fn blobs(&self) -> Vec<MapBlob> {
        let mut blobs = self.border_blobs.clone();
        blobs.extend(
            self.status_blobs
                .keys()
                .filter_map(|status| self.status_blob(*status)),
        );
        blobs
    }

    pub fn documents_for(&self, cell: CellXY) -> &[String] {
        self.cell_documents
            .get(&cell)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of cells rendered with any status
    pub fn cell_count(&self) -> usize {
        let bordered: usize = self.border_blobs.iter().map(|b| b.cells.len()).sum();
        let bucketed: usize = self.status_blobs.values().map(Vec::len).sum();
        bordered + bucketed
    }
}

/// Serializes cell-keyed maps with `"x,y"` string keys, since JSON object
/// keys must be strings.
pub mod cell_keyed {
    use super::CellXY;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<V, S>(map: &BTreeMap<CellXY, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_map(map.iter().map(|(cell, value)| (cell.to_string(), value)))
    }

    pub fn deserialize<'de, V, D>(deserializer: D) -> Result<BTreeMap<CellXY, V>, D::Error>
    where
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, V>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, value)| {
                key.parse::<CellXY>()
                    .map(|cell| (cell, value))
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

fn default_vanilla_creator() -> String {
    "BETHESDA".to_string()
}

fn default_parallel_cell_threshold() -> usize {
    256
}

/// Tunables for snapshot generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Release creator whose finished releases render as `VANILLA`
    #[serde(default = "default_vanilla_creator")]
    pub vanilla_creator: String,
    /// Unclaimed-cell count at which classification fans out across threads
    #[serde(default = "default_parallel_cell_threshold")]
    pub parallel_cell_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vanilla_creator: default_vanilla_creator(),
            parallel_cell_threshold: default_parallel_cell_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory scanned for `*.json` document files
    #[serde(default)]
    pub documents_directory: String,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn with_documents_directory(documents_directory: String) -> Self {
        Self {
            documents_directory,
            engine: EngineConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn cell_rejects_fractional_coordinates() {
        assert_eq!(CellXY::from_f64(3.0, -2.0), Ok(CellXY::new(3, -2)));
        assert_eq!(CellXY::from_f64(1.5, 0.0), Err(CellXYError::NonIntegerX(1.5)));
        assert_eq!(CellXY::from_f64(0.0, 0.25), Err(CellXYError::NonIntegerY(0.25)));
        assert!(matches!(
            CellXY::from_f64(1e12, 0.0),
            Err(CellXYError::OutOfRange(_))
        ));
    }

    #[test]
    fn cell_deserialization_validates() {
        let cell: CellXY = serde_json::from_str(r#"{"x": 4, "y": -7}"#).unwrap();
        assert_eq!(cell, CellXY::new(4, -7));

        let err = serde_json::from_str::<CellXY>(r#"{"x": 4.5, "y": -7}"#).unwrap_err();
        assert!(err.to_string().contains("non-integer x value"));
    }

    #[test]
    fn cell_key_roundtrip() {
        let cell = CellXY::new(-12, 30);
        assert_eq!(cell.to_string(), "-12,30");
        assert_eq!("-12,30".parse::<CellXY>(), Ok(cell));
        assert!("12;30".parse::<CellXY>().is_err());
    }

    #[test]
    fn release_timing() {
        let release = Release {
            id: "r1".to_string(),
            created_at: datetime!(2020-01-01 0:00 UTC),
            name: None,
            released_cells: vec![CellXY::new(0, 0)],
            creator: "TR".to_string(),
            start_date: datetime!(2020-02-01 0:00 UTC),
            release_date: Some(datetime!(2020-06-01 0:00 UTC)),
        };

        assert!(!release.has_started_at(datetime!(2020-01-15 0:00 UTC)));
        assert!(release.has_started_at(datetime!(2020-02-01 0:00 UTC)));
        assert!(!release.is_released_at(datetime!(2020-05-31 0:00 UTC)));
        assert!(release.is_released_at(datetime!(2020-06-01 0:00 UTC)));
    }

    #[test]
    fn document_parses_from_tagged_json() {
        let json = r#"{
            "type": "CLAIM",
            "id": "ro-1",
            "date": "2021-07-08T00:00:00Z",
            "name": "RO 1",
            "claimType": "EXTERIOR",
            "cells": [{"x": 1, "y": 2}],
            "updates": [
                {"changeDate": "2021-07-08T00:00:00Z", "newClaimStatus": "IN_PROGRESS"}
            ]
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();

        assert_eq!(doc.id(), "ro-1");
        assert_eq!(doc.document_type(), DocumentType::Claim);
        assert_eq!(doc.cells(), &[CellXY::new(1, 2)]);
        assert_eq!(doc.display_name(), "RO 1");
        match doc {
            Document::Claim(claim) => {
                assert_eq!(claim.claim_type, ClaimType::Exterior);
                assert_eq!(claim.updates[0].new_claim_status, ClaimStatus::InProgress);
            }
            Document::Release(_) => panic!("expected a claim"),
        }
    }

    #[test]
    fn ongoing_release_has_no_release_date() {
        let json = r#"{
            "type": "RELEASE",
            "id": "rel",
            "date": "2021-01-01T00:00:00Z",
            "releasedCells": [],
            "creator": "TR",
            "startDate": "2021-01-01T00:00:00Z"
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        let Document::Release(release) = doc else {
            panic!("expected a release");
        };
        assert_eq!(release.release_date, None);
        assert!(!release.is_released_at(datetime!(2030-01-01 0:00 UTC)));
    }

    #[test]
    fn snapshot_json_uses_string_cell_keys() {
        let mut snapshot = MapSnapshot::default();
        snapshot
            .cell_documents
            .insert(CellXY::new(1, -1), vec!["a".to_string()]);
        snapshot
            .status_blobs
            .insert(CellStatus::HasQuests, vec![CellXY::new(1, -1)]);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["cellDocuments"]["1,-1"][0], "a");
        assert_eq!(json["statusBlobs"]["HAS_QUESTS"][0]["x"], 1);

        let back: MapSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn snapshot_lookup_prefers_border_blobs() {
        let cell = CellXY::new(0, 0);
        let mut snapshot = MapSnapshot::default();
        snapshot.border_blobs.push(MapBlob {
            origin: BlobOrigin::Release { id: "r".to_string() },
            cell_status: CellStatus::Released,
            cells: vec![cell],
        });
        snapshot
            .status_blobs
            .insert(CellStatus::Blank, vec![CellXY::new(5, 5)]);

        assert_eq!(snapshot.status_of(cell), Some(CellStatus::Released));
        assert_eq!(snapshot.status_of(CellXY::new(5, 5)), Some(CellStatus::Blank));
        assert_eq!(snapshot.status_of(CellXY::new(9, 9)), None);
        assert!(snapshot.blob_containing(cell).unwrap().requires_border());
        assert!(!snapshot
            .blob_containing(CellXY::new(5, 5))
            .unwrap()
            .requires_border());
        assert_eq!(snapshot.blobs().len(), 2);
        assert_eq!(snapshot.cell_count(), 2);
    }

    #[test]
    fn release_statuses_are_overrides() {
        let overrides: Vec<_> = CellStatus::ALL
            .iter()
            .filter(|s| s.is_release_override())
            .collect();
        assert_eq!(overrides.len(), 3);
        assert!(CellStatus::Blank < CellStatus::HasNoExterior);
        assert!(CellStatus::InteriorsFinished < CellStatus::HasQuests);
    }
}
