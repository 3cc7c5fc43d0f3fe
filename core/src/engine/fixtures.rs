//! Document builders shared by the engine tests

use cellmap_types::{CellXY, Claim, ClaimStatus, ClaimType, ClaimUpdate, Document, Release};
use time::{Duration, OffsetDateTime};
use time::macros::datetime;

/// Day `day` after a fixed epoch
pub fn t(day: i64) -> OffsetDateTime {
    datetime!(2020-01-01 0:00 UTC) + Duration::days(day)
}

pub fn cells(coords: &[(i32, i32)]) -> Vec<CellXY> {
    coords.iter().map(|&(x, y)| CellXY::new(x, y)).collect()
}

/// Claim created at day 0
pub fn claim(
    id: &str,
    claim_type: ClaimType,
    coords: &[(i32, i32)],
    updates: &[(ClaimStatus, OffsetDateTime)],
) -> Claim {
    Claim {
        id: id.to_string(),
        created_at: t(0),
        name: None,
        url: None,
        claim_type,
        cells: cells(coords),
        updates: updates
            .iter()
            .map(|&(new_claim_status, change_date)| ClaimUpdate {
                change_date,
                new_claim_status,
            })
            .collect(),
    }
}

/// Claim with a single update at day 0
pub fn claim_doc(id: &str, claim_type: ClaimType, coords: &[(i32, i32)], status: ClaimStatus) -> Document {
    Document::Claim(claim(id, claim_type, coords, &[(status, t(0))]))
}

/// Release created and started at day 0
pub fn release(
    id: &str,
    creator: &str,
    coords: &[(i32, i32)],
    release_date: Option<OffsetDateTime>,
) -> Release {
    Release {
        id: id.to_string(),
        created_at: t(0),
        name: None,
        released_cells: cells(coords),
        creator: creator.to_string(),
        start_date: t(0),
        release_date,
    }
}

pub fn release_doc(
    id: &str,
    creator: &str,
    coords: &[(i32, i32)],
    release_date: Option<OffsetDateTime>,
) -> Document {
    Document::Release(release(id, creator, coords, release_date))
}
