//! Claim status as of a point in time

use cellmap_types::{Claim, ClaimStatus};
use time::OffsetDateTime;

use super::EngineError;

/// Status of `claim` at `at`.
///
/// A claim whose latest update is `CLOSED` is closed at every instant, even
/// before the closing update; a later non-closed update reopens it. Otherwise
/// the latest update on or before `at` wins, and a claim with no update yet is
/// `NOT_STARTED`.
pub fn claim_status_at(claim: &Claim, at: OffsetDateTime) -> Result<ClaimStatus, EngineError> {
    let latest = claim
        .updates
        .last()
        .ok_or_else(|| EngineError::ClaimWithoutUpdates {
            claim_id: claim.id.clone(),
        })?;

    if latest.new_claim_status == ClaimStatus::Closed {
        return Ok(ClaimStatus::Closed);
    }

    Ok(claim
        .updates
        .iter()
        .rev()
        .find(|update| update.change_date <= at)
        .map(|update| update.new_claim_status)
        .unwrap_or(ClaimStatus::NotStarted))
}
