//! Per-cell status classification
//!
//! A cell's status depends on the joint state of every claim and release
//! touching it, so the facts are gathered first and classified in one step.

use cellmap_types::{CellStatus, ClaimStatus, ClaimType, Document, Release};
use time::OffsetDateTime;

use super::EngineError;
use super::claim_status::claim_status_at;

// ─────────────────────────────────────────────────────────────────────────────
// Release Coverage
// ─────────────────────────────────────────────────────────────────────────────

/// Releases covering one cell at one instant, reduced to the two that can
/// decide its fate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseCoverage<'a> {
    /// Finished release with the latest release date (ties: greatest id)
    pub latest_finished: Option<&'a Release>,
    /// Started but unfinished release with the latest start date (ties: greatest id)
    pub latest_ongoing: Option<&'a Release>,
}

impl<'a> ReleaseCoverage<'a> {
    /// Record a release covering the cell. Releases that have not started
    /// by `at` do not cover anything yet.
    pub fn add(&mut self, release: &'a Release, at: OffsetDateTime) {
        if !release.has_started_at(at) {
            return;
        }
        if release.is_released_at(at) {
            let replace = self.latest_finished.is_none_or(|current| {
                (release.release_date, &release.id) > (current.release_date, &current.id)
            });
            if replace {
                self.latest_finished = Some(release);
            }
        } else {
            let replace = self.latest_ongoing.is_none_or(|current| {
                (release.start_date, &release.id) > (current.start_date, &current.id)
            });
            if replace {
                self.latest_ongoing = Some(release);
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.latest_finished.is_some()
    }

    pub fn is_ongoing(&self) -> bool {
        self.latest_ongoing.is_some()
    }

    /// Release whose border blob the cell belongs to.
    ///
    /// Only cells in a finished release are release-blobbed. If an unfinished
    /// release is revising the cell, that release owns it.
    pub fn blob_owner(&self) -> Option<&'a Release> {
        self.latest_finished?;
        self.latest_ongoing.or(self.latest_finished)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cell Facts
// ─────────────────────────────────────────────────────────────────────────────

/// Finished release that covers a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishedRelease {
    /// Created by the vanilla marker creator
    pub vanilla: bool,
}

/// Everything the classifier needs to know about one cell.
///
/// Claim lists hold resolved statuses of non-closed claims only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellFacts {
    pub exteriors: Vec<ClaimStatus>,
    pub interiors: Vec<ClaimStatus>,
    pub quests: Vec<ClaimStatus>,
    /// Concept and asset claims, which only make a cell non-blank
    pub other_claims: usize,
    pub finished_release: Option<FinishedRelease>,
    pub in_ongoing_release: bool,
}

impl CellFacts {
    /// Gather facts from every document covering a cell.
    pub fn gather(
        documents: &[&Document],
        at: OffsetDateTime,
        vanilla_creator: &str,
    ) -> Result<Self, EngineError> {
        let mut facts = Self::default();
        let mut coverage = ReleaseCoverage::default();

        for doc in documents {
            match doc {
                Document::Claim(claim) => {
                    let status = claim_status_at(claim, at)?;
                    facts.add_claim(claim.claim_type, status);
                }
                Document::Release(release) => coverage.add(release, at),
            }
        }

        facts.finished_release = coverage.latest_finished.map(|release| FinishedRelease {
            vanilla: release.is_created_by(vanilla_creator),
        });
        facts.in_ongoing_release = coverage.is_ongoing();
        Ok(facts)
    }

    /// Closed claims are ignored for coloring.
    pub fn add_claim(&mut self, claim_type: ClaimType, status: ClaimStatus) {
        if status == ClaimStatus::Closed {
            return;
        }
        match claim_type {
            ClaimType::Exterior => self.exteriors.push(status),
            ClaimType::Interior => self.interiors.push(status),
            ClaimType::Quest => self.quests.push(status),
            ClaimType::Concept | ClaimType::Asset => self.other_claims += 1,
        }
    }

    pub fn has_claims(&self) -> bool {
        !self.exteriors.is_empty()
            || !self.interiors.is_empty()
            || !self.quests.is_empty()
            || self.other_claims > 0
    }
}

fn all_done(statuses: &[ClaimStatus]) -> bool {
    statuses.iter().all(|status| *status == ClaimStatus::Done)
}

/// Display status for a cell. The first matching rule wins:
///
/// 1. finished release coverage (revision, vanilla, released)
/// 2. nothing at all: blank
/// 3. missing or unfinished exterior
/// 4. exterior done: interiors and quests decide how far along it is
pub fn classify_cell(facts: &CellFacts) -> CellStatus {
    if let Some(finished) = facts.finished_release {
        if facts.in_ongoing_release {
            return CellStatus::UnderRevision;
        }
        return if finished.vanilla {
            CellStatus::Vanilla
        } else {
            CellStatus::Released
        };
    }

    if !facts.has_claims() && !facts.in_ongoing_release {
        return CellStatus::Blank;
    }

    if facts.exteriors.is_empty() || !all_done(&facts.exteriors) {
        return CellStatus::HasNoExterior;
    }

    let has_interiors = !facts.interiors.is_empty();
    let interiors_done = all_done(&facts.interiors);
    let has_done_quest = facts.quests.contains(&ClaimStatus::Done);

    match (has_interiors, interiors_done, has_done_quest) {
        (true, true, true) => CellStatus::HasQuests,
        (true, true, false) => CellStatus::InteriorsFinished,
        // Quests are ignored while interiors are incomplete
        (true, false, _) => CellStatus::ExteriorFinished,
        (false, _, true) => CellStatus::HasQuests,
        (false, _, false) => CellStatus::ExteriorFinished,
    }
}
