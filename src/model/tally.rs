use serde::{Deserialize, Serialize};

use crate::model::{candidate::CandidateId, election::ElectionId};

/// Derived standings for one candidate. Recomputed from the ledger on
/// every change, never stored as ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TallyEntry {
    pub candidate_id: CandidateId,
    /// Ballot number; also the tie-break key (ascending) for equal counts.
    pub candidate_number: u32,
    pub vote_count: u64,
    /// Share of all votes in the election, one decimal place. 0 when the
    /// election has no votes.
    pub share_percent: f64,
    /// 1-based position after sorting by count descending.
    pub rank: u32,
}

/// A complete derived view of one election's results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TallySnapshot {
    pub election_id: ElectionId,
    /// Sorted by vote count descending, ties broken by ascending number.
    pub entries: Vec<TallyEntry>,
    pub total_votes: u64,
    /// Votes cast over eligible voters, one decimal place. 0 when there
    /// are no eligible voters.
    pub turnout_percent: f64,
    /// Ledger version this snapshot was computed from. Strictly increases
    /// with every appended vote, so successive snapshots are ordered.
    pub ledger_version: u64,
}
