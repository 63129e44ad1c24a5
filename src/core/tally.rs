use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{
    candidates::CandidateRegistry, elections::ElectionRegistry, ledger::VoteLedger,
    roster::VoterRoster,
};
use crate::error::Result;
use crate::model::{
    candidate::CandidateId,
    election::ElectionId,
    tally::{TallyEntry, TallySnapshot},
};

/// Derives per-candidate counts and rankings from a ledger snapshot. Pure:
/// no state of its own, every call recomputes from the ledger.
pub struct TallyEngine {
    elections: Arc<ElectionRegistry>,
    candidates: Arc<CandidateRegistry>,
    ledger: Arc<VoteLedger>,
    roster: Arc<VoterRoster>,
}

impl TallyEngine {
    pub fn new(
        elections: Arc<ElectionRegistry>,
        candidates: Arc<CandidateRegistry>,
        ledger: Arc<VoteLedger>,
        roster: Arc<VoterRoster>,
    ) -> Self {
        Self {
            elections,
            candidates,
            ledger,
            roster,
        }
    }

    /// Compute the current tally for one election. Candidates without
    /// votes are included with a zero count. Entries are sorted by count
    /// descending; equal counts are broken by ascending ballot number so
    /// the ordering is deterministic.
    pub fn compute(&self, election_id: ElectionId) -> Result<TallySnapshot> {
        self.elections.get(election_id)?;
        let candidates = self.candidates.list(election_id)?;
        let (votes, ledger_version) = self.ledger.snapshot(election_id);

        let mut counts: HashMap<CandidateId, u64> = HashMap::new();
        for vote in &votes {
            *counts.entry(vote.candidate_id).or_default() += 1;
        }
        let total_votes = votes.len() as u64;

        let mut entries: Vec<TallyEntry> = candidates
            .iter()
            .map(|candidate| TallyEntry {
                candidate_id: candidate.id,
                candidate_number: candidate.number,
                vote_count: counts.get(&candidate.id).copied().unwrap_or(0),
                share_percent: 0.0,
                rank: 0,
            })
            .collect();
        entries.sort_by(|a, b| {
            b.vote_count
                .cmp(&a.vote_count)
                .then(a.candidate_number.cmp(&b.candidate_number))
        });
        for (index, entry) in entries.iter_mut().enumerate() {
            entry.rank = index as u32 + 1;
            entry.share_percent = percentage(entry.vote_count, total_votes);
        }

        Ok(TallySnapshot {
            election_id,
            entries,
            total_votes,
            turnout_percent: percentage(total_votes, self.roster.eligible_count()),
            ledger_version,
        })
    }
}

/// `part` out of `whole` as a percentage with one decimal place; 0 when
/// `whole` is 0.
fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}
