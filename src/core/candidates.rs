use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use crate::core::elections::ElectionRegistry;
use crate::error::{Error, Result};
use crate::model::{
    candidate::{Candidate, CandidateId, CandidateSpec},
    election::ElectionId,
};

/// Owns candidate records, scoped to their elections. Insertion order is
/// preserved per election.
pub struct CandidateRegistry {
    elections: Arc<ElectionRegistry>,
    candidates: RwLock<HashMap<ElectionId, Vec<Candidate>>>,
    next_id: AtomicU32,
}

impl CandidateRegistry {
    pub fn new(elections: Arc<ElectionRegistry>) -> Self {
        Self {
            elections,
            candidates: RwLock::new(HashMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    /// Register a candidate for an election that is still being set up.
    pub fn register(&self, election_id: ElectionId, spec: CandidateSpec) -> Result<Candidate> {
        spec.validate()?;
        let election = self.elections.get(election_id)?;
        if !election.status.accepts_candidates() {
            return Err(Error::ElectionState(format!(
                "election {election_id} is {:?}; candidates may only be registered while it is \
                 draft or open",
                election.status
            )));
        }

        // The number-uniqueness check and the insert share one write lock.
        let mut candidates = self.candidates.write().expect("poisoned lock");
        let for_election = candidates.entry(election_id).or_default();
        if for_election.iter().any(|c| c.number == spec.number) {
            return Err(Error::Validation(format!(
                "number {} is already taken in election {election_id}",
                spec.number
            )));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let candidate = spec.into_candidate(id, election_id);
        for_election.push(candidate.clone());
        info!(
            "Registered candidate {id} (number {}) for election {election_id}",
            candidate.number
        );
        Ok(candidate)
    }

    /// Candidates of one election, in insertion order.
    pub fn list(&self, election_id: ElectionId) -> Result<Vec<Candidate>> {
        // Distinguish "no candidates yet" from "no such election".
        self.elections.get(election_id)?;
        Ok(self
            .candidates
            .read()
            .expect("poisoned lock")
            .get(&election_id)
            .cloned()
            .unwrap_or_default())
    }

    /// Number of registered candidates; 0 for unknown elections.
    pub fn count(&self, election_id: ElectionId) -> usize {
        self.candidates
            .read()
            .expect("poisoned lock")
            .get(&election_id)
            .map_or(0, Vec::len)
    }
}
