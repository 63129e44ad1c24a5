use std::collections::{hash_map::Entry, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::core::{candidates::CandidateRegistry, elections::ElectionRegistry};
use crate::error::{Error, Result};
use crate::model::{
    candidate::CandidateId,
    election::{ElectionId, ElectionStatus},
    vote::{Fingerprinter, Vote, VoteId, VoteReceipt},
};

/// Everything the ledger mutates, behind one mutex so the uniqueness
/// check and the append are a single critical section.
#[derive(Default)]
struct LedgerState {
    /// Append-only; votes are never updated or removed.
    votes: Vec<Vote>,
    /// Composite-key index enforcing one vote per voter per election.
    by_voter: HashMap<(String, ElectionId), VoteId>,
    /// Bumped on every append; snapshots carry it for ordering.
    version: u64,
    next_vote_id: VoteId,
}

/// The append-only, uniqueness-enforcing store of cast votes. This is the
/// one mutable resource shared between concurrent voting terminals.
pub struct VoteLedger {
    elections: Arc<ElectionRegistry>,
    candidates: Arc<CandidateRegistry>,
    fingerprinter: Fingerprinter,
    state: Mutex<LedgerState>,
}

impl VoteLedger {
    pub fn new(
        elections: Arc<ElectionRegistry>,
        candidates: Arc<CandidateRegistry>,
        fingerprinter: Fingerprinter,
    ) -> Self {
        Self {
            elections,
            candidates,
            fingerprinter,
            state: Mutex::new(LedgerState {
                next_vote_id: 1,
                ..LedgerState::default()
            }),
        }
    }

    /// Cast a vote. Checks, in order: the references exist and agree, the
    /// election is accepting votes right now, and the voter has not voted
    /// in this election before. The duplicate check and the append are
    /// atomic over the `{voter, election}` key: of any number of
    /// concurrent casts sharing the key, exactly one succeeds.
    pub fn cast_vote(
        &self,
        voter_id: &str,
        candidate_id: CandidateId,
        election_id: ElectionId,
        now: DateTime<Utc>,
    ) -> Result<VoteReceipt> {
        let election = self.elections.get(election_id)?;
        let candidates = self.candidates.list(election_id)?;
        if !candidates.iter().any(|c| c.id == candidate_id) {
            return Err(Error::not_found(format!(
                "Candidate {candidate_id} in election {election_id}"
            )));
        }

        if election.status != ElectionStatus::InProgress {
            return Err(Error::ElectionState(format!(
                "election {election_id} is {:?}, not in progress",
                election.status
            )));
        }
        if now < election.start_time || now > election.end_time {
            return Err(Error::ElectionState(format!(
                "election {election_id} only accepts votes between {} and {}",
                election.start_time, election.end_time
            )));
        }

        let mut guard = self.state.lock().expect("poisoned lock");
        let state = &mut *guard;
        match state.by_voter.entry((voter_id.to_string(), election_id)) {
            Entry::Occupied(_) => Err(Error::DuplicateVote {
                voter_id: voter_id.to_string(),
                election_id,
            }),
            Entry::Vacant(slot) => {
                let id = state.next_vote_id;
                state.next_vote_id += 1;
                let fingerprint = self.fingerprinter.fingerprint(voter_id, candidate_id, now);
                slot.insert(id);
                state.votes.push(Vote {
                    id,
                    voter_id: voter_id.to_string(),
                    candidate_id,
                    election_id,
                    cast_at: now,
                    fingerprint: fingerprint.clone(),
                });
                state.version += 1;
                info!("Vote {id} appended for election {election_id} (version {})",
                    state.version);
                Ok(VoteReceipt {
                    vote_id: id,
                    fingerprint,
                })
            }
        }
    }

    /// A consistent snapshot of one election's votes and the ledger
    /// version it corresponds to.
    pub fn snapshot(&self, election_id: ElectionId) -> (Vec<Vote>, u64) {
        let state = self.state.lock().expect("poisoned lock");
        let votes = state
            .votes
            .iter()
            .filter(|vote| vote.election_id == election_id)
            .cloned()
            .collect();
        (votes, state.version)
    }

    /// Number of votes cast in one election.
    pub fn count_for(&self, election_id: ElectionId) -> u64 {
        let state = self.state.lock().expect("poisoned lock");
        state
            .votes
            .iter()
            .filter(|vote| vote.election_id == election_id)
            .count() as u64
    }

    /// Has this voter already voted in this election?
    pub fn has_voted(&self, voter_id: &str, election_id: ElectionId) -> bool {
        self.state
            .lock()
            .expect("poisoned lock")
            .by_voter
            .contains_key(&(voter_id.to_string(), election_id))
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use chrono::Duration;

    use crate::model::{candidate::CandidateSpec, election::ElectionSpec};

    use super::*;

    struct Fixture {
        elections: Arc<ElectionRegistry>,
        candidates: Arc<CandidateRegistry>,
        ledger: Arc<VoteLedger>,
        election_id: ElectionId,
        candidate_ids: Vec<CandidateId>,
    }

    /// An in-progress election with candidates numbered 10 and 20.
    fn in_progress_fixture() -> Fixture {
        let elections = Arc::new(ElectionRegistry::new());
        let candidates = Arc::new(CandidateRegistry::new(Arc::clone(&elections)));
        let ledger = Arc::new(VoteLedger::new(
            Arc::clone(&elections),
            Arc::clone(&candidates),
            Fingerprinter::new(b"test-key"),
        ));

        let election = elections
            .create(ElectionSpec::current_example(), "admin1", Utc::now())
            .unwrap();
        let candidate_ids = [10, 20]
            .into_iter()
            .map(|number| {
                candidates
                    .register(election.id, CandidateSpec::example(number))
                    .unwrap()
                    .id
            })
            .collect();
        elections
            .transition(election.id, ElectionStatus::Open, Utc::now(), 2, false)
            .unwrap();
        elections
            .transition(election.id, ElectionStatus::InProgress, Utc::now(), 2, false)
            .unwrap();

        Fixture {
            elections,
            candidates,
            ledger,
            election_id: election.id,
            candidate_ids,
        }
    }

    #[test]
    fn a_vote_yields_a_receipt_with_a_fingerprint() {
        let fix = in_progress_fixture();
        let receipt = fix
            .ledger
            .cast_vote("v1", fix.candidate_ids[0], fix.election_id, Utc::now())
            .unwrap();
        assert!(!receipt.fingerprint.is_empty());
        assert!(fix.ledger.has_voted("v1", fix.election_id));
        assert_eq!(fix.ledger.count_for(fix.election_id), 1);
    }

    #[test]
    fn a_second_vote_is_a_duplicate_even_for_another_candidate() {
        let fix = in_progress_fixture();
        fix.ledger
            .cast_vote("v1", fix.candidate_ids[0], fix.election_id, Utc::now())
            .unwrap();
        let err = fix
            .ledger
            .cast_vote("v1", fix.candidate_ids[1], fix.election_id, Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateVote { .. }));
        assert_eq!(fix.ledger.count_for(fix.election_id), 1);
    }

    #[test]
    fn unknown_references_are_not_found() {
        let fix = in_progress_fixture();
        assert!(matches!(
            fix.ledger
                .cast_vote("v1", fix.candidate_ids[0], 99, Utc::now()),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            fix.ledger.cast_vote("v1", 999, fix.election_id, Utc::now()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn a_candidate_from_another_election_is_not_found() {
        let fix = in_progress_fixture();
        let other = fix
            .elections
            .create(ElectionSpec::current_example(), "admin1", Utc::now())
            .unwrap();
        let foreign = fix
            .candidates
            .register(other.id, CandidateSpec::example(10))
            .unwrap();
        assert!(matches!(
            fix.ledger
                .cast_vote("v1", foreign.id, fix.election_id, Utc::now()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn votes_only_land_while_in_progress() {
        let elections = Arc::new(ElectionRegistry::new());
        let candidates = Arc::new(CandidateRegistry::new(Arc::clone(&elections)));
        let ledger = VoteLedger::new(
            Arc::clone(&elections),
            Arc::clone(&candidates),
            Fingerprinter::new(b"test-key"),
        );
        let election = elections
            .create(ElectionSpec::current_example(), "admin1", Utc::now())
            .unwrap();
        let candidate = candidates
            .register(election.id, CandidateSpec::example(10))
            .unwrap();

        // Draft election, valid candidate: the state gate still applies.
        assert!(matches!(
            ledger.cast_vote("v1", candidate.id, election.id, Utc::now()),
            Err(Error::ElectionState(_))
        ));
        assert_eq!(ledger.count_for(election.id), 0);
    }

    #[test]
    fn votes_outside_the_window_are_rejected() {
        let fix = in_progress_fixture();
        let election = fix.elections.get(fix.election_id).unwrap();
        assert!(matches!(
            fix.ledger.cast_vote(
                "v1",
                fix.candidate_ids[0],
                fix.election_id,
                election.start_time - Duration::minutes(1),
            ),
            Err(Error::ElectionState(_))
        ));
        assert!(matches!(
            fix.ledger.cast_vote(
                "v1",
                fix.candidate_ids[0],
                fix.election_id,
                election.end_time + Duration::minutes(1),
            ),
            Err(Error::ElectionState(_))
        ));
    }

    #[test]
    fn snapshot_is_scoped_and_versioned() {
        let fix = in_progress_fixture();
        fix.ledger
            .cast_vote("v1", fix.candidate_ids[0], fix.election_id, Utc::now())
            .unwrap();
        fix.ledger
            .cast_vote("v2", fix.candidate_ids[1], fix.election_id, Utc::now())
            .unwrap();
        let (votes, version) = fix.ledger.snapshot(fix.election_id);
        assert_eq!(votes.len(), 2);
        assert_eq!(version, 2);
        assert!(votes.iter().all(|v| v.election_id == fix.election_id));
    }

    #[test]
    fn concurrent_duplicates_admit_exactly_one_vote() {
        let fix = in_progress_fixture();
        let threads = 100;

        let mut handles = Vec::with_capacity(threads);
        for i in 0..threads {
            let ledger = Arc::clone(&fix.ledger);
            let candidate_id = fix.candidate_ids[i % fix.candidate_ids.len()];
            let election_id = fix.election_id;
            handles.push(thread::spawn(move || {
                ledger.cast_vote("racer", candidate_id, election_id, Utc::now())
            }));
        }

        let mut successes = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(receipt) => {
                    assert!(!receipt.fingerprint.is_empty());
                    successes += 1;
                }
                Err(Error::DuplicateVote { .. }) => duplicates += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(duplicates, threads - 1);
        assert_eq!(fix.ledger.count_for(fix.election_id), 1);
    }

    #[test]
    fn distinct_voters_all_succeed_concurrently() {
        let fix = in_progress_fixture();
        let threads = 50;

        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let ledger = Arc::clone(&fix.ledger);
                let candidate_id = fix.candidate_ids[i % fix.candidate_ids.len()];
                let election_id = fix.election_id;
                thread::spawn(move || {
                    ledger.cast_vote(&format!("voter{i}"), candidate_id, election_id, Utc::now())
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(fix.ledger.count_for(fix.election_id), threads as u64);
    }
}
