use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocket::tokio::{self, sync::mpsc::UnboundedReceiver, task::JoinHandle};

use crate::error::Result;
use crate::model::{
    candidate::CandidateId,
    election::{Election, ElectionId, ElectionStatus},
    vote::{Fingerprinter, VoteReceipt},
};

pub mod broadcast;
pub mod candidates;
pub mod elections;
pub mod ledger;
pub mod roster;
pub mod tally;

pub use broadcast::{SubscriptionGuard, TallyBroadcaster};
pub use candidates::CandidateRegistry;
pub use elections::ElectionRegistry;
pub use ledger::VoteLedger;
pub use roster::VoterRoster;
pub use tally::TallyEngine;

/// The voting core: registries, ledger, tally engine and broadcaster,
/// wired together by explicit handles. Constructed once at ignite and
/// placed in managed state; there are no ambient globals.
#[derive(Clone)]
pub struct Core {
    pub elections: Arc<ElectionRegistry>,
    pub candidates: Arc<CandidateRegistry>,
    pub roster: Arc<VoterRoster>,
    pub ledger: Arc<VoteLedger>,
    pub tally: Arc<TallyEngine>,
    pub broadcaster: Arc<TallyBroadcaster>,
}

impl Core {
    /// Build the component graph. The returned receiver feeds
    /// [`spawn_tally_worker`]; until a worker consumes it, casts succeed
    /// but nothing is broadcast.
    pub fn new(hmac_key: &[u8]) -> (Self, UnboundedReceiver<ElectionId>) {
        let elections = Arc::new(ElectionRegistry::new());
        let candidates = Arc::new(CandidateRegistry::new(Arc::clone(&elections)));
        let roster = Arc::new(VoterRoster::new());
        let ledger = Arc::new(VoteLedger::new(
            Arc::clone(&elections),
            Arc::clone(&candidates),
            Fingerprinter::new(hmac_key),
        ));
        let tally = Arc::new(TallyEngine::new(
            Arc::clone(&elections),
            Arc::clone(&candidates),
            Arc::clone(&ledger),
            Arc::clone(&roster),
        ));
        let (broadcaster, events) = TallyBroadcaster::new();

        (
            Self {
                elections,
                candidates,
                roster,
                ledger,
                tally,
                broadcaster: Arc::new(broadcaster),
            },
            events,
        )
    }

    /// Cast a vote and, on success, wake the tally worker. The caller
    /// never waits for recomputation or delivery.
    pub fn cast_vote(
        &self,
        voter_id: &str,
        candidate_id: CandidateId,
        election_id: ElectionId,
        now: DateTime<Utc>,
    ) -> Result<VoteReceipt> {
        let receipt = self
            .ledger
            .cast_vote(voter_id, candidate_id, election_id, now)?;
        self.broadcaster.ledger_changed(election_id);
        Ok(receipt)
    }

    /// Transition an election, supplying the candidate count the
    /// Draft→Open guard needs.
    pub fn transition_election(
        &self,
        election_id: ElectionId,
        target: ElectionStatus,
        now: DateTime<Utc>,
        force: bool,
    ) -> Result<Election> {
        let candidate_count = self.candidates.count(election_id);
        self.elections
            .transition(election_id, target, now, candidate_count, force)
    }
}

/// Run the tally loop: each ledger-change event triggers one recompute,
/// and the snapshot is fanned out to that election's subscribers. The
/// task ends when the core (and with it the event sender) is dropped.
pub fn spawn_tally_worker(
    core: Core,
    mut events: UnboundedReceiver<ElectionId>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(election_id) = events.recv().await {
            match core.tally.compute(election_id) {
                Ok(snapshot) => core.broadcaster.publish(snapshot),
                Err(err) => warn!("Could not recompute tally for election {election_id}: {err}"),
            }
        }
        debug!("Tally worker stopped");
    })
}
