use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rocket::tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::model::{election::ElectionId, tally::TallySnapshot};

pub type SubscriptionId = u64;

struct Subscription {
    election_id: ElectionId,
    sender: UnboundedSender<TallySnapshot>,
}

/// Fans freshly-computed tally snapshots out to subscribed observers.
///
/// Each subscriber gets its own unbounded channel, so a slow or dead
/// subscriber can neither block the others nor touch the ledger. Delivery
/// to one subscriber follows the order snapshots were computed in
/// (their ledger versions increase); no order is promised across
/// subscribers.
pub struct TallyBroadcaster {
    subscriptions: Mutex<HashMap<SubscriptionId, Subscription>>,
    next_id: AtomicU64,
    /// Signals the tally worker that an election's ledger changed.
    events: UnboundedSender<ElectionId>,
}

impl TallyBroadcaster {
    /// Create the broadcaster and the event receiver its tally worker
    /// should consume.
    pub fn new() -> (Self, UnboundedReceiver<ElectionId>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                subscriptions: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                events,
            },
            receiver,
        )
    }

    /// Note that a vote landed in the given election. Non-blocking; the
    /// worker recomputes and publishes asynchronously. A missing worker
    /// (e.g. in unit tests) just means no deliveries.
    pub fn ledger_changed(&self, election_id: ElectionId) {
        let _ = self.events.send(election_id);
    }

    /// Register an observer for one election's tallies. Returns the
    /// subscription ID and the channel snapshots will arrive on.
    pub fn subscribe(
        &self,
        election_id: ElectionId,
    ) -> (SubscriptionId, UnboundedReceiver<TallySnapshot>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscriptions
            .lock()
            .expect("poisoned lock")
            .insert(
                id,
                Subscription {
                    election_id,
                    sender,
                },
            );
        debug!("Subscription {id} opened for election {election_id}");
        (id, receiver)
    }

    /// Drop a subscription. Safe to call at any time, including for IDs
    /// that are already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if self
            .subscriptions
            .lock()
            .expect("poisoned lock")
            .remove(&id)
            .is_some()
        {
            debug!("Subscription {id} closed");
        }
    }

    /// Deliver a snapshot to every subscriber of its election. Subscribers
    /// whose receiving end is gone are pruned; the rest still get theirs.
    pub fn publish(&self, snapshot: TallySnapshot) {
        let mut subscriptions = self.subscriptions.lock().expect("poisoned lock");
        let mut dead = Vec::new();
        for (&id, subscription) in subscriptions.iter() {
            if subscription.election_id != snapshot.election_id {
                continue;
            }
            if subscription.sender.send(snapshot.clone()).is_err() {
                dead.push(id);
            }
        }
        for id in dead {
            subscriptions.remove(&id);
            debug!("Subscription {id} dropped its receiver; pruned");
        }
    }

    /// Number of live subscriptions (for tests and diagnostics).
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().expect("poisoned lock").len()
    }
}

/// Unsubscribes when dropped. Tied to the lifetime of an SSE connection
/// so a disconnecting observer is cleaned up by the next delivery at the
/// latest.
pub struct SubscriptionGuard {
    broadcaster: Arc<TallyBroadcaster>,
    id: SubscriptionId,
}

impl SubscriptionGuard {
    pub fn new(broadcaster: Arc<TallyBroadcaster>, id: SubscriptionId) -> Self {
        Self { broadcaster, id }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(self.id);
    }
}
