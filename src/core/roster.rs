use std::collections::HashMap;
use std::sync::RwLock;

use crate::model::voter::{Role, Voter};

/// Read-only reference copy of the identity provider's voter data. The
/// core never registers or edits voters; the provider replaces the roster
/// wholesale on sync.
pub struct VoterRoster {
    voters: RwLock<HashMap<String, Voter>>,
}

impl VoterRoster {
    pub fn new() -> Self {
        Self {
            voters: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the whole roster with a fresh copy from the provider.
    pub fn replace(&self, voters: Vec<Voter>) {
        let mut map = self.voters.write().expect("poisoned lock");
        map.clear();
        map.extend(voters.into_iter().map(|voter| (voter.id.clone(), voter)));
        info!("Voter roster replaced; {} entries", map.len());
    }

    pub fn get(&self, id: &str) -> Option<Voter> {
        self.voters.read().expect("poisoned lock").get(id).cloned()
    }

    /// How many people could vote: active entries with the voter role.
    /// The turnout denominator.
    pub fn eligible_count(&self) -> u64 {
        self.voters
            .read()
            .expect("poisoned lock")
            .values()
            .filter(|voter| voter.active && voter.role == Role::Voter)
            .count() as u64
    }
}
