use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::election::{Election, ElectionId, ElectionSpec, ElectionStatus};

/// Owns all election records and drives the lifecycle state machine.
/// Mutations are administrative and low-frequency; a single `RwLock`
/// serializes them.
pub struct ElectionRegistry {
    elections: RwLock<HashMap<ElectionId, Election>>,
    next_id: AtomicU32,
}

impl ElectionRegistry {
    pub fn new() -> Self {
        Self {
            elections: RwLock::new(HashMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    /// Validate the spec and create a new election in `Draft`.
    pub fn create(
        &self,
        spec: ElectionSpec,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Election> {
        spec.validate()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let election = Election::from_spec(id, spec, created_by, now);
        self.elections
            .write()
            .expect("poisoned lock")
            .insert(id, election.clone());
        info!("Created election {id} ({})", election.title);
        Ok(election)
    }

    /// Get a snapshot of one election.
    pub fn get(&self, id: ElectionId) -> Result<Election> {
        self.elections
            .read()
            .expect("poisoned lock")
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Election {id}")))
    }

    /// All elections, newest first.
    pub fn list(&self) -> Vec<Election> {
        let mut elections: Vec<Election> = self
            .elections
            .read()
            .expect("poisoned lock")
            .values()
            .cloned()
            .collect();
        elections.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        elections
    }

    /// Move an election to `target` if it is the single allowed successor
    /// and its guard is satisfied, and return the updated record. The
    /// status is untouched on failure.
    pub fn transition(
        &self,
        id: ElectionId,
        target: ElectionStatus,
        now: DateTime<Utc>,
        candidate_count: usize,
        force: bool,
    ) -> Result<Election> {
        let mut elections = self.elections.write().expect("poisoned lock");
        let election = elections
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("Election {id}")))?;
        election.check_transition(target, now, candidate_count, force)?;
        election.status = target;
        info!("Election {id} is now {target:?}");
        Ok(election.clone())
    }
}
