use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::model::{candidate::CandidateId, election::ElectionId};

type HmacSha256 = Hmac<Sha256>;

/// Our vote IDs are integers, assigned in append order.
pub type VoteId = u64;

/// One immutable entry in the vote ledger. Never updated, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Unique ID.
    pub id: VoteId,
    /// Who cast it.
    pub voter_id: String,
    /// Who it was cast for.
    pub candidate_id: CandidateId,
    /// The election it belongs to.
    pub election_id: ElectionId,
    /// When it was cast.
    pub cast_at: DateTime<Utc>,
    /// Audit fingerprint. Not a capability: holding it grants nothing.
    pub fingerprint: String,
}

/// What the voter gets back after a successful cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub vote_id: VoteId,
    pub fingerprint: String,
}

/// Computes vote fingerprints with a server-side key. The exact algorithm
/// is a policy decision; everything that depends on it goes through here.
pub struct Fingerprinter {
    key: Vec<u8>,
}

impl Fingerprinter {
    pub fn new(key: &[u8]) -> Self {
        Self { key: key.to_vec() }
    }

    /// Deterministic fingerprint over the identifying fields of a vote.
    pub fn fingerprint(
        &self,
        voter_id: &str,
        candidate_id: CandidateId,
        cast_at: DateTime<Utc>,
    ) -> String {
        let mut hmac = HmacSha256::new_from_slice(&self.key)
            .expect("HMAC can take a key of any size");
        hmac.update(
            format!("{voter_id}:{candidate_id}:{}", cast_at.timestamp_millis()).as_bytes(),
        );
        HEXLOWER.encode(&hmac.finalize().into_bytes())
    }
}
