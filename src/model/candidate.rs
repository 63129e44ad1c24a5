use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::election::ElectionId;

/// Our candidate IDs are integers.
pub type CandidateId = u32;

/// A candidate standing in one election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique ID.
    pub id: CandidateId,
    /// The election this candidate stands in.
    pub election_id: ElectionId,
    /// Ballot number, unique within the election.
    pub number: u32,
    /// Candidate name.
    pub name: String,
    /// The position being contested.
    pub position: String,
    /// Party or slate, if any.
    pub party: Option<String>,
    /// Free-form description / proposals.
    pub description: Option<String>,
    /// Reference to a photo, resolved by the presentation layer.
    pub photo_url: Option<String>,
}

/// A candidate specification, as submitted by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub number: u32,
    pub name: String,
    pub position: String,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl CandidateSpec {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("candidate name must not be empty".into()));
        }
        if self.position.trim().is_empty() {
            return Err(Error::Validation(
                "candidate position must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Attach the registry-assigned IDs to form a full record.
    pub fn into_candidate(self, id: CandidateId, election_id: ElectionId) -> Candidate {
        Candidate {
            id,
            election_id,
            number: self.number,
            name: self.name,
            position: self.position,
            party: self.party,
            description: self.description,
            photo_url: self.photo_url,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CandidateSpec {
        pub fn example(number: u32) -> Self {
            Self {
                number,
                name: format!("Candidate {number}"),
                position: "Representative".to_string(),
                party: None,
                description: None,
                photo_url: None,
            }
        }
    }
}
