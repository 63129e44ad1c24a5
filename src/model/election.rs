use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Our election IDs are integers.
pub type ElectionId = u32;

/// States in the Election lifecycle. The lifecycle is strictly linear:
/// each state has at most one legal successor and there is no way back.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionStatus {
    /// Under construction: metadata and candidates may still change.
    Draft,
    /// Candidate list frozen for registration purposes, waiting to start.
    Open,
    /// Votes may be cast.
    InProgress,
    /// Voting over, results being checked.
    Closed,
    /// Results final.
    Finished,
}

impl ElectionStatus {
    /// The single state this one may transition into, if any.
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Draft => Some(Self::Open),
            Self::Open => Some(Self::InProgress),
            Self::InProgress => Some(Self::Closed),
            Self::Closed => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Candidates may only be registered while the election is still
    /// being set up.
    pub fn accepts_candidates(self) -> bool {
        matches!(self, Self::Draft | Self::Open)
    }
}

/// What kind of body is holding the election.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionKind {
    Cipa,
    School,
    Condominium,
    Guild,
    Association,
}

/// A full election record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    /// Unique ID.
    pub id: ElectionId,
    /// Display title.
    pub title: String,
    /// Longer description shown on the terminal.
    pub description: String,
    /// What kind of election this is.
    pub kind: ElectionKind,
    /// Current lifecycle state.
    pub status: ElectionStatus,
    /// Start of the voting window.
    pub start_time: DateTime<Utc>,
    /// End of the voting window.
    pub end_time: DateTime<Utc>,
    /// ID of the administrator who created it.
    pub created_by: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

impl Election {
    /// Build a new draft election from a validated spec.
    pub fn from_spec(
        id: ElectionId,
        spec: ElectionSpec,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: spec.title,
            description: spec.description,
            kind: spec.kind,
            status: ElectionStatus::Draft,
            start_time: spec.start_time,
            end_time: spec.end_time,
            created_by: created_by.to_string(),
            created_at: now,
        }
    }

    /// Check whether this election may move to `target` at instant `now`,
    /// given the number of registered candidates. `force` is the explicit
    /// administrative override for closing before the end time.
    pub fn check_transition(
        &self,
        target: ElectionStatus,
        now: DateTime<Utc>,
        candidate_count: usize,
        force: bool,
    ) -> Result<()> {
        let next = self.status.successor().ok_or_else(|| {
            Error::ElectionState(format!("election {} is finished", self.id))
        })?;
        if target != next {
            return Err(Error::ElectionState(format!(
                "election {} is {:?}; the only allowed transition is to {:?}",
                self.id, self.status, next
            )));
        }
        match target {
            ElectionStatus::Open if candidate_count == 0 => Err(Error::ElectionState(format!(
                "election {} has no registered candidates",
                self.id
            ))),
            ElectionStatus::InProgress if now < self.start_time => {
                Err(Error::ElectionState(format!(
                    "election {} does not start until {}",
                    self.id, self.start_time
                )))
            }
            ElectionStatus::Closed if now < self.end_time && !force => {
                Err(Error::ElectionState(format!(
                    "election {} does not end until {}; pass force to close early",
                    self.id, self.end_time
                )))
            }
            _ => Ok(()),
        }
    }
}

/// An election specification, as submitted by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    /// Display title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// What kind of election this is.
    pub kind: ElectionKind,
    /// Start of the voting window.
    pub start_time: DateTime<Utc>,
    /// End of the voting window.
    pub end_time: DateTime<Utc>,
}

impl ElectionSpec {
    /// Reject specs that could never form a valid election.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("election title must not be empty".into()));
        }
        if self.start_time >= self.end_time {
            return Err(Error::Validation(format!(
                "start time {} must be before end time {}",
                self.start_time, self.end_time
            )));
        }
        Ok(())
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use chrono::Duration;

    use super::*;

    impl ElectionSpec {
        /// An election whose voting window covers the present.
        pub fn current_example() -> Self {
            Self {
                title: "CIPA 2024".to_string(),
                description: "Internal accident-prevention commission".to_string(),
                kind: ElectionKind::Cipa,
                start_time: Utc::now() - Duration::hours(1),
                end_time: Utc::now() + Duration::days(7),
            }
        }

        /// An election that has not started yet.
        pub fn future_example() -> Self {
            Self {
                title: "Guild board 2025".to_string(),
                description: "Annual guild board election".to_string(),
                kind: ElectionKind::Guild,
                start_time: Utc::now() + Duration::days(30),
                end_time: Utc::now() + Duration::days(37),
            }
        }
    }
}
