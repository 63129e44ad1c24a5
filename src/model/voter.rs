use serde::{Deserialize, Serialize};

/// Roles a user of the system can hold. Only `Voter` may cast ballots;
/// `Commission` members observe results; `Admin` runs elections.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Commission,
    Voter,
}

/// A voter as supplied by the external identity provider. The core never
/// mutates these; the roster is replaced wholesale on sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    /// Identity-provider subject ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Role; only `voter` entries count towards turnout.
    pub role: Role,
    /// Inactive voters may not cast ballots.
    pub active: bool,
}

/// Marker for administrators. Admin accounts live entirely in the identity
/// provider; the core only ever sees their auth tokens.
#[derive(Debug, Copy, Clone)]
pub struct Admin;
