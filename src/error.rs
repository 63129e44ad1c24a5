use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use rocket::{http::Status, response::Responder};
use thiserror::Error;

use crate::model::election::ElectionId;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong inside the core or at the API boundary.
/// Every operation fails with exactly one of these; a failed operation
/// leaves no partial mutation behind.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Election state forbids this: {0}")]
    ElectionState(String),
    #[error("Voter {voter_id} has already voted in election {election_id}")]
    DuplicateVote {
        voter_id: String,
        election_id: ElectionId,
    },
    #[error("Permission denied: {0}")]
    Permission(String),
}

impl Error {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        warn!("{self}");
        Err(match self {
            Self::Validation(_) => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
            Self::ElectionState(_) => Status::UnprocessableEntity,
            Self::DuplicateVote { .. } => Status::Conflict,
            Self::Permission(_) => Status::Forbidden,
            Self::Jwt(err) => match err.into_kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
        })
    }
}
