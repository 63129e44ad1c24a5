use chrono::Utc;
use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::core::Core;
use crate::error::Result;
use crate::model::{
    auth::AuthToken,
    candidate::{Candidate, CandidateSpec},
    election::{Election, ElectionId, ElectionSpec, ElectionStatus},
    voter::{Admin, Voter},
};

pub fn routes() -> Vec<Route> {
    routes![
        create_election,
        change_status,
        register_candidate,
        replace_voters,
    ]
}

#[post("/elections", data = "<spec>", format = "json")]
pub(crate) async fn create_election(
    token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    core: &State<Core>,
) -> Result<Json<Election>> {
    let election = core.elections.create(spec.0, token.subject(), Utc::now())?;
    Ok(Json(election))
}

/// A requested lifecycle transition. `force` is the administrative
/// override for closing an election before its end time.
#[derive(Debug, Serialize, Deserialize)]
struct StatusChange {
    target: ElectionStatus,
    #[serde(default)]
    force: bool,
}

#[post("/elections/<election_id>/status", data = "<change>", format = "json")]
pub(crate) async fn change_status(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    change: Json<StatusChange>,
    core: &State<Core>,
) -> Result<Json<Election>> {
    let change = change.0;
    let election = core.transition_election(election_id, change.target, Utc::now(), change.force)?;
    Ok(Json(election))
}

#[post("/elections/<election_id>/candidates", data = "<spec>", format = "json")]
pub(crate) async fn register_candidate(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    spec: Json<CandidateSpec>,
    core: &State<Core>,
) -> Result<Json<Candidate>> {
    let candidate = core.candidates.register(election_id, spec.0)?;
    Ok(Json(candidate))
}

/// Identity-provider sync: replace the voter roster wholesale.
#[put("/voters", data = "<voters>", format = "json")]
pub(crate) async fn replace_voters(
    _token: AuthToken<Admin>,
    voters: Json<Vec<Voter>>,
    core: &State<Core>,
) -> Result<()> {
    core.roster.replace(voters.0);
    Ok(())
}
