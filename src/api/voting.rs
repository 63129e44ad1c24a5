use chrono::Utc;
use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::core::Core;
use crate::error::{Error, Result};
use crate::model::{
    auth::AuthToken,
    candidate::CandidateId,
    election::ElectionId,
    vote::VoteReceipt,
    voter::{Role, Voter},
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, my_vote]
}

/// A ballot the voter wishes to cast.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
struct BallotSpec {
    pub candidate_id: CandidateId,
}

#[post("/elections/<election_id>/votes", data = "<ballot>", format = "json")]
pub(crate) async fn cast_vote(
    token: AuthToken<Voter>,
    election_id: ElectionId,
    ballot: Json<BallotSpec>,
    core: &State<Core>,
) -> Result<Json<VoteReceipt>> {
    let voter = active_voter(&token, core)?;
    let receipt = core.cast_vote(&voter.id, ballot.candidate_id, election_id, Utc::now())?;
    info!("Voter {} cast vote {} in election {election_id}", voter.id, receipt.vote_id);
    Ok(Json(receipt))
}

/// Whether the calling voter has already voted in this election. Lets the
/// terminal show the "already voted" screen instead of the ballot.
#[get("/elections/<election_id>/votes/mine")]
pub(crate) async fn my_vote(
    token: AuthToken<Voter>,
    election_id: ElectionId,
    core: &State<Core>,
) -> Result<Json<bool>> {
    let voter = active_voter(&token, core)?;
    core.elections.get(election_id)?;
    Ok(Json(core.ledger.has_voted(&voter.id, election_id)))
}

/// The token only proves identity; eligibility comes from the roster.
fn active_voter(token: &AuthToken<Voter>, core: &Core) -> Result<Voter> {
    let voter = core.roster.get(token.subject()).ok_or_else(|| {
        Error::Permission(format!(
            "subject {} is not on the voter roster",
            token.subject()
        ))
    })?;
    if voter.role != Role::Voter {
        return Err(Error::Permission(format!(
            "{} does not hold the voter role",
            voter.id
        )));
    }
    if !voter.active {
        return Err(Error::Permission(format!("voter {} is inactive", voter.id)));
    }
    Ok(voter)
}

#[cfg(test)]
mod tests {
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;

    use crate::model::{
        candidate::{Candidate, CandidateSpec},
        election::{Election, ElectionSpec},
    };
    use crate::testing::{admin_cookie, client, voter_cookie};

    use super::*;

    /// Drive an election to in-progress with candidates 10 and 20 and a
    /// three-voter roster, all through the API.
    async fn in_progress_election(client: &Client) -> (Election, Vec<Candidate>) {
        let cookie = admin_cookie(client);

        let response = client
            .post(uri!(crate::api::admin::create_election))
            .cookie(cookie.clone())
            .header(ContentType::JSON)
            .body(serde_json::to_string(&ElectionSpec::current_example()).unwrap())
            .dispatch()
            .await;
        let election: Election =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();

        let mut candidates = Vec::new();
        for number in [10, 20] {
            let response = client
                .post(uri!(crate::api::admin::register_candidate(election.id)))
                .cookie(cookie.clone())
                .header(ContentType::JSON)
                .body(serde_json::to_string(&CandidateSpec::example(number)).unwrap())
                .dispatch()
                .await;
            candidates
                .push(serde_json::from_str(&response.into_string().await.unwrap()).unwrap());
        }

        for target in ["open", "in_progress"] {
            let response = client
                .post(uri!(crate::api::admin::change_status(election.id)))
                .cookie(cookie.clone())
                .header(ContentType::JSON)
                .body(format!(r#"{{"target":"{target}"}}"#))
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::Ok);
        }

        let roster = vec![
            Voter::example("v1"),
            Voter::example("v2"),
            Voter::example("v3"),
        ];
        let response = client
            .put(uri!(crate::api::admin::replace_voters))
            .cookie(cookie)
            .header(ContentType::JSON)
            .body(serde_json::to_string(&roster).unwrap())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        (election, candidates)
    }

    async fn cast(
        client: &Client,
        voter: &str,
        election_id: ElectionId,
        candidate_id: CandidateId,
    ) -> Status {
        client
            .post(uri!(cast_vote(election_id)))
            .cookie(voter_cookie(client, voter))
            .header(ContentType::JSON)
            .body(format!(r#"{{"candidate_id":{candidate_id}}}"#))
            .dispatch()
            .await
            .status()
    }

    #[rocket::async_test]
    async fn a_vote_returns_a_receipt_and_flips_the_voted_flag() {
        let client = client().await;
        let (election, candidates) = in_progress_election(&client).await;

        let response = client
            .post(uri!(cast_vote(election.id)))
            .cookie(voter_cookie(&client, "v1"))
            .header(ContentType::JSON)
            .body(format!(r#"{{"candidate_id":{}}}"#, candidates[0].id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let receipt: VoteReceipt =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(!receipt.fingerprint.is_empty());

        let response = client
            .get(uri!(my_vote(election.id)))
            .cookie(voter_cookie(&client, "v1"))
            .dispatch()
            .await;
        let voted: bool = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(voted);
    }

    #[rocket::async_test]
    async fn voting_twice_conflicts_even_for_another_candidate() {
        let client = client().await;
        let (election, candidates) = in_progress_election(&client).await;

        assert_eq!(
            cast(&client, "v1", election.id, candidates[0].id).await,
            Status::Ok
        );
        assert_eq!(
            cast(&client, "v1", election.id, candidates[1].id).await,
            Status::Conflict
        );
    }

    #[rocket::async_test]
    async fn strangers_and_admin_tokens_may_not_vote() {
        let client = client().await;
        let (election, candidates) = in_progress_election(&client).await;

        // Valid voter token, but not on the roster.
        assert_eq!(
            cast(&client, "intruder", election.id, candidates[0].id).await,
            Status::Forbidden
        );

        // Admin token on a voter route.
        let response = client
            .post(uri!(cast_vote(election.id)))
            .cookie(admin_cookie(&client))
            .header(ContentType::JSON)
            .body(format!(r#"{{"candidate_id":{}}}"#, candidates[0].id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn drafts_accept_no_votes() {
        let client = client().await;
        let cookie = admin_cookie(&client);

        let response = client
            .post(uri!(crate::api::admin::create_election))
            .cookie(cookie.clone())
            .header(ContentType::JSON)
            .body(serde_json::to_string(&ElectionSpec::current_example()).unwrap())
            .dispatch()
            .await;
        let election: Election =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        let response = client
            .post(uri!(crate::api::admin::register_candidate(election.id)))
            .cookie(cookie.clone())
            .header(ContentType::JSON)
            .body(serde_json::to_string(&CandidateSpec::example(10)).unwrap())
            .dispatch()
            .await;
        let candidate: Candidate =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        let response = client
            .put(uri!(crate::api::admin::replace_voters))
            .cookie(cookie)
            .header(ContentType::JSON)
            .body(serde_json::to_string(&vec![Voter::example("v1")]).unwrap())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        assert_eq!(
            cast(&client, "v1", election.id, candidate.id).await,
            Status::UnprocessableEntity
        );
    }

    #[rocket::async_test]
    async fn unknown_candidate_is_not_found() {
        let client = client().await;
        let (election, _) = in_progress_election(&client).await;
        assert_eq!(
            cast(&client, "v1", election.id, 9999).await,
            Status::NotFound
        );
    }
}
