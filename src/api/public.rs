use std::sync::Arc;

use rocket::{
    response::stream::{Event, EventStream},
    serde::json::Json,
    Route, State,
};

use crate::core::{Core, SubscriptionGuard};
use crate::error::Result;
use crate::model::{
    candidate::Candidate,
    election::{Election, ElectionId},
    tally::TallySnapshot,
};

pub fn routes() -> Vec<Route> {
    routes![get_elections, get_election, get_candidates, get_tally, live_tally]
}

#[get("/elections")]
async fn get_elections(core: &State<Core>) -> Json<Vec<Election>> {
    Json(core.elections.list())
}

#[get("/elections/<election_id>")]
async fn get_election(election_id: ElectionId, core: &State<Core>) -> Result<Json<Election>> {
    Ok(Json(core.elections.get(election_id)?))
}

#[get("/elections/<election_id>/candidates")]
async fn get_candidates(
    election_id: ElectionId,
    core: &State<Core>,
) -> Result<Json<Vec<Candidate>>> {
    Ok(Json(core.candidates.list(election_id)?))
}

#[get("/elections/<election_id>/tally")]
pub(crate) async fn get_tally(
    election_id: ElectionId,
    core: &State<Core>,
) -> Result<Json<TallySnapshot>> {
    Ok(Json(core.tally.compute(election_id)?))
}

/// Server-sent stream of tally snapshots: the current standing
/// immediately, then one event per recomputation. Dropping the connection
/// cancels the subscription.
#[get("/elections/<election_id>/tally/live")]
async fn live_tally(election_id: ElectionId, core: &State<Core>) -> Result<EventStream![]> {
    let initial = core.tally.compute(election_id)?;
    let (id, mut rx) = core.broadcaster.subscribe(election_id);
    let guard = SubscriptionGuard::new(Arc::clone(&core.broadcaster), id);

    Ok(EventStream! {
        let _guard = guard;
        yield Event::json(&initial);
        while let Some(snapshot) = rx.recv().await {
            yield Event::json(&snapshot);
        }
    })
}
