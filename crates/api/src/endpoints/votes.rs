//! Vote endpoints.

use axum::{Json, Router, extract::State, routing::get};
use novelhub_common::AppResult;
use novelhub_core::{
    VoteInput, VoteLookup,
    vote::{MyVote, VoteOutcome},
};

use crate::{
    extractors::{ApiJson, ApiQuery, AuthUser},
    middleware::AppState,
};

/// Like or dislike a novel or chapter. Repeating the same vote withdraws it.
async fn vote(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<VoteInput>,
) -> AppResult<Json<VoteOutcome>> {
    let outcome = state.vote_service.vote(&ctx, input).await?;
    Ok(Json(outcome))
}

async fn my_vote(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
    ApiQuery(lookup): ApiQuery<VoteLookup>,
) -> AppResult<Json<MyVote>> {
    let mine = state.vote_service.my_vote(&ctx, lookup).await?;
    Ok(Json(mine))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/votes", get(my_vote).post(vote))
}
