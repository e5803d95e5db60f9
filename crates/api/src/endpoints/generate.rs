//! AI writing endpoint.

use axum::{Json, Router, extract::State, routing::post};
use novelhub_common::AppResult;
use novelhub_core::{GenerateInput, generation::GenerateOutcome};

use crate::{
    extractors::{ApiJson, AuthUser},
    middleware::AppState,
};

/// Generate a short novel from story options and publish it.
async fn generate(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<GenerateInput>,
) -> AppResult<Json<GenerateOutcome>> {
    let outcome = state.generation_service.generate(&ctx, input).await?;
    Ok(Json(outcome))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/novels/ai-generate", post(generate))
}
