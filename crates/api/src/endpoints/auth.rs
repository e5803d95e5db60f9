//! Authentication endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use novelhub_common::AppResult;
use novelhub_core::{
    RegisterInput, SignInInput,
    user::{ProfileView, RegisteredUser, SessionView},
};

use crate::{
    extractors::{ApiJson, AuthUser},
    middleware::AppState,
    response::{Created, Message, message},
};

/// Create a new account.
async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> AppResult<Created<RegisteredUser>> {
    let user = state.user_service.register(input).await?;
    Ok(Created(user))
}

/// Sign in and receive a session token.
async fn signin(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SignInInput>,
) -> AppResult<Json<SessionView>> {
    let session = state.user_service.sign_in(input).await?;
    Ok(Json(session))
}

/// Invalidate the current session token.
async fn signout(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Message>> {
    state.user_service.sign_out(&ctx).await?;
    Ok(message("Signed out"))
}

/// The signed-in user.
async fn session(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ProfileView>> {
    let user = state.user_service.get(&ctx.user_id).await?;
    Ok(Json(ProfileView::from(&user)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/signin", post(signin))
        .route("/auth/signout", post(signout))
        .route("/auth/session", get(session))
}
