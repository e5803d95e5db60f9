//! The caller's own page.

use axum::{Json, Router, extract::State, routing::get};
use novelhub_common::AppResult;
use novelhub_core::user::MyPageView;

use crate::{extractors::AuthUser, middleware::AppState};

/// Profile, counts and own novels.
async fn my_page(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<MyPageView>> {
    let page = state.user_service.my_page(&ctx).await?;
    Ok(Json(page))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/me", get(my_page))
}
