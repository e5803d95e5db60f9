//! Admin console endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use novelhub_common::AppResult;
use novelhub_core::{
    AdminNovelQuery, AdminUserQuery, SetRoleInput,
    admin::{AdminNovelPage, AdminStats, AdminUserPage},
    user::ProfileView,
};

use crate::{
    extractors::{ApiJson, ApiQuery, AuthUser},
    middleware::AppState,
    response::{Message, message},
};

async fn stats(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<AdminStats>> {
    let stats = state.admin_service.stats(&ctx).await?;
    Ok(Json(stats))
}

async fn users(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AdminUserQuery>,
) -> AppResult<Json<AdminUserPage>> {
    let page = state.admin_service.list_users(&ctx, query).await?;
    Ok(Json(page))
}

async fn set_role(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<SetRoleInput>,
) -> AppResult<Json<ProfileView>> {
    let user = state.admin_service.set_role(&ctx, &id, input).await?;
    Ok(Json(user))
}

async fn delete_user(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Message>> {
    state.admin_service.delete_user(&ctx, &id).await?;
    Ok(message("User deleted"))
}

async fn novels(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AdminNovelQuery>,
) -> AppResult<Json<AdminNovelPage>> {
    let page = state.admin_service.list_novels(&ctx, query).await?;
    Ok(Json(page))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(stats))
        .route("/admin/users", get(users))
        .route("/admin/users/{id}", put(set_role).delete(delete_user))
        .route("/admin/novels", get(novels))
}
