//! Comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{post, put},
};
use novelhub_common::AppResult;
use novelhub_core::{CreateCommentInput, UpdateCommentInput, views::CommentView};

use crate::{
    extractors::{ApiJson, AuthUser},
    middleware::AppState,
    response::{Created, Message, message},
};

async fn create(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateCommentInput>,
) -> AppResult<Created<CommentView>> {
    let comment = state.comment_service.create(&ctx, input).await?;
    Ok(Created(comment))
}

async fn update(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateCommentInput>,
) -> AppResult<Json<CommentView>> {
    let comment = state.comment_service.update(&ctx, &id, input).await?;
    Ok(Json(comment))
}

async fn delete(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Message>> {
    state.comment_service.delete(&ctx, &id).await?;
    Ok(message("Comment deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", post(create))
        .route("/comments/{id}", put(update).delete(delete))
}
