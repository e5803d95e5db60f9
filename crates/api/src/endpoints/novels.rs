//! Novel endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use novelhub_common::AppResult;
use novelhub_core::{
    CreateNovelInput, ListNovelsQuery, UpdateNovelInput,
    comment::CommentThread,
    novel::{NovelDetail, NovelPage},
};
use novelhub_db::entities::novel;

use crate::{
    extractors::{ApiJson, ApiQuery, AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{Created, Message, message},
};

/// Published novels, filtered and paginated.
async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListNovelsQuery>,
) -> AppResult<Json<NovelPage>> {
    let page = state.novel_service.list(query).await?;
    Ok(Json(page))
}

async fn create(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateNovelInput>,
) -> AppResult<Created<novel::Model>> {
    let novel = state.novel_service.create(&ctx, input).await?;
    Ok(Created(novel))
}

async fn show(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<NovelDetail>> {
    let detail = state.novel_service.get_detail(viewer.as_ref(), &id).await?;
    Ok(Json(detail))
}

async fn update(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateNovelInput>,
) -> AppResult<Json<novel::Model>> {
    let novel = state.novel_service.update(&ctx, &id, input).await?;
    Ok(Json(novel))
}

async fn delete(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Message>> {
    state.novel_service.delete(&ctx, &id).await?;
    Ok(message("Novel deleted"))
}

/// Comment threads on the novel itself.
async fn comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<CommentThread>>> {
    let threads = state.comment_service.thread_for_novel(&id).await?;
    Ok(Json(threads))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/novels", get(list).post(create))
        .route("/novels/{id}", get(show).put(update).delete(delete))
        .route("/novels/{id}/comments", get(comments))
}
