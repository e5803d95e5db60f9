//! Chapter endpoints, nested under their novel.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use novelhub_common::AppResult;
use novelhub_core::{
    CreateChapterInput, UpdateChapterInput, chapter::ChapterDetail, comment::CommentThread,
    views::ChapterSummary,
};
use novelhub_db::entities::chapter;

use crate::{
    extractors::{ApiJson, AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{Created, Message, message},
};

async fn list(
    State(state): State<AppState>,
    Path(novel_id): Path<String>,
) -> AppResult<Json<Vec<ChapterSummary>>> {
    let chapters = state.chapter_service.list(&novel_id).await?;
    Ok(Json(chapters))
}

async fn create(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
    Path(novel_id): Path<String>,
    ApiJson(input): ApiJson<CreateChapterInput>,
) -> AppResult<Created<chapter::Model>> {
    let chapter = state.chapter_service.create(&ctx, &novel_id, input).await?;
    Ok(Created(chapter))
}

async fn show(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path((novel_id, chapter_id)): Path<(String, String)>,
) -> AppResult<Json<ChapterDetail>> {
    let detail = state
        .chapter_service
        .get(viewer.as_ref(), &novel_id, &chapter_id)
        .await?;
    Ok(Json(detail))
}

async fn update(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
    Path((novel_id, chapter_id)): Path<(String, String)>,
    ApiJson(input): ApiJson<UpdateChapterInput>,
) -> AppResult<Json<chapter::Model>> {
    let chapter = state
        .chapter_service
        .update(&ctx, &novel_id, &chapter_id, input)
        .await?;
    Ok(Json(chapter))
}

async fn delete(
    AuthUser(ctx): AuthUser,
    State(state): State<AppState>,
    Path((novel_id, chapter_id)): Path<(String, String)>,
) -> AppResult<Json<Message>> {
    state
        .chapter_service
        .delete(&ctx, &novel_id, &chapter_id)
        .await?;
    Ok(message("Chapter deleted"))
}

async fn comments(
    State(state): State<AppState>,
    Path((novel_id, chapter_id)): Path<(String, String)>,
) -> AppResult<Json<Vec<CommentThread>>> {
    let threads = state
        .comment_service
        .thread_for_chapter(&novel_id, &chapter_id)
        .await?;
    Ok(Json(threads))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/novels/{id}/chapters", get(list).post(create))
        .route(
            "/novels/{id}/chapters/{chapter_id}",
            get(show).put(update).delete(delete),
        )
        .route(
            "/novels/{id}/chapters/{chapter_id}/comments",
            get(comments),
        )
}
