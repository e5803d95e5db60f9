//! API middleware and shared state.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use novelhub_core::{
    AdminService, AuthContext, ChapterService, CommentService, CompletionClient,
    GenerationService, NovelService, UserService, VoteService,
};
use novelhub_db::repositories::{
    ChapterRepository, CommentRepository, NovelRepository, UserRepository, VoteRepository,
};
use sea_orm::DatabaseConnection;
use tracing::debug;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub novel_service: NovelService,
    pub chapter_service: ChapterService,
    pub comment_service: CommentService,
    pub vote_service: VoteService,
    pub admin_service: AdminService,
    pub generation_service: GenerationService,
}

impl AppState {
    /// Wire every service to one connection pool.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        completion_client: Option<Arc<dyn CompletionClient>>,
    ) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let novel_repo = NovelRepository::new(Arc::clone(&db));
        let chapter_repo = ChapterRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let vote_repo = VoteRepository::new(db);

        Self {
            user_service: UserService::new(
                user_repo.clone(),
                novel_repo.clone(),
                chapter_repo.clone(),
                comment_repo.clone(),
            ),
            novel_service: NovelService::new(
                novel_repo.clone(),
                chapter_repo.clone(),
                comment_repo.clone(),
                user_repo.clone(),
            ),
            chapter_service: ChapterService::new(
                chapter_repo.clone(),
                novel_repo.clone(),
                user_repo.clone(),
            ),
            comment_service: CommentService::new(
                comment_repo.clone(),
                novel_repo.clone(),
                chapter_repo.clone(),
                user_repo.clone(),
            ),
            vote_service: VoteService::new(vote_repo),
            admin_service: AdminService::new(
                user_repo,
                novel_repo.clone(),
                chapter_repo,
                comment_repo,
            ),
            generation_service: GenerationService::new(completion_client, novel_repo),
        }
    }
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` to an [`AuthContext`] stored in the
/// request extensions. Unknown tokens leave the request anonymous.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned);

    if let Some(token) = token {
        match state.user_service.authenticate_by_token(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(AuthContext::from_user(&user));
            }
            Err(e) => debug!(error = %e, "Bearer token rejected"),
        }
    }

    next.run(req).await
}
