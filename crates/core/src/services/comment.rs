//! Comment service: threaded comments on novels and chapters.
//!
//! Threads are one level deep. A reply to a reply is attached to the root
//! comment of that thread.

use std::collections::{HashMap, HashSet};

use novelhub_common::{AppError, AppResult, IdGenerator};
use novelhub_db::{
    entities::comment,
    repositories::{ChapterRepository, CommentRepository, NovelRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::services::auth::AuthContext;
use crate::services::views::{AuthorView, CommentView, index_users};

/// Input for posting a comment.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateCommentInput {
    pub content: Option<String>,
    pub novel_id: Option<String>,
    pub chapter_id: Option<String>,
    pub parent_id: Option<String>,
}

/// Input for editing a comment.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateCommentInput {
    pub content: Option<String>,
}

/// A top-level comment with its replies.
#[derive(Debug, Clone, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: CommentView,
    pub replies: Vec<CommentView>,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    novel_repo: NovelRepository,
    chapter_repo: ChapterRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        novel_repo: NovelRepository,
        chapter_repo: ChapterRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            comment_repo,
            novel_repo,
            chapter_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Post a comment on a novel or chapter, optionally as a reply.
    pub async fn create(
        &self,
        ctx: &AuthContext,
        input: CreateCommentInput,
    ) -> AppResult<CommentView> {
        let content = required_content(input.content)?;
        let novel_id = input.novel_id.filter(|id| !id.is_empty());
        let chapter_id = input.chapter_id.filter(|id| !id.is_empty());

        let (novel_id, chapter_id) = match (novel_id, chapter_id) {
            (None, None) => {
                return Err(AppError::BadRequest(
                    "Either novelId or chapterId is required".to_string(),
                ));
            }
            (novel_id, Some(chapter_id)) => {
                let chapter = self.chapter_repo.get_by_id(&chapter_id).await?;
                if novel_id.as_deref().is_some_and(|id| id != chapter.novel_id) {
                    return Err(AppError::BadRequest(
                        "Chapter does not belong to this novel".to_string(),
                    ));
                }
                (chapter.novel_id, Some(chapter.id))
            }
            (Some(novel_id), None) => {
                let novel = self.novel_repo.get_by_id(&novel_id).await?;
                (novel.id, None)
            }
        };

        let parent_id = match input.parent_id.filter(|id| !id.is_empty()) {
            Some(parent_id) => {
                let parent = self.comment_repo.get_by_id(&parent_id).await?;
                let same_target = parent.novel_id.as_deref() == Some(novel_id.as_str())
                    && parent.chapter_id == chapter_id;
                if !same_target {
                    return Err(AppError::BadRequest(
                        "Parent comment belongs to a different target".to_string(),
                    ));
                }
                Some(parent.parent_id.unwrap_or(parent.id))
            }
            None => None,
        };

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            content: Set(content),
            author_id: Set(ctx.user_id.clone()),
            novel_id: Set(Some(novel_id)),
            chapter_id: Set(chapter_id),
            parent_id: Set(parent_id),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let comment = self.comment_repo.create(model).await?;
        info!(comment_id = %comment.id, user_id = %ctx.user_id, "Comment created");

        let author = self.author_of(&comment).await?;
        Ok(CommentView::new(comment, author))
    }

    /// Edit a comment. Owner or administrator only.
    pub async fn update(
        &self,
        ctx: &AuthContext,
        id: &str,
        input: UpdateCommentInput,
    ) -> AppResult<CommentView> {
        let comment = self.comment_repo.get_by_id(id).await?;
        ctx.ensure_can_modify(&comment.author_id)?;
        let content = required_content(input.content)?;

        let comment = self.comment_repo.update_content(comment, content).await?;
        info!(comment_id = %comment.id, user_id = %ctx.user_id, "Comment updated");

        let author = self.author_of(&comment).await?;
        Ok(CommentView::new(comment, author))
    }

    /// Delete a comment and its replies.
    pub async fn delete(&self, ctx: &AuthContext, id: &str) -> AppResult<()> {
        let comment = self.comment_repo.get_by_id(id).await?;
        ctx.ensure_can_modify(&comment.author_id)?;

        self.comment_repo.delete(comment).await?;
        info!(comment_id = %id, user_id = %ctx.user_id, "Comment deleted");
        Ok(())
    }

    /// Comment threads on a novel itself.
    pub async fn thread_for_novel(&self, novel_id: &str) -> AppResult<Vec<CommentThread>> {
        let novel = self.novel_repo.get_by_id(novel_id).await?;
        let top = self.comment_repo.find_top_level_by_novel(&novel.id).await?;
        self.build_threads(top).await
    }

    /// Comment threads on a chapter.
    pub async fn thread_for_chapter(
        &self,
        novel_id: &str,
        chapter_id: &str,
    ) -> AppResult<Vec<CommentThread>> {
        let chapter = self.chapter_repo.get_by_id(chapter_id).await?;
        if chapter.novel_id != novel_id {
            return Err(AppError::NotFound(format!(
                "Chapter not found: {chapter_id}"
            )));
        }
        let top = self
            .comment_repo
            .find_top_level_by_chapter(&chapter.id)
            .await?;
        self.build_threads(top).await
    }

    async fn author_of(&self, comment: &comment::Model) -> AppResult<AuthorView> {
        let user = self.user_repo.get_by_id(&comment.author_id).await?;
        Ok(AuthorView::from(&user))
    }

    async fn build_threads(&self, top: Vec<comment::Model>) -> AppResult<Vec<CommentThread>> {
        let top_ids: Vec<String> = top.iter().map(|c| c.id.clone()).collect();
        let replies = self.comment_repo.find_replies(&top_ids).await?;

        let author_ids: Vec<String> = top
            .iter()
            .chain(replies.iter())
            .map(|c| c.author_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let authors = index_users(self.user_repo.find_by_ids(&author_ids).await?);

        let mut by_parent: HashMap<String, Vec<CommentView>> = HashMap::new();
        for reply in replies {
            if let Some(parent_id) = reply.parent_id.clone() {
                let author = AuthorView::lookup(&authors, &reply.author_id);
                by_parent
                    .entry(parent_id)
                    .or_default()
                    .push(CommentView::new(reply, author));
            }
        }

        Ok(top
            .into_iter()
            .map(|c| {
                let replies = by_parent.remove(&c.id).unwrap_or_default();
                let author = AuthorView::lookup(&authors, &c.author_id);
                CommentThread {
                    comment: CommentView::new(c, author),
                    replies,
                }
            })
            .collect())
    }
}

fn required_content(content: Option<String>) -> AppResult<String> {
    content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("content is required".to_string()))
}
