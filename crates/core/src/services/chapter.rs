//! Chapter service: installments of long novels.

use chrono::{DateTime, FixedOffset};
use novelhub_common::{AppError, AppResult, IdGenerator};
use novelhub_db::{
    entities::{
        chapter,
        novel::{self, NovelCategory},
    },
    repositories::{ChapterRepository, ChapterUpdate, NovelRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::services::auth::AuthContext;
use crate::services::views::{AuthorView, ChapterSummary};

/// Input for adding a chapter.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateChapterInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub chapter_num: Option<i32>,
}

/// Input for editing a chapter. Empty strings are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateChapterInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_published: Option<bool>,
}

/// The novel a chapter belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct NovelRef {
    pub id: String,
    pub title: String,
}

/// Chapter reading page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDetail {
    pub id: String,
    pub chapter_num: i32,
    pub title: String,
    pub content: String,
    pub is_published: bool,
    pub view_count: i32,
    pub like_count: i32,
    pub dislike_count: i32,
    pub author: AuthorView,
    pub novel: NovelRef,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

/// Chapter service for business logic.
#[derive(Clone)]
pub struct ChapterService {
    chapter_repo: ChapterRepository,
    novel_repo: NovelRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl ChapterService {
    /// Create a new chapter service.
    #[must_use]
    pub const fn new(
        chapter_repo: ChapterRepository,
        novel_repo: NovelRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            chapter_repo,
            novel_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Published chapters of a novel in reading order.
    pub async fn list(&self, novel_id: &str) -> AppResult<Vec<ChapterSummary>> {
        let novel = self.novel_repo.get_by_id(novel_id).await?;
        let chapters = self.chapter_repo.find_published_by_novel(&novel.id).await?;
        Ok(chapters.into_iter().map(ChapterSummary::from).collect())
    }

    /// Add a chapter to a long novel.
    ///
    /// Without an explicit number the chapter goes after the current last one.
    pub async fn create(
        &self,
        ctx: &AuthContext,
        novel_id: &str,
        input: CreateChapterInput,
    ) -> AppResult<chapter::Model> {
        let novel = self.novel_repo.get_by_id(novel_id).await?;
        if novel.category != NovelCategory::Long {
            return Err(AppError::BadRequest(
                "Chapters can only be added to long novels".to_string(),
            ));
        }
        ctx.ensure_can_modify(&novel.author_id)?;

        let title = input
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let content = input.content.filter(|c| !c.trim().is_empty());
        let (Some(title), Some(content)) = (title, content) else {
            return Err(AppError::BadRequest(
                "title and content are required".to_string(),
            ));
        };

        let chapter_num = match input.chapter_num {
            Some(num) if num < 1 => {
                return Err(AppError::BadRequest(
                    "chapterNum must be a positive number".to_string(),
                ));
            }
            Some(num) => {
                if self.chapter_repo.exists_num(&novel.id, num).await? {
                    return Err(AppError::Conflict(
                        "Chapter number already exists".to_string(),
                    ));
                }
                num
            }
            None => self
                .chapter_repo
                .max_chapter_num(&novel.id)
                .await?
                .map_or(1, |max| max + 1),
        };

        let model = chapter::ActiveModel {
            id: Set(self.id_gen.generate()),
            novel_id: Set(novel.id.clone()),
            author_id: Set(ctx.user_id.clone()),
            chapter_num: Set(chapter_num),
            title: Set(title),
            content: Set(content),
            is_published: Set(true),
            view_count: Set(0),
            like_count: Set(0),
            dislike_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let chapter = self.chapter_repo.create(model).await?;
        info!(
            chapter_id = %chapter.id,
            novel_id = %novel.id,
            chapter_num = chapter.chapter_num,
            "Chapter created"
        );
        Ok(chapter)
    }

    /// Read a chapter. Bumps its view count on a best-effort basis.
    pub async fn get(
        &self,
        viewer: Option<&AuthContext>,
        novel_id: &str,
        chapter_id: &str,
    ) -> AppResult<ChapterDetail> {
        let chapter = self.chapter_repo.get_by_id(chapter_id).await?;
        if chapter.novel_id != novel_id {
            return Err(AppError::NotFound(format!(
                "Chapter not found: {chapter_id}"
            )));
        }

        let novel = self.novel_repo.get_by_id(novel_id).await?;
        let owner_view = viewer.is_some_and(|v| v.can_modify(&novel.author_id));
        if !owner_view && !(chapter.is_published && novel.is_published) {
            return Err(AppError::NotFound(format!(
                "Chapter not found: {chapter_id}"
            )));
        }

        let author = self.user_repo.find_by_id(&chapter.author_id).await?;

        let mut view_count = chapter.view_count;
        match self.chapter_repo.increment_view_count(&chapter.id).await {
            Ok(()) => view_count += 1,
            Err(e) => warn!(chapter_id = %chapter.id, error = %e, "Failed to increment view count"),
        }

        Ok(ChapterDetail {
            author: author.as_ref().map_or_else(
                || AuthorView {
                    id: chapter.author_id.clone(),
                    nickname: String::new(),
                },
                AuthorView::from,
            ),
            novel: NovelRef {
                id: novel.id,
                title: novel.title,
            },
            view_count,
            id: chapter.id,
            chapter_num: chapter.chapter_num,
            title: chapter.title,
            content: chapter.content,
            is_published: chapter.is_published,
            like_count: chapter.like_count,
            dislike_count: chapter.dislike_count,
            created_at: chapter.created_at,
            updated_at: chapter.updated_at,
        })
    }

    /// Edit a chapter. Requires permission on the parent novel.
    pub async fn update(
        &self,
        ctx: &AuthContext,
        novel_id: &str,
        chapter_id: &str,
        input: UpdateChapterInput,
    ) -> AppResult<chapter::Model> {
        let (chapter, _novel) = self.load_for_write(ctx, novel_id, chapter_id).await?;

        let updated = self
            .chapter_repo
            .update(
                chapter,
                ChapterUpdate {
                    title: input.title,
                    content: input.content,
                    is_published: input.is_published,
                },
            )
            .await?;

        info!(chapter_id = %updated.id, user_id = %ctx.user_id, "Chapter updated");
        Ok(updated)
    }

    /// Delete a chapter with its comments and votes.
    pub async fn delete(&self, ctx: &AuthContext, novel_id: &str, chapter_id: &str) -> AppResult<()> {
        let (chapter, _novel) = self.load_for_write(ctx, novel_id, chapter_id).await?;

        self.chapter_repo.delete(chapter).await?;
        info!(chapter_id = %chapter_id, user_id = %ctx.user_id, "Chapter deleted");
        Ok(())
    }

    /// Chapter must exist (404), sit under `novel_id` (400), and the caller
    /// must be able to modify the novel (403).
    async fn load_for_write(
        &self,
        ctx: &AuthContext,
        novel_id: &str,
        chapter_id: &str,
    ) -> AppResult<(chapter::Model, novel::Model)> {
        let chapter = self.chapter_repo.get_by_id(chapter_id).await?;
        if chapter.novel_id != novel_id {
            return Err(AppError::BadRequest(
                "Chapter does not belong to this novel".to_string(),
            ));
        }

        let novel = self.novel_repo.get_by_id(novel_id).await?;
        ctx.ensure_can_modify(&novel.author_id)?;

        Ok((chapter, novel))
    }
}
