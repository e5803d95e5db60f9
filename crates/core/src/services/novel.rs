//! Novel service.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};
use novelhub_common::{AppError, AppResult, IdGenerator};
use novelhub_db::{
    entities::novel::{self, NovelCategory},
    repositories::{
        ChapterRepository, CommentRepository, NovelListQuery, NovelRepository, NovelSort,
        NovelUpdate, UserRepository,
    },
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::services::auth::AuthContext;
use crate::services::views::{
    AuthorView, ChapterSummary, Pagination, index_users, page_window, parse_category_filter,
};

const DEFAULT_PAGE_SIZE: u64 = 12;

/// Query string of the public novel listing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListNovelsQuery {
    pub category: Option<String>,
    pub sort: Option<String>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Input for creating a novel.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateNovelInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub content: Option<String>,
}

/// Input for updating a novel. Absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateNovelInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub is_published: Option<bool>,
}

/// A novel in a listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NovelSummary {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: NovelCategory,
    pub author: AuthorView,
    pub view_count: i32,
    pub like_count: i32,
    pub dislike_count: i32,
    pub chapter_count: u64,
    pub comment_count: u64,
    pub created_at: DateTime<FixedOffset>,
}

/// One page of the public listing.
#[derive(Debug, Clone, Serialize)]
pub struct NovelPage {
    pub novels: Vec<NovelSummary>,
    pub pagination: Pagination,
}

/// Full novel page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NovelDetail {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub category: NovelCategory,
    pub is_published: bool,
    pub author: AuthorView,
    pub view_count: i32,
    pub like_count: i32,
    pub dislike_count: i32,
    pub chapters: Vec<ChapterSummary>,
    pub comment_count: u64,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

/// Novel service for business logic.
#[derive(Clone)]
pub struct NovelService {
    novel_repo: NovelRepository,
    chapter_repo: ChapterRepository,
    comment_repo: CommentRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl NovelService {
    /// Create a new novel service.
    #[must_use]
    pub const fn new(
        novel_repo: NovelRepository,
        chapter_repo: ChapterRepository,
        comment_repo: CommentRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            novel_repo,
            chapter_repo,
            comment_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Published novels, filtered, sorted and paginated.
    pub async fn list(&self, query: ListNovelsQuery) -> AppResult<NovelPage> {
        let category = parse_category_filter(query.category.as_deref())?;
        let (page, limit, offset) = page_window(query.page, query.limit, DEFAULT_PAGE_SIZE);

        let list_query = NovelListQuery {
            category,
            sort: NovelSort::parse(query.sort.as_deref()),
            search: query.search,
            offset,
            limit,
        };

        let (novels, total) = tokio::try_join!(
            self.novel_repo.list_published(&list_query),
            self.novel_repo.count_published(&list_query),
        )?;

        let novels = self.summarize(novels).await?;

        Ok(NovelPage {
            novels,
            pagination: Pagination::new(total, page, limit),
        })
    }

    /// Attach author nicknames and chapter/comment counts to a batch of novels.
    async fn summarize(&self, novels: Vec<novel::Model>) -> AppResult<Vec<NovelSummary>> {
        let ids: Vec<String> = novels.iter().map(|n| n.id.clone()).collect();
        let author_ids: Vec<String> = novels
            .iter()
            .map(|n| n.author_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let (authors, chapter_counts, comment_counts) = tokio::try_join!(
            self.user_repo.find_by_ids(&author_ids),
            self.chapter_repo.count_by_novels(&ids),
            self.comment_repo.count_by_novels(&ids),
        )?;
        let authors = index_users(authors);

        Ok(novels
            .into_iter()
            .map(|n| NovelSummary {
                author: AuthorView::lookup(&authors, &n.author_id),
                chapter_count: chapter_counts.get(&n.id).copied().unwrap_or(0),
                comment_count: comment_counts.get(&n.id).copied().unwrap_or(0),
                id: n.id,
                title: n.title,
                description: n.description,
                category: n.category,
                view_count: n.view_count,
                like_count: n.like_count,
                dislike_count: n.dislike_count,
                created_at: n.created_at,
            })
            .collect())
    }

    /// Create a novel owned by the caller.
    pub async fn create(
        &self,
        ctx: &AuthContext,
        input: CreateNovelInput,
    ) -> AppResult<novel::Model> {
        let title = input
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::BadRequest("title is required".to_string()))?;
        let category = input
            .category
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::BadRequest("category is required".to_string()))?;
        let category = NovelCategory::parse(category)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid category: {category}")))?;

        let content = match category {
            NovelCategory::Short => Some(
                input
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::BadRequest("content is required for short novels".to_string())
                    })?,
            ),
            NovelCategory::Long => None,
        };

        let model = novel::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(title),
            description: Set(input.description.filter(|d| !d.is_empty())),
            content: Set(content),
            category: Set(category),
            author_id: Set(ctx.user_id.clone()),
            is_published: Set(true),
            view_count: Set(0),
            like_count: Set(0),
            dislike_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let novel = self.novel_repo.create(model).await?;
        info!(novel_id = %novel.id, user_id = %ctx.user_id, category = ?novel.category, "Novel created");
        Ok(novel)
    }

    /// Novel page with author, published chapters and comment count.
    ///
    /// Unpublished novels are only visible to those who may modify them.
    /// Each view bumps `view_count`; a failed bump is logged and ignored.
    pub async fn get_detail(&self, viewer: Option<&AuthContext>, id: &str) -> AppResult<NovelDetail> {
        let novel = self.novel_repo.get_by_id(id).await?;

        if !novel.is_published && !viewer.is_some_and(|v| v.can_modify(&novel.author_id)) {
            return Err(AppError::NotFound(format!("Novel not found: {id}")));
        }

        let (author, chapters, comment_count) = tokio::try_join!(
            self.user_repo.find_by_id(&novel.author_id),
            self.chapter_repo.find_published_by_novel(&novel.id),
            self.comment_repo.count_by_novel(&novel.id),
        )?;

        let mut view_count = novel.view_count;
        match self.novel_repo.increment_view_count(&novel.id).await {
            Ok(()) => view_count += 1,
            Err(e) => warn!(novel_id = %novel.id, error = %e, "Failed to increment view count"),
        }

        Ok(NovelDetail {
            author: author.as_ref().map_or_else(
                || AuthorView {
                    id: novel.author_id.clone(),
                    nickname: String::new(),
                },
                AuthorView::from,
            ),
            chapters: chapters.into_iter().map(ChapterSummary::from).collect(),
            comment_count,
            view_count,
            id: novel.id,
            title: novel.title,
            description: novel.description,
            content: novel.content,
            category: novel.category,
            is_published: novel.is_published,
            like_count: novel.like_count,
            dislike_count: novel.dislike_count,
            created_at: novel.created_at,
            updated_at: novel.updated_at,
        })
    }

    /// Update a novel. Owner or administrator only.
    pub async fn update(
        &self,
        ctx: &AuthContext,
        id: &str,
        input: UpdateNovelInput,
    ) -> AppResult<novel::Model> {
        let novel = self.novel_repo.get_by_id(id).await?;
        ctx.ensure_can_modify(&novel.author_id)?;

        let updated = self
            .novel_repo
            .update(
                novel,
                NovelUpdate {
                    title: input.title,
                    description: input.description,
                    content: input.content,
                    is_published: input.is_published,
                },
            )
            .await?;

        info!(novel_id = %updated.id, user_id = %ctx.user_id, "Novel updated");
        Ok(updated)
    }

    /// Delete a novel with its chapters, comments and votes.
    pub async fn delete(&self, ctx: &AuthContext, id: &str) -> AppResult<()> {
        let novel = self.novel_repo.get_by_id(id).await?;
        ctx.ensure_can_modify(&novel.author_id)?;

        self.novel_repo.delete(novel).await?;
        info!(novel_id = %id, user_id = %ctx.user_id, "Novel deleted");
        Ok(())
    }
}
