//! Response shapes shared by several services.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use novelhub_common::{AppError, AppResult};
use novelhub_db::entities::{chapter, comment, novel::NovelCategory, user};
use serde::Serialize;

/// Public identity of an author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorView {
    pub id: String,
    pub nickname: String,
}

impl AuthorView {
    /// Look up an author in a batch-loaded map. Missing rows render with an empty nickname.
    #[must_use]
    pub fn lookup(authors: &HashMap<String, user::Model>, id: &str) -> Self {
        Self {
            id: id.to_string(),
            nickname: authors
                .get(id)
                .map(|u| u.nickname.clone())
                .unwrap_or_default(),
        }
    }
}

impl From<&user::Model> for AuthorView {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            nickname: user.nickname.clone(),
        }
    }
}

/// Page metadata returned next to a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl Pagination {
    #[must_use]
    pub const fn new(total: u64, page: u64, limit: u64) -> Self {
        Self {
            total,
            page,
            limit,
            total_pages: if limit == 0 { 0 } else { total.div_ceil(limit) },
        }
    }
}

/// Clamp 1-based `page` and `limit` query values and return `(page, limit, offset)`.
#[must_use]
pub fn page_window(page: Option<u64>, limit: Option<u64>, default_limit: u64) -> (u64, u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(default_limit).clamp(1, 100);
    (page, limit, (page - 1).saturating_mul(limit))
}

/// Parse an optional `category` filter. Empty means "any"; unknown names are rejected.
pub fn parse_category_filter(value: Option<&str>) -> AppResult<Option<NovelCategory>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NovelCategory::parse(v)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid category: {v}"))),
    }
}

/// A chapter as listed under its novel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterSummary {
    pub id: String,
    pub chapter_num: i32,
    pub title: String,
    pub view_count: i32,
    pub like_count: i32,
    pub created_at: DateTime<FixedOffset>,
}

impl From<chapter::Model> for ChapterSummary {
    fn from(chapter: chapter::Model) -> Self {
        Self {
            id: chapter.id,
            chapter_num: chapter.chapter_num,
            title: chapter.title,
            view_count: chapter.view_count,
            like_count: chapter.like_count,
            created_at: chapter.created_at,
        }
    }
}

/// A comment with its author.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub content: String,
    pub novel_id: Option<String>,
    pub chapter_id: Option<String>,
    pub parent_id: Option<String>,
    pub author: AuthorView,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl CommentView {
    #[must_use]
    pub fn new(comment: comment::Model, author: AuthorView) -> Self {
        Self {
            id: comment.id,
            content: comment.content,
            novel_id: comment.novel_id,
            chapter_id: comment.chapter_id,
            parent_id: comment.parent_id,
            author,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

/// Index a batch of users by ID.
#[must_use]
pub fn index_users(users: Vec<user::Model>) -> HashMap<String, user::Model> {
    users.into_iter().map(|u| (u.id.clone(), u)).collect()
}
