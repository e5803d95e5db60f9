//! Novel repository.

use std::sync::Arc;

use crate::entities::{Novel, User, novel};
use crate::repositories::contains_pattern;
use novelhub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, JoinType,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use std::collections::HashMap;

/// Listing order for novels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NovelSort {
    /// Newest first
    #[default]
    Latest,
    /// Most viewed first
    Popular,
    /// Most liked first
    Likes,
    /// Oldest first
    Oldest,
}

impl NovelSort {
    /// Parse the `sort` query parameter; unknown values fall back to [`NovelSort::Latest`].
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("popular") => Self::Popular,
            Some("likes") => Self::Likes,
            Some("oldest") => Self::Oldest,
            _ => Self::Latest,
        }
    }
}

/// Filter for the public novel listing.
#[derive(Debug, Clone, Default)]
pub struct NovelListQuery {
    /// Restrict to one category
    pub category: Option<novel::NovelCategory>,
    /// Result order
    pub sort: NovelSort,
    /// Case-insensitive match over title and description
    pub search: Option<String>,
    /// Rows to skip
    pub offset: u64,
    /// Page size
    pub limit: u64,
}

/// Partial update of a novel. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct NovelUpdate {
    /// New title; blank values are ignored
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New body text
    pub content: Option<String>,
    /// New visibility
    pub is_published: Option<bool>,
}

impl NovelUpdate {
    fn into_active_model(self, novel: novel::Model) -> novel::ActiveModel {
        let mut active: novel::ActiveModel = novel.into();
        if let Some(title) = self.title.filter(|t| !t.trim().is_empty()) {
            active.title = Set(title);
        }
        if let Some(description) = self.description {
            active.description = Set(Some(description));
        }
        if let Some(content) = self.content {
            active.content = Set(Some(content));
        }
        if let Some(is_published) = self.is_published {
            active.is_published = Set(is_published);
        }
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        active
    }
}

/// Novel repository for database operations.
#[derive(Clone)]
pub struct NovelRepository {
    db: Arc<DatabaseConnection>,
}

impl NovelRepository {
    /// Create a new novel repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a novel by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<novel::Model>> {
        Novel::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a novel by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<novel::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Novel not found: {id}")))
    }

    /// Create a new novel.
    pub async fn create(&self, model: novel::ActiveModel) -> AppResult<novel::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply a partial update.
    pub async fn update(&self, novel: novel::Model, patch: NovelUpdate) -> AppResult<novel::Model> {
        patch
            .into_active_model(novel)
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a novel. Chapters, comments and votes cascade.
    pub async fn delete(&self, novel: novel::Model) -> AppResult<()> {
        novel
            .delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment view count atomically (single UPDATE query, no fetch).
    pub async fn increment_view_count(&self, id: &str) -> AppResult<()> {
        Novel::update_many()
            .col_expr(
                novel::Column::ViewCount,
                Expr::col(novel::Column::ViewCount).add(1),
            )
            .filter(novel::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    fn published_query(query: &NovelListQuery) -> Select<Novel> {
        let mut select = Novel::find().filter(novel::Column::IsPublished.eq(true));

        if let Some(category) = query.category {
            select = select.filter(novel::Column::Category.eq(category));
        }

        if let Some(q) = query.search.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = contains_pattern(q);
            select = select.filter(
                Condition::any()
                    .add(Expr::col((Novel, novel::Column::Title)).ilike(&pattern))
                    .add(Expr::col((Novel, novel::Column::Description)).ilike(&pattern)),
            );
        }

        select
    }

    /// Published novels matching the listing filter, in the requested order.
    pub async fn list_published(&self, query: &NovelListQuery) -> AppResult<Vec<novel::Model>> {
        let select = Self::published_query(query);
        let select = match query.sort {
            NovelSort::Latest => select.order_by_desc(novel::Column::CreatedAt),
            NovelSort::Popular => select
                .order_by_desc(novel::Column::ViewCount)
                .order_by_desc(novel::Column::CreatedAt),
            NovelSort::Likes => select
                .order_by_desc(novel::Column::LikeCount)
                .order_by_desc(novel::Column::CreatedAt),
            NovelSort::Oldest => select.order_by_asc(novel::Column::CreatedAt),
        };

        select
            .order_by_desc(novel::Column::Id)
            .offset(query.offset)
            .limit(query.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count published novels matching the listing filter.
    pub async fn count_published(&self, query: &NovelListQuery) -> AppResult<u64> {
        Self::published_query(query)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn admin_query(search: Option<&str>, category: Option<novel::NovelCategory>) -> Select<Novel> {
        let mut select = Novel::find().join(JoinType::InnerJoin, novel::Relation::Author.def());

        if let Some(category) = category {
            select = select.filter(novel::Column::Category.eq(category));
        }

        if let Some(q) = search.map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = contains_pattern(q);
            select = select.filter(
                Condition::any()
                    .add(Expr::col((Novel, novel::Column::Title)).ilike(&pattern))
                    .add(Expr::col((User, crate::entities::user::Column::Nickname)).ilike(&pattern)),
            );
        }

        select
    }

    /// All novels (published or not), searchable by title or author nickname.
    pub async fn search_all(
        &self,
        search: Option<&str>,
        category: Option<novel::NovelCategory>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<novel::Model>> {
        Self::admin_query(search, category)
            .order_by_desc(novel::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count novels matching an admin search.
    pub async fn count_search_all(
        &self,
        search: Option<&str>,
        category: Option<novel::NovelCategory>,
    ) -> AppResult<u64> {
        Self::admin_query(search, category)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Novels written by a user, newest first.
    pub async fn find_by_author(&self, author_id: &str) -> AppResult<Vec<novel::Model>> {
        Novel::find()
            .filter(novel::Column::AuthorId.eq(author_id))
            .order_by_desc(novel::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most recently created novels.
    pub async fn find_recent(&self, limit: u64) -> AppResult<Vec<novel::Model>> {
        Novel::find()
            .order_by_desc(novel::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count novels, optionally restricted to one category.
    pub async fn count(&self, category: Option<novel::NovelCategory>) -> AppResult<u64> {
        let mut select = Novel::find();
        if let Some(category) = category {
            select = select.filter(novel::Column::Category.eq(category));
        }
        select
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count novels written by a user.
    pub async fn count_by_author(&self, author_id: &str) -> AppResult<u64> {
        Novel::find()
            .filter(novel::Column::AuthorId.eq(author_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Novel counts per author for a batch of users.
    pub async fn count_by_authors(&self, author_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        if author_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, i64)> = Novel::find()
            .select_only()
            .column(novel::Column::AuthorId)
            .column_as(novel::Column::Id.count(), "total")
            .filter(novel::Column::AuthorId.is_in(author_ids.to_vec()))
            .group_by(novel::Column::AuthorId)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, u64::try_from(count).unwrap_or_default()))
            .collect())
    }
}
