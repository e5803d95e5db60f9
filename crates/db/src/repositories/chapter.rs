//! Chapter repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Chapter, chapter};
use crate::repositories::map_write_err;
use novelhub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, sea_query::Expr,
};

/// Partial update of a chapter. Empty strings are ignored.
#[derive(Debug, Clone, Default)]
pub struct ChapterUpdate {
    /// New title
    pub title: Option<String>,
    /// New body text
    pub content: Option<String>,
    /// New visibility
    pub is_published: Option<bool>,
}

impl ChapterUpdate {
    fn into_active_model(self, chapter: chapter::Model) -> chapter::ActiveModel {
        let mut active: chapter::ActiveModel = chapter.into();
        if let Some(title) = self.title.filter(|t| !t.trim().is_empty()) {
            active.title = Set(title);
        }
        if let Some(content) = self.content.filter(|c| !c.trim().is_empty()) {
            active.content = Set(content);
        }
        if let Some(is_published) = self.is_published {
            active.is_published = Set(is_published);
        }
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        active
    }
}

/// Chapter repository for database operations.
#[derive(Clone)]
pub struct ChapterRepository {
    db: Arc<DatabaseConnection>,
}

impl ChapterRepository {
    /// Create a new chapter repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a chapter by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<chapter::Model>> {
        Chapter::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a chapter by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<chapter::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Chapter not found: {id}")))
    }

    /// Published chapters of a novel, ascending by number.
    pub async fn find_published_by_novel(&self, novel_id: &str) -> AppResult<Vec<chapter::Model>> {
        Chapter::find()
            .filter(chapter::Column::NovelId.eq(novel_id))
            .filter(chapter::Column::IsPublished.eq(true))
            .order_by_asc(chapter::Column::ChapterNum)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Highest chapter number used in a novel.
    pub async fn max_chapter_num(&self, novel_id: &str) -> AppResult<Option<i32>> {
        let max: Option<Option<i32>> = Chapter::find()
            .select_only()
            .column_as(chapter::Column::ChapterNum.max(), "max_num")
            .filter(chapter::Column::NovelId.eq(novel_id))
            .into_tuple()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(max.flatten())
    }

    /// Whether a chapter number is already taken in a novel.
    pub async fn exists_num(&self, novel_id: &str, chapter_num: i32) -> AppResult<bool> {
        let count = Chapter::find()
            .filter(chapter::Column::NovelId.eq(novel_id))
            .filter(chapter::Column::ChapterNum.eq(chapter_num))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Create a new chapter.
    pub async fn create(&self, model: chapter::ActiveModel) -> AppResult<chapter::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| map_write_err(e, "Chapter number already exists"))
    }

    /// Apply a partial update.
    pub async fn update(
        &self,
        chapter: chapter::Model,
        patch: ChapterUpdate,
    ) -> AppResult<chapter::Model> {
        patch
            .into_active_model(chapter)
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a chapter. Its comments and votes cascade.
    pub async fn delete(&self, chapter: chapter::Model) -> AppResult<()> {
        chapter
            .delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment view count atomically.
    pub async fn increment_view_count(&self, id: &str) -> AppResult<()> {
        Chapter::update_many()
            .col_expr(
                chapter::Column::ViewCount,
                Expr::col(chapter::Column::ViewCount).add(1),
            )
            .filter(chapter::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count all chapters.
    pub async fn count(&self) -> AppResult<u64> {
        Chapter::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Chapter counts per novel for a batch of novels.
    pub async fn count_by_novels(&self, novel_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        if novel_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, i64)> = Chapter::find()
            .select_only()
            .column(chapter::Column::NovelId)
            .column_as(chapter::Column::Id.count(), "total")
            .filter(chapter::Column::NovelId.is_in(novel_ids.to_vec()))
            .group_by(chapter::Column::NovelId)
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_chapter(id: &str, novel_id: &str, num: i32) -> chapter::Model {
        chapter::Model {
            id: id.to_string(),
            novel_id: novel_id.to_string(),
            author_id: "u1".to_string(),
            chapter_num: num,
            title: format!("Chapter {num}"),
            content: "text".to_string(),
            is_published: true,
            view_count: 0,
            like_count: 0,
            dislike_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_update_ignores_empty_strings() {
        let chapter = create_test_chapter("c1", "n1", 1);
        let patch = ChapterUpdate {
            title: Some(String::new()),
            content: Some("new body".to_string()),
            is_published: None,
        };

        let active = patch.into_active_model(chapter);

        assert!(!active.title.is_set());
        assert_eq!(active.content, Set("new body".to_string()));
        assert!(!active.is_published.is_set());
    }

    #[tokio::test]
    async fn test_find_published_by_novel() {
        let c1 = create_test_chapter("c1", "n1", 1);
        let c2 = create_test_chapter("c2", "n1", 2);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[c1, c2]])
                .into_connection(),
        );

        let repo = ChapterRepository::new(db);
        let chapters = repo.find_published_by_novel("n1").await.unwrap();

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].chapter_num, 1);
    }

    #[tokio::test]
    async fn test_max_chapter_num() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "max_num" => sea_orm::Value::Int(Some(7))
                }]])
                .into_connection(),
        );

        let repo = ChapterRepository::new(db);
        assert_eq!(repo.max_chapter_num("n1").await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_max_chapter_num_empty_novel() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "max_num" => sea_orm::Value::Int(None)
                }]])
                .into_connection(),
        );

        let repo = ChapterRepository::new(db);
        assert_eq!(repo.max_chapter_num("n1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_exists_num() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1))
                }]])
                .into_connection(),
        );

        let repo = ChapterRepository::new(db);
        assert!(repo.exists_num("n1", 1).await.unwrap());
    }
}
