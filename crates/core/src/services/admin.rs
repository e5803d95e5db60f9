//! Admin console: site statistics and user/novel management.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};
use novelhub_common::{AppError, AppResult};
use novelhub_db::{
    entities::{
        novel::{self, NovelCategory},
        user::{self, UserRole},
    },
    repositories::{ChapterRepository, CommentRepository, NovelRepository, UserRepository},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::services::auth::AuthContext;
use crate::services::user::ProfileView;
use crate::services::views::{
    AuthorView, Pagination, index_users, page_window, parse_category_filter,
};

const ADMIN_PAGE_SIZE: u64 = 20;
const RECENT_LIMIT: u64 = 5;

/// Site-wide counters and recent activity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: u64,
    pub total_novels: u64,
    pub short_novels: u64,
    pub long_novels: u64,
    pub total_chapters: u64,
    pub total_comments: u64,
    pub recent_novels: Vec<RecentNovel>,
    pub recent_users: Vec<RecentUser>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentNovel {
    pub id: String,
    pub title: String,
    pub category: NovelCategory,
    pub author: AuthorView,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentUser {
    pub id: String,
    pub username: String,
    pub nickname: String,
    pub role: UserRole,
    pub novel_count: u64,
    pub created_at: DateTime<FixedOffset>,
}

/// Query of the user management list.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminUserQuery {
    pub page: Option<u64>,
    pub search: Option<String>,
}

/// Query of the novel management list.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminNovelQuery {
    pub page: Option<u64>,
    pub search: Option<String>,
    pub category: Option<String>,
}

/// Input for changing a user's role.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SetRoleInput {
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    pub id: String,
    pub username: String,
    pub nickname: String,
    pub role: UserRole,
    pub novel_count: u64,
    pub comment_count: u64,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminUserPage {
    pub users: Vec<AdminUserView>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminNovelView {
    pub id: String,
    pub title: String,
    pub category: NovelCategory,
    pub is_published: bool,
    pub author: AuthorView,
    pub view_count: i32,
    pub like_count: i32,
    pub dislike_count: i32,
    pub chapter_count: u64,
    pub comment_count: u64,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminNovelPage {
    pub novels: Vec<AdminNovelView>,
    pub pagination: Pagination,
}

/// Admin service. Every operation requires the `ADMIN` role.
#[derive(Clone)]
pub struct AdminService {
    user_repo: UserRepository,
    novel_repo: NovelRepository,
    chapter_repo: ChapterRepository,
    comment_repo: CommentRepository,
}

impl AdminService {
    /// Create a new admin service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        novel_repo: NovelRepository,
        chapter_repo: ChapterRepository,
        comment_repo: CommentRepository,
    ) -> Self {
        Self {
            user_repo,
            novel_repo,
            chapter_repo,
            comment_repo,
        }
    }

    /// Dashboard counters plus the latest novels and sign-ups.
    pub async fn stats(&self, ctx: &AuthContext) -> AppResult<AdminStats> {
        ctx.require_admin()?;

        let (total_users, total_novels, short_novels, long_novels, total_chapters, total_comments) =
            tokio::try_join!(
                self.user_repo.count(),
                self.novel_repo.count(None),
                self.novel_repo.count(Some(NovelCategory::Short)),
                self.novel_repo.count(Some(NovelCategory::Long)),
                self.chapter_repo.count(),
                self.comment_repo.count(),
            )?;

        let (novels, users) = tokio::try_join!(
            self.novel_repo.find_recent(RECENT_LIMIT),
            self.user_repo.find_recent(RECENT_LIMIT),
        )?;

        let author_ids = distinct_authors(&novels);
        let user_ids: Vec<String> = users.iter().map(|u| u.id.clone()).collect();
        let (authors, novel_counts) = tokio::try_join!(
            self.user_repo.find_by_ids(&author_ids),
            self.novel_repo.count_by_authors(&user_ids),
        )?;
        let authors = index_users(authors);

        Ok(AdminStats {
            total_users,
            total_novels,
            short_novels,
            long_novels,
            total_chapters,
            total_comments,
            recent_novels: novels
                .into_iter()
                .map(|n| RecentNovel {
                    author: AuthorView::lookup(&authors, &n.author_id),
                    id: n.id,
                    title: n.title,
                    category: n.category,
                    created_at: n.created_at,
                })
                .collect(),
            recent_users: users
                .into_iter()
                .map(|u| RecentUser {
                    novel_count: novel_counts.get(&u.id).copied().unwrap_or(0),
                    id: u.id,
                    username: u.username,
                    nickname: u.nickname,
                    role: u.role,
                    created_at: u.created_at,
                })
                .collect(),
        })
    }

    /// Users, newest first, optionally searched by username or nickname.
    pub async fn list_users(
        &self,
        ctx: &AuthContext,
        query: AdminUserQuery,
    ) -> AppResult<AdminUserPage> {
        ctx.require_admin()?;

        let (page, limit, offset) = page_window(query.page, Some(ADMIN_PAGE_SIZE), ADMIN_PAGE_SIZE);
        let search = query.search.as_deref();

        let (users, total) = tokio::try_join!(
            self.user_repo.search(search, limit, offset),
            self.user_repo.count_search(search),
        )?;

        let ids: Vec<String> = users.iter().map(|u| u.id.clone()).collect();
        let (novel_counts, comment_counts) = tokio::try_join!(
            self.novel_repo.count_by_authors(&ids),
            self.comment_repo.count_by_authors(&ids),
        )?;

        Ok(AdminUserPage {
            users: users
                .into_iter()
                .map(|u: user::Model| AdminUserView {
                    novel_count: novel_counts.get(&u.id).copied().unwrap_or(0),
                    comment_count: comment_counts.get(&u.id).copied().unwrap_or(0),
                    id: u.id,
                    username: u.username,
                    nickname: u.nickname,
                    role: u.role,
                    created_at: u.created_at,
                })
                .collect(),
            pagination: Pagination::new(total, page, limit),
        })
    }

    /// Change another user's role.
    pub async fn set_role(
        &self,
        ctx: &AuthContext,
        user_id: &str,
        input: SetRoleInput,
    ) -> AppResult<ProfileView> {
        ctx.require_admin()?;

        let role = input
            .role
            .as_deref()
            .and_then(UserRole::parse)
            .ok_or_else(|| AppError::BadRequest("role must be USER or ADMIN".to_string()))?;

        if ctx.user_id == user_id {
            return Err(AppError::BadRequest(
                "You cannot change your own role".to_string(),
            ));
        }

        let user = self.user_repo.get_by_id(user_id).await?;
        let user = self.user_repo.set_role(user, role).await?;

        info!(admin_id = %ctx.user_id, user_id = %user.id, role = ?role, "User role changed");
        Ok(ProfileView::from(&user))
    }

    /// Delete another user together with everything they wrote.
    pub async fn delete_user(&self, ctx: &AuthContext, user_id: &str) -> AppResult<()> {
        ctx.require_admin()?;

        if ctx.user_id == user_id {
            return Err(AppError::BadRequest(
                "You cannot delete your own account".to_string(),
            ));
        }

        let user = self.user_repo.get_by_id(user_id).await?;
        self.user_repo.delete(user).await?;

        info!(admin_id = %ctx.user_id, user_id = %user_id, "User deleted");
        Ok(())
    }

    /// All novels including unpublished ones.
    pub async fn list_novels(
        &self,
        ctx: &AuthContext,
        query: AdminNovelQuery,
    ) -> AppResult<AdminNovelPage> {
        ctx.require_admin()?;

        let category = parse_category_filter(query.category.as_deref())?;
        let (page, limit, offset) = page_window(query.page, Some(ADMIN_PAGE_SIZE), ADMIN_PAGE_SIZE);
        let search = query.search.as_deref();

        let (novels, total) = tokio::try_join!(
            self.novel_repo.search_all(search, category, limit, offset),
            self.novel_repo.count_search_all(search, category),
        )?;

        let ids: Vec<String> = novels.iter().map(|n| n.id.clone()).collect();
        let author_ids = distinct_authors(&novels);
        let (authors, chapter_counts, comment_counts) = tokio::try_join!(
            self.user_repo.find_by_ids(&author_ids),
            self.chapter_repo.count_by_novels(&ids),
            self.comment_repo.count_by_novels(&ids),
        )?;
        let authors = index_users(authors);

        Ok(AdminNovelPage {
            novels: novels
                .into_iter()
                .map(|n| AdminNovelView {
                    author: AuthorView::lookup(&authors, &n.author_id),
                    chapter_count: chapter_counts.get(&n.id).copied().unwrap_or(0),
                    comment_count: comment_counts.get(&n.id).copied().unwrap_or(0),
                    id: n.id,
                    title: n.title,
                    category: n.category,
                    is_published: n.is_published,
                    view_count: n.view_count,
                    like_count: n.like_count,
                    dislike_count: n.dislike_count,
                    created_at: n.created_at,
                })
                .collect(),
            pagination: Pagination::new(total, page, limit),
        })
    }
}

fn distinct_authors(novels: &[novel::Model]) -> Vec<String> {
    novels
        .iter()
        .map(|n| n.author_id.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_user(id: &str, role: UserRole) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: format!("user_{id}"),
            password_hash: "hash".to_string(),
            nickname: format!("nick_{id}"),
            role,
            token: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn empty_db() -> Arc<DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    fn service_with_users(user_db: Arc<DatabaseConnection>) -> AdminService {
        AdminService::new(
            UserRepository::new(user_db),
            NovelRepository::new(empty_db()),
            ChapterRepository::new(empty_db()),
            CommentRepository::new(empty_db()),
        )
    }

    fn admin() -> AuthContext {
        AuthContext::new("root", UserRole::Admin)
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden() {
        let service = service_with_users(empty_db());
        let ctx = AuthContext::new("u1", UserRole::User);

        assert!(matches!(
            service.stats(&ctx).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.list_users(&ctx, AdminUserQuery::default()).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete_user(&ctx, "u2").await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.list_novels(&ctx, AdminNovelQuery::default()).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_set_role_rejects_unknown_role() {
        let service = service_with_users(empty_db());

        let result = service
            .set_role(
                &admin(),
                "u1",
                SetRoleInput {
                    role: Some("OWNER".to_string()),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_set_own_role_is_rejected() {
        let service = service_with_users(empty_db());

        let result = service
            .set_role(
                &admin(),
                "root",
                SetRoleInput {
                    role: Some("USER".to_string()),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_set_role_unknown_user_is_not_found() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let service = service_with_users(user_db);

        let result = service
            .set_role(
                &admin(),
                "ghost",
                SetRoleInput {
                    role: Some("ADMIN".to_string()),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_role_promotes_user() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u1", UserRole::User)]])
                .append_query_results([[create_test_user("u1", UserRole::Admin)]])
                .into_connection(),
        );
        let service = service_with_users(user_db);

        let profile = service
            .set_role(
                &admin(),
                "u1",
                SetRoleInput {
                    role: Some("ADMIN".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(profile.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_delete_self_is_rejected() {
        let service = service_with_users(empty_db());

        let result = service.delete_user(&admin(), "root").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u1", UserRole::User)]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let service = service_with_users(user_db);

        assert!(service.delete_user(&admin(), "u1").await.is_ok());
    }

    #[tokio::test]
    async fn test_list_users_page() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![create_test_user("u1", UserRole::User)]])
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(21))
                }]])
                .into_connection(),
        );
        let novel_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "author_id" => sea_orm::Value::String(Some(Box::new("u1".to_string()))),
                    "total" => sea_orm::Value::BigInt(Some(3)),
                }]])
                .into_connection(),
        );
        let comment_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<std::collections::BTreeMap<&str, sea_orm::Value>>::new()])
                .into_connection(),
        );
        let service = AdminService::new(
            UserRepository::new(user_db),
            NovelRepository::new(novel_db),
            ChapterRepository::new(empty_db()),
            CommentRepository::new(comment_db),
        );

        let page = service
            .list_users(&admin(), AdminUserQuery::default())
            .await
            .unwrap();

        assert_eq!(page.users.len(), 1);
        assert_eq!(page.users[0].novel_count, 3);
        assert_eq!(page.users[0].comment_count, 0);
        assert_eq!(page.pagination.total_pages, 2);
        assert_eq!(page.pagination.limit, 20);
    }
}
