//! User service: registration, sign-in sessions and the "my page" view.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, FixedOffset};
use novelhub_common::{AppError, AppResult, IdGenerator};
use novelhub_db::{
    entities::{
        novel::{self, NovelCategory},
        user::{self, UserRole},
    },
    repositories::{ChapterRepository, CommentRepository, NovelRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::services::auth::AuthContext;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    novel_repo: NovelRepository,
    chapter_repo: ChapterRepository,
    comment_repo: CommentRepository,
    id_gen: IdGenerator,
}

/// Input for registering a new account.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterInput {
    #[validate(length(min = 4, max = 20, message = "Username must be 4-20 characters"))]
    pub username: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(length(min = 2, max = 20, message = "Nickname must be 2-20 characters"))]
    pub nickname: String,
}

/// Input for signing in.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignInInput {
    pub username: String,
    pub password: String,
}

/// Public part of a freshly registered account.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredUser {
    pub id: String,
    pub username: String,
    pub nickname: String,
}

/// A signed-in session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: String,
    pub username: String,
    pub nickname: String,
    pub role: UserRole,
    pub token: String,
}

/// Profile fields shown to the user themselves.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub username: String,
    pub nickname: String,
    pub role: UserRole,
    pub created_at: DateTime<FixedOffset>,
}

impl From<&user::Model> for ProfileView {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            nickname: user.nickname.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// One of the caller's own novels, published or not.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnNovelView {
    pub id: String,
    pub title: String,
    pub category: NovelCategory,
    pub is_published: bool,
    pub view_count: i32,
    pub like_count: i32,
    pub dislike_count: i32,
    pub chapter_count: u64,
    pub comment_count: u64,
    pub created_at: DateTime<FixedOffset>,
}

/// The caller's own dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyPageView {
    pub user: ProfileView,
    pub novel_count: u64,
    pub comment_count: u64,
    pub novels: Vec<OwnNovelView>,
}

impl UserService {
    /// Create a new user service.
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
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new account with the `USER` role.
    pub async fn register(&self, input: RegisterInput) -> AppResult<RegisteredUser> {
        if input.username.is_empty() || input.password.is_empty() || input.nickname.is_empty() {
            return Err(AppError::BadRequest(
                "username, password and nickname are required".to_string(),
            ));
        }
        input.validate()?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username is already taken".to_string()));
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username),
            password_hash: Set(password_hash),
            nickname: Set(input.nickname),
            role: Set(UserRole::User),
            token: Set(None),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(RegisteredUser {
            id: user.id,
            username: user.username,
            nickname: user.nickname,
        })
    }

    /// Check credentials and open a session with a fresh token.
    pub async fn sign_in(&self, input: SignInInput) -> AppResult<SessionView> {
        let user = self.authenticate(&input.username, &input.password).await?;

        let token = self.id_gen.generate_token();
        self.user_repo
            .set_token(&user.id, Some(token.clone()))
            .await?;

        info!(user_id = %user.id, "User signed in");

        Ok(SessionView {
            id: user.id,
            username: user.username,
            nickname: user.nickname,
            role: user.role,
            token,
        })
    }

    /// Invalidate the caller's session token.
    pub async fn sign_out(&self, ctx: &AuthContext) -> AppResult<()> {
        self.user_repo.set_token(&ctx.user_id, None).await?;
        info!(user_id = %ctx.user_id, "User signed out");
        Ok(())
    }

    /// Authenticate a user by username and password.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<user::Model> {
        if username.is_empty() || password.is_empty() {
            return Err(AppError::Unauthorized);
        }

        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Authenticate a user by session token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// The caller's profile, counts and own novels.
    pub async fn my_page(&self, ctx: &AuthContext) -> AppResult<MyPageView> {
        let user = self.user_repo.get_by_id(&ctx.user_id).await?;

        let (novels, comment_count) = tokio::try_join!(
            self.novel_repo.find_by_author(&ctx.user_id),
            self.comment_repo.count_by_author(&ctx.user_id),
        )?;

        let ids: Vec<String> = novels.iter().map(|n| n.id.clone()).collect();
        let (chapter_counts, comment_counts) = tokio::try_join!(
            self.chapter_repo.count_by_novels(&ids),
            self.comment_repo.count_by_novels(&ids),
        )?;

        let novels: Vec<OwnNovelView> = novels
            .into_iter()
            .map(|n: novel::Model| OwnNovelView {
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
            .collect();

        Ok(MyPageView {
            user: ProfileView::from(&user),
            novel_count: novels.len() as u64,
            comment_count,
            novels,
        })
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored PHC string.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
