//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test -p novelhub-db --test db_integration -- --ignored --test-threads=1`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `novelhub_test`)
//!   `TEST_DB_PASSWORD` (default: `novelhub_test`)
//!   `TEST_DB_NAME` (default: `novelhub_test`)

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use novelhub_common::AppError;
use novelhub_db::entities::{Novel, Vote, chapter, novel, user, vote};
use novelhub_db::repositories::{
    ChapterRepository, LedgerChange, LedgerOp, NovelRepository, UserRepository, VoteRepository,
    VoteTarget,
};
use novelhub_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseBackend,
    EntityTrait, PaginatorTrait, QueryFilter, Statement,
};

async fn seed_user(db: &TestDatabase, id: &str) -> user::Model {
    user::ActiveModel {
        id: Set(id.to_string()),
        username: Set(format!("user_{id}")),
        password_hash: Set("hash".to_string()),
        nickname: Set(format!("nick_{id}")),
        role: Set(user::UserRole::User),
        token: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
    .insert(db.connection())
    .await
    .unwrap()
}

async fn seed_novel(db: &TestDatabase, id: &str, author_id: &str) -> novel::Model {
    novel::ActiveModel {
        id: Set(id.to_string()),
        title: Set(format!("Novel {id}")),
        description: Set(None),
        content: Set(None),
        category: Set(novel::NovelCategory::Long),
        author_id: Set(author_id.to_string()),
        is_published: Set(true),
        view_count: Set(0),
        like_count: Set(0),
        dislike_count: Set(0),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
    .insert(db.connection())
    .await
    .unwrap()
}

/// (likes, dislikes) recorded in the ledger for a novel.
async fn ledger_counts(db: &TestDatabase, novel_id: &str) -> (u64, u64) {
    let likes = Vote::find()
        .filter(vote::Column::NovelId.eq(novel_id))
        .filter(vote::Column::IsLike.eq(true))
        .count(db.connection())
        .await
        .unwrap();
    let dislikes = Vote::find()
        .filter(vote::Column::NovelId.eq(novel_id))
        .filter(vote::Column::IsLike.eq(false))
        .count(db.connection())
        .await
        .unwrap();
    (likes, dislikes)
}

/// (`like_count`, `dislike_count`) stored on the novel row.
async fn novel_counters(db: &TestDatabase, novel_id: &str) -> (u64, u64) {
    let novel = Novel::find_by_id(novel_id)
        .one(db.connection())
        .await
        .unwrap()
        .unwrap();
    assert!(novel.like_count >= 0 && novel.dislike_count >= 0);
    (novel.like_count as u64, novel.dislike_count as u64)
}

fn like(existing: Option<bool>) -> (LedgerChange, ()) {
    let change = match existing {
        None => LedgerChange {
            op: LedgerOp::Insert { is_like: true },
            like_delta: 1,
            dislike_delta: 0,
        },
        Some(true) => LedgerChange {
            op: LedgerOp::Delete,
            like_delta: -1,
            dislike_delta: 0,
        },
        Some(false) => LedgerChange {
            op: LedgerOp::SetPolarity { is_like: true },
            like_delta: 1,
            dislike_delta: -1,
        },
    };
    (change, ())
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_vote_transition_keeps_counters_in_sync() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    let conn = db.pool();

    seed_user(&db, "u1").await;
    seed_novel(&db, "n1", "u1").await;

    let votes = VoteRepository::new(conn.clone());
    let novels = NovelRepository::new(conn);
    let target = VoteTarget::Novel("n1".to_string());

    votes
        .apply_transition("v1".to_string(), "u1", &target, like)
        .await
        .unwrap();
    let novel = novels.get_by_id("n1").await.unwrap();
    assert_eq!(novel.like_count, 1);
    assert_eq!(ledger_counts(&db, "n1").await, (1, 0));

    // Repeating the same reaction removes it
    votes
        .apply_transition("v2".to_string(), "u1", &target, like)
        .await
        .unwrap();
    let novel = novels.get_by_id("n1").await.unwrap();
    assert_eq!(novel.like_count, 0);
    assert_eq!(ledger_counts(&db, "n1").await, (0, 0));
}

fn dislike(existing: Option<bool>) -> (LedgerChange, ()) {
    let change = match existing {
        None => LedgerChange {
            op: LedgerOp::Insert { is_like: false },
            like_delta: 0,
            dislike_delta: 1,
        },
        Some(false) => LedgerChange {
            op: LedgerOp::Delete,
            like_delta: 0,
            dislike_delta: -1,
        },
        Some(true) => LedgerChange {
            op: LedgerOp::SetPolarity { is_like: false },
            like_delta: -1,
            dislike_delta: 1,
        },
    };
    (change, ())
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_vote_flip_moves_counts_between_polarities() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    seed_user(&db, "u1").await;
    seed_novel(&db, "n1", "u1").await;

    let votes = VoteRepository::new(db.pool());
    let target = VoteTarget::Novel("n1".to_string());

    votes
        .apply_transition("v1".to_string(), "u1", &target, dislike)
        .await
        .unwrap();
    assert_eq!(novel_counters(&db, "n1").await, (0, 1));

    votes
        .apply_transition("v2".to_string(), "u1", &target, like)
        .await
        .unwrap();
    assert_eq!(novel_counters(&db, "n1").await, (1, 0));
    assert_eq!(ledger_counts(&db, "n1").await, (1, 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_repeat_votes_keep_counters_in_sync() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    seed_user(&db, "u1").await;
    seed_novel(&db, "n1", "u1").await;

    let votes = VoteRepository::new(db.pool());
    let target = VoteTarget::Novel("n1".to_string());
    votes
        .apply_transition("v0".to_string(), "u1", &target, like)
        .await
        .unwrap();

    for i in 1..=40 {
        let tasks: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|suffix| {
                let votes = votes.clone();
                let target = target.clone();
                let vote_id = format!("v{i}{suffix}");
                tokio::spawn(async move {
                    votes.apply_transition(vote_id, "u1", &target, like).await
                })
            })
            .collect();

        for task in tasks {
            match task.await.unwrap() {
                Ok(()) | Err(AppError::Conflict(_)) => {}
                Err(e) => panic!("iteration {i}: unexpected error {e}"),
            }
        }

        let counters = novel_counters(&db, "n1").await;
        let ledger = ledger_counts(&db, "n1").await;
        assert_eq!(counters, ledger, "iteration {i}: counters drifted from ledger");
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_vote_on_missing_target_writes_nothing() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    let conn = db.pool();

    seed_user(&db, "u1").await;

    let votes = VoteRepository::new(conn);
    let target = VoteTarget::Chapter("missing".to_string());
    let result = votes
        .apply_transition("v1".to_string(), "u1", &target, like)
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(Vote::find().count(db.connection()).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_vote_check_constraint_rejects_two_targets() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();

    seed_user(&db, "u1").await;
    seed_novel(&db, "n1", "u1").await;
    chapter::ActiveModel {
        id: Set("c1".to_string()),
        novel_id: Set("n1".to_string()),
        author_id: Set("u1".to_string()),
        chapter_num: Set(1),
        title: Set("One".to_string()),
        content: Set("text".to_string()),
        is_published: Set(true),
        view_count: Set(0),
        like_count: Set(0),
        dislike_count: Set(0),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
    .insert(db.connection())
    .await
    .unwrap();

    let result = vote::ActiveModel {
        id: Set("v1".to_string()),
        user_id: Set("u1".to_string()),
        novel_id: Set(Some("n1".to_string())),
        chapter_id: Set(Some("c1".to_string())),
        is_like: Set(true),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
    .insert(db.connection())
    .await;

    assert!(result.is_err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_username_is_conflict() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    seed_user(&db, "u1").await;

    let users = UserRepository::new(db.pool());
    let result = users
        .create(user::ActiveModel {
            id: Set("u2".to_string()),
            username: Set("user_u1".to_string()),
            password_hash: Set("hash".to_string()),
            nickname: Set("other".to_string()),
            role: Set(user::UserRole::User),
            token: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        })
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_max_chapter_num_on_empty_novel() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    seed_user(&db, "u1").await;
    seed_novel(&db, "n1", "u1").await;

    let chapters = ChapterRepository::new(db.pool());
    assert_eq!(chapters.max_chapter_num("n1").await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_execute_query() {
    let db = TestDatabase::new().await.expect("Failed to connect");

    let result = db
        .connection()
        .execute(Statement::from_string(
            DatabaseBackend::Postgres,
            "SELECT 1".to_string(),
        ))
        .await;

    assert!(result.is_ok(), "Query failed: {:?}", result.err());
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}
