//! Vote repository: the reaction ledger and its counter synchronization.
//!
//! Every ledger write happens together with the matching counter update on the
//! target row inside one transaction. Callers decide *what* to write through a
//! resolver closure that sees the existing polarity under the same transaction.

use std::sync::Arc;

use crate::entities::{Chapter, Novel, Vote, chapter, novel, vote};
use crate::repositories::map_write_err;
use novelhub_common::{AppError, AppResult};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QuerySelect, TransactionTrait, sea_query::Expr,
};
use tracing::warn;

/// Something that can be voted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteTarget {
    /// A novel, by ID
    Novel(String),
    /// A chapter, by ID
    Chapter(String),
}

impl VoteTarget {
    /// ID of the target row.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Novel(id) | Self::Chapter(id) => id,
        }
    }

    /// Human-readable kind, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Novel(_) => "Novel",
            Self::Chapter(_) => "Chapter",
        }
    }

    fn ledger_filter(&self) -> sea_orm::sea_query::SimpleExpr {
        match self {
            Self::Novel(id) => vote::Column::NovelId.eq(id.as_str()),
            Self::Chapter(id) => vote::Column::ChapterId.eq(id.as_str()),
        }
    }
}

/// Write to perform on the ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOp {
    /// Insert a new vote with the given polarity
    #[allow(missing_docs)]
    Insert { is_like: bool },
    /// Delete the existing vote
    Delete,
    /// Flip the existing vote to the given polarity
    #[allow(missing_docs)]
    SetPolarity { is_like: bool },
}

/// A ledger write plus the counter deltas that keep the target in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerChange {
    /// Ledger write
    pub op: LedgerOp,
    /// Change applied to `like_count`
    pub like_delta: i32,
    /// Change applied to `dislike_count`
    pub dislike_delta: i32,
}

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user's vote on a target.
    pub async fn find_by_user_and_target(
        &self,
        user_id: &str,
        target: &VoteTarget,
    ) -> AppResult<Option<vote::Model>> {
        find_vote(self.db.as_ref(), user_id, target).await
    }

    /// Run one vote transition atomically.
    ///
    /// Inside a single transaction: check the target exists, read the user's
    /// current vote, let `resolve` pick the ledger change from the existing
    /// polarity, write the ledger row and adjust the target's counters. Any
    /// failure rolls everything back. The existing vote is row-locked, so a
    /// second transition on it waits and then sees the committed result. A
    /// concurrent duplicate insert, or a ledger write that matches no row,
    /// surfaces as [`AppError::Conflict`] and leaves the counters untouched.
    pub async fn apply_transition<T, F>(
        &self,
        vote_id: String,
        user_id: &str,
        target: &VoteTarget,
        resolve: F,
    ) -> AppResult<T>
    where
        F: FnOnce(Option<bool>) -> (LedgerChange, T) + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let result = transition_in(&txn, vote_id, user_id, target, resolve).await;

        match result {
            Ok(out) => {
                txn.commit()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(out)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "Failed to roll back vote transaction");
                }
                Err(err)
            }
        }
    }
}

async fn find_vote<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    target: &VoteTarget,
) -> AppResult<Option<vote::Model>> {
    Vote::find()
        .filter(vote::Column::UserId.eq(user_id))
        .filter(target.ledger_filter())
        .one(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Read the user's vote with `FOR UPDATE` so concurrent transitions on the
/// same row run one after another.
async fn lock_vote<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    target: &VoteTarget,
) -> AppResult<Option<vote::Model>> {
    Vote::find()
        .filter(vote::Column::UserId.eq(user_id))
        .filter(target.ledger_filter())
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// A ledger write that touched no row lost a race with another transition.
fn expect_one_row(rows_affected: u64) -> AppResult<()> {
    if rows_affected == 1 {
        Ok(())
    } else {
        Err(AppError::Conflict(
            "Vote changed concurrently, retry".to_string(),
        ))
    }
}

async fn target_exists<C: ConnectionTrait>(conn: &C, target: &VoteTarget) -> AppResult<bool> {
    let count = match target {
        VoteTarget::Novel(id) => Novel::find_by_id(id.as_str()).count(conn).await,
        VoteTarget::Chapter(id) => Chapter::find_by_id(id.as_str()).count(conn).await,
    }
    .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(count > 0)
}

async fn transition_in<C, T, F>(
    conn: &C,
    vote_id: String,
    user_id: &str,
    target: &VoteTarget,
    resolve: F,
) -> AppResult<T>
where
    C: ConnectionTrait,
    F: FnOnce(Option<bool>) -> (LedgerChange, T),
{
    if !target_exists(conn, target).await? {
        return Err(AppError::NotFound(format!(
            "{} not found: {}",
            target.kind(),
            target.id()
        )));
    }

    let existing = lock_vote(conn, user_id, target).await?;
    let (change, out) = resolve(existing.as_ref().map(|v| v.is_like));

    match (change.op, existing) {
        (LedgerOp::Insert { is_like }, None) => {
            insert_vote(conn, vote_id, user_id, target, is_like).await?;
        }
        (LedgerOp::Delete, Some(existing)) => {
            let result = Vote::delete_many()
                .filter(vote::Column::Id.eq(existing.id))
                .filter(vote::Column::IsLike.eq(existing.is_like))
                .exec(conn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            expect_one_row(result.rows_affected)?;
        }
        (LedgerOp::SetPolarity { is_like }, Some(existing)) => {
            let result = Vote::update_many()
                .col_expr(vote::Column::IsLike, Expr::value(is_like))
                .col_expr(
                    vote::Column::UpdatedAt,
                    Expr::value(chrono::Utc::now().fixed_offset()),
                )
                .filter(vote::Column::Id.eq(existing.id))
                .filter(vote::Column::IsLike.eq(existing.is_like))
                .exec(conn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            expect_one_row(result.rows_affected)?;
        }
        (op, existing) => {
            return Err(AppError::Internal(format!(
                "ledger op {op:?} does not match existing vote {:?}",
                existing.map(|v| v.id)
            )));
        }
    }

    adjust_counters(conn, target, change.like_delta, change.dislike_delta).await?;

    Ok(out)
}

async fn insert_vote<C: ConnectionTrait>(
    conn: &C,
    vote_id: String,
    user_id: &str,
    target: &VoteTarget,
    is_like: bool,
) -> AppResult<()> {
    let (novel_id, chapter_id) = match target {
        VoteTarget::Novel(id) => (Some(id.clone()), None),
        VoteTarget::Chapter(id) => (None, Some(id.clone())),
    };

    let model = vote::ActiveModel {
        id: Set(vote_id),
        user_id: Set(user_id.to_string()),
        novel_id: Set(novel_id),
        chapter_id: Set(chapter_id),
        is_like: Set(is_like),
        created_at: Set(chrono::Utc::now().into()),
        updated_at: Set(None),
    };

    Vote::insert(model)
        .exec_without_returning(conn)
        .await
        .map_err(|e| map_write_err(e, "Vote already recorded"))?;
    Ok(())
}

async fn adjust_counters<C: ConnectionTrait>(
    conn: &C,
    target: &VoteTarget,
    like_delta: i32,
    dislike_delta: i32,
) -> AppResult<()> {
    if like_delta == 0 && dislike_delta == 0 {
        return Ok(());
    }

    let result = match target {
        VoteTarget::Novel(id) => {
            let mut update = Novel::update_many().filter(novel::Column::Id.eq(id.as_str()));
            if like_delta != 0 {
                update = update.col_expr(
                    novel::Column::LikeCount,
                    Expr::col(novel::Column::LikeCount).add(like_delta),
                );
            }
            if dislike_delta != 0 {
                update = update.col_expr(
                    novel::Column::DislikeCount,
                    Expr::col(novel::Column::DislikeCount).add(dislike_delta),
                );
            }
            update.exec(conn).await
        }
        VoteTarget::Chapter(id) => {
            let mut update = Chapter::update_many().filter(chapter::Column::Id.eq(id.as_str()));
            if like_delta != 0 {
                update = update.col_expr(
                    chapter::Column::LikeCount,
                    Expr::col(chapter::Column::LikeCount).add(like_delta),
                );
            }
            if dislike_delta != 0 {
                update = update.col_expr(
                    chapter::Column::DislikeCount,
                    Expr::col(chapter::Column::DislikeCount).add(dislike_delta),
                );
            }
            update.exec(conn).await
        }
    };

    result.map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! { "num_items" => sea_orm::Value::BigInt(Some(n)) }
    }

    fn exec_ok() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }
    }

    fn create_test_vote(id: &str, is_like: bool) -> vote::Model {
        vote::Model {
            id: id.to_string(),
            user_id: "u1".to_string(),
            novel_id: Some("n1".to_string()),
            chapter_id: None,
            is_like,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    const INSERT_LIKE: LedgerChange = LedgerChange {
        op: LedgerOp::Insert { is_like: true },
        like_delta: 1,
        dislike_delta: 0,
    };

    #[test]
    fn test_target_accessors() {
        let target = VoteTarget::Chapter("c1".to_string());
        assert_eq!(target.id(), "c1");
        assert_eq!(target.kind(), "Chapter");
    }

    #[tokio::test]
    async fn test_apply_transition_inserts_and_commits() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(1)]])
                .append_query_results([Vec::<vote::Model>::new()])
                .append_exec_results([exec_ok(), exec_ok()])
                .into_connection(),
        );

        let repo = VoteRepository::new(db.clone());
        let seen = repo
            .apply_transition(
                "v1".to_string(),
                "u1",
                &VoteTarget::Novel("n1".to_string()),
                |existing| (INSERT_LIKE, existing),
            )
            .await
            .unwrap();
        drop(repo);

        assert_eq!(seen, None);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_transition_sees_existing_polarity() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(1)]])
                .append_query_results([[create_test_vote("v1", false)]])
                .append_exec_results([exec_ok(), exec_ok()])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let seen = repo
            .apply_transition(
                "v2".to_string(),
                "u1",
                &VoteTarget::Novel("n1".to_string()),
                |existing| {
                    (
                        LedgerChange {
                            op: LedgerOp::SetPolarity { is_like: true },
                            like_delta: 1,
                            dislike_delta: -1,
                        },
                        existing,
                    )
                },
            )
            .await
            .unwrap();

        assert_eq!(seen, Some(false));
    }

    #[tokio::test]
    async fn test_apply_transition_missing_target() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(0)]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let result = repo
            .apply_transition(
                "v1".to_string(),
                "u1",
                &VoteTarget::Chapter("missing".to_string()),
                |_| (INSERT_LIKE, ()),
            )
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_apply_transition_rejects_mismatched_op() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(1)]])
                .append_query_results([Vec::<vote::Model>::new()])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let result = repo
            .apply_transition(
                "v1".to_string(),
                "u1",
                &VoteTarget::Novel("n1".to_string()),
                |_| {
                    (
                        LedgerChange {
                            op: LedgerOp::Delete,
                            like_delta: -1,
                            dislike_delta: 0,
                        },
                        (),
                    )
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    fn exec_none() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }
    }

    const REMOVE_LIKE: LedgerChange = LedgerChange {
        op: LedgerOp::Delete,
        like_delta: -1,
        dislike_delta: 0,
    };

    #[tokio::test]
    async fn test_apply_transition_lost_delete_is_conflict() {
        // Another transition already removed the vote: the delete matches no
        // row and the counter update must not run.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(1)]])
                .append_query_results([[create_test_vote("v1", true)]])
                .append_exec_results([exec_none()])
                .into_connection(),
        );

        let repo = VoteRepository::new(db.clone());
        let result = repo
            .apply_transition(
                "v2".to_string(),
                "u1",
                &VoteTarget::Novel("n1".to_string()),
                |_| (REMOVE_LIKE, ()),
            )
            .await;
        drop(repo);

        assert!(matches!(result, Err(AppError::Conflict(_))));

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let statements = format!("{log:?}");
        // The only UPDATE is the row lock; no counter write was issued
        assert!(statements.contains("FOR UPDATE"));
        assert_eq!(statements.matches("UPDATE").count(), 1);
    }

    #[tokio::test]
    async fn test_apply_transition_lost_flip_is_conflict() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(1)]])
                .append_query_results([[create_test_vote("v1", false)]])
                .append_exec_results([exec_none()])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let result = repo
            .apply_transition(
                "v2".to_string(),
                "u1",
                &VoteTarget::Novel("n1".to_string()),
                |_| {
                    (
                        LedgerChange {
                            op: LedgerOp::SetPolarity { is_like: true },
                            like_delta: 1,
                            dislike_delta: -1,
                        },
                        (),
                    )
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_apply_transition_removes_vote() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(1)]])
                .append_query_results([[create_test_vote("v1", true)]])
                .append_exec_results([exec_ok(), exec_ok()])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let result = repo
            .apply_transition(
                "v2".to_string(),
                "u1",
                &VoteTarget::Novel("n1".to_string()),
                |existing| (REMOVE_LIKE, existing),
            )
            .await
            .unwrap();

        assert_eq!(result, Some(true));
    }
}
