//! Vote service: like/dislike reactions on novels and chapters.
//!
//! The transition table lives in [`VoteTransition::resolve`], a pure function
//! of the existing and requested polarity. The repository runs it inside the
//! same transaction as the ledger write and counter update.

use novelhub_common::{AppError, AppResult, IdGenerator};
use novelhub_db::repositories::{LedgerChange, LedgerOp, VoteRepository, VoteTarget};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::services::auth::AuthContext;

/// Outcome of a vote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    /// No previous vote; one was recorded
    Created,
    /// Same polarity as before; the vote was withdrawn
    Removed,
    /// Opposite polarity; the vote was flipped
    Changed,
}

/// A resolved transition: what happened and what to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTransition {
    pub action: VoteAction,
    pub change: LedgerChange,
}

impl VoteTransition {
    /// Decide the ledger write and counter deltas for a request.
    #[must_use]
    pub const fn resolve(existing: Option<bool>, is_like: bool) -> Self {
        let (like, dislike) = if is_like { (1, 0) } else { (0, 1) };

        match existing {
            None => Self {
                action: VoteAction::Created,
                change: LedgerChange {
                    op: LedgerOp::Insert { is_like },
                    like_delta: like,
                    dislike_delta: dislike,
                },
            },
            Some(prev) if prev == is_like => Self {
                action: VoteAction::Removed,
                change: LedgerChange {
                    op: LedgerOp::Delete,
                    like_delta: -like,
                    dislike_delta: -dislike,
                },
            },
            Some(_) => Self {
                action: VoteAction::Changed,
                change: LedgerChange {
                    op: LedgerOp::SetPolarity { is_like },
                    like_delta: like - dislike,
                    dislike_delta: dislike - like,
                },
            },
        }
    }
}

/// Request body for casting a vote.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoteInput {
    pub novel_id: Option<String>,
    pub chapter_id: Option<String>,
    pub is_like: Option<bool>,
}

/// Query for looking up the caller's vote.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoteLookup {
    pub novel_id: Option<String>,
    pub chapter_id: Option<String>,
}

/// Response of a vote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
    pub action: VoteAction,
}

/// The caller's current vote on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyVote {
    pub is_like: Option<bool>,
}

/// Vote service for business logic.
#[derive(Clone)]
pub struct VoteService {
    vote_repo: VoteRepository,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(vote_repo: VoteRepository) -> Self {
        Self {
            vote_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Cast, withdraw or flip the caller's vote on a novel or chapter.
    pub async fn vote(&self, ctx: &AuthContext, input: VoteInput) -> AppResult<VoteOutcome> {
        let target = parse_target(input.novel_id, input.chapter_id)?;
        let is_like = input
            .is_like
            .ok_or_else(|| AppError::Validation("isLike is required".to_string()))?;

        let action = self
            .vote_repo
            .apply_transition(self.id_gen.generate(), &ctx.user_id, &target, |existing| {
                let transition = VoteTransition::resolve(existing, is_like);
                (transition.change, transition.action)
            })
            .await?;

        info!(
            user_id = %ctx.user_id,
            target = target.kind(),
            target_id = target.id(),
            ?action,
            "Vote applied"
        );

        Ok(VoteOutcome { action })
    }

    /// The caller's current polarity on a target, if any.
    pub async fn my_vote(&self, ctx: &AuthContext, lookup: VoteLookup) -> AppResult<MyVote> {
        let target = parse_target(lookup.novel_id, lookup.chapter_id)?;
        let vote = self
            .vote_repo
            .find_by_user_and_target(&ctx.user_id, &target)
            .await?;

        Ok(MyVote {
            is_like: vote.map(|v| v.is_like),
        })
    }
}

/// Exactly one of the two IDs must be present.
fn parse_target(novel_id: Option<String>, chapter_id: Option<String>) -> AppResult<VoteTarget> {
    let novel_id = novel_id.filter(|id| !id.is_empty());
    let chapter_id = chapter_id.filter(|id| !id.is_empty());

    match (novel_id, chapter_id) {
        (Some(id), None) => Ok(VoteTarget::Novel(id)),
        (None, Some(id)) => Ok(VoteTarget::Chapter(id)),
        (None, None) => Err(AppError::Validation(
            "Either novelId or chapterId is required".to_string(),
        )),
        (Some(_), Some(_)) => Err(AppError::Validation(
            "Only one of novelId or chapterId may be given".to_string(),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use novelhub_db::entities::{user::UserRole, vote};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn exec_ok() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! { "num_items" => sea_orm::Value::BigInt(Some(n)) }
    }

    #[test]
    fn test_transition_table() {
        let cases = [
            (None, true, VoteAction::Created, LedgerOp::Insert { is_like: true }, 1, 0),
            (None, false, VoteAction::Created, LedgerOp::Insert { is_like: false }, 0, 1),
            (Some(true), true, VoteAction::Removed, LedgerOp::Delete, -1, 0),
            (Some(false), false, VoteAction::Removed, LedgerOp::Delete, 0, -1),
            (
                Some(false),
                true,
                VoteAction::Changed,
                LedgerOp::SetPolarity { is_like: true },
                1,
                -1,
            ),
            (
                Some(true),
                false,
                VoteAction::Changed,
                LedgerOp::SetPolarity { is_like: false },
                -1,
                1,
            ),
        ];

        for (existing, is_like, action, op, like_delta, dislike_delta) in cases {
            let t = VoteTransition::resolve(existing, is_like);
            assert_eq!(t.action, action, "{existing:?} -> {is_like}");
            assert_eq!(t.change.op, op);
            assert_eq!(t.change.like_delta, like_delta);
            assert_eq!(t.change.dislike_delta, dislike_delta);
        }
    }

    /// Replays requests against an in-memory ledger and checks the counters
    /// against a recount after every step.
    #[test]
    fn test_replay_keeps_counters_equal_to_recount() {
        let requests = [
            ("u1", true),
            ("u2", false),
            ("u1", true),
            ("u1", false),
            ("u2", true),
            ("u3", true),
            ("u2", true),
            ("u3", false),
            ("u1", false),
            ("u1", true),
        ];

        let mut ledger: HashMap<&str, bool> = HashMap::new();
        let (mut likes, mut dislikes) = (0_i32, 0_i32);

        for (user, is_like) in requests {
            let t = VoteTransition::resolve(ledger.get(user).copied(), is_like);
            match t.change.op {
                LedgerOp::Insert { is_like } | LedgerOp::SetPolarity { is_like } => {
                    ledger.insert(user, is_like);
                }
                LedgerOp::Delete => {
                    ledger.remove(user);
                }
            }
            likes += t.change.like_delta;
            dislikes += t.change.dislike_delta;

            let recount_likes = ledger.values().filter(|v| **v).count();
            let recount_dislikes = ledger.values().filter(|v| !**v).count();
            assert_eq!(likes, i32::try_from(recount_likes).unwrap());
            assert_eq!(dislikes, i32::try_from(recount_dislikes).unwrap());
            assert!(likes >= 0 && dislikes >= 0);
        }
    }

    #[test]
    fn test_action_serializes_lowercase() {
        let json = serde_json::to_string(&VoteOutcome {
            action: VoteAction::Changed,
        })
        .unwrap();
        assert_eq!(json, r#"{"action":"changed"}"#);
    }

    #[test]
    fn test_parse_target_requires_exactly_one() {
        assert!(matches!(
            parse_target(None, None),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            parse_target(Some("n1".into()), Some("c1".into())),
            Err(AppError::Validation(_))
        ));
        assert_eq!(
            parse_target(Some("n1".into()), None).unwrap(),
            VoteTarget::Novel("n1".into())
        );
        assert_eq!(
            parse_target(Some(String::new()), Some("c1".into())).unwrap(),
            VoteTarget::Chapter("c1".into())
        );
    }

    #[tokio::test]
    async fn test_vote_missing_is_like_is_validation_error() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = VoteService::new(VoteRepository::new(db));

        let result = service
            .vote(
                &AuthContext::new("u1", UserRole::User),
                VoteInput {
                    novel_id: Some("n1".to_string()),
                    chapter_id: None,
                    is_like: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_vote_first_like_is_created() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(1)]])
                .append_query_results([Vec::<vote::Model>::new()])
                .append_exec_results([exec_ok(), exec_ok()])
                .into_connection(),
        );
        let service = VoteService::new(VoteRepository::new(db));

        let outcome = service
            .vote(
                &AuthContext::new("u1", UserRole::User),
                VoteInput {
                    novel_id: Some("n1".to_string()),
                    chapter_id: None,
                    is_like: Some(true),
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.action, VoteAction::Created);
    }

    #[tokio::test]
    async fn test_vote_repeat_dislike_is_removed() {
        let existing = vote::Model {
            id: "v1".to_string(),
            user_id: "u1".to_string(),
            novel_id: None,
            chapter_id: Some("c1".to_string()),
            is_like: false,
            created_at: Utc::now().into(),
            updated_at: None,
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(1)]])
                .append_query_results([[existing]])
                .append_exec_results([exec_ok(), exec_ok()])
                .into_connection(),
        );
        let service = VoteService::new(VoteRepository::new(db));

        let outcome = service
            .vote(
                &AuthContext::new("u1", UserRole::User),
                VoteInput {
                    novel_id: None,
                    chapter_id: Some("c1".to_string()),
                    is_like: Some(false),
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.action, VoteAction::Removed);
    }

    #[tokio::test]
    async fn test_my_vote_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<vote::Model>::new()])
                .into_connection(),
        );
        let service = VoteService::new(VoteRepository::new(db));

        let mine = service
            .my_vote(
                &AuthContext::new("u1", UserRole::User),
                VoteLookup {
                    novel_id: Some("n1".to_string()),
                    chapter_id: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(mine.is_like, None);
    }
}
