//! Repositories: one per entity, each wrapping a shared connection pool.

mod chapter;
mod comment;
mod novel;
mod user;
mod vote;

pub use chapter::{ChapterRepository, ChapterUpdate};
pub use comment::CommentRepository;
pub use novel::{NovelListQuery, NovelRepository, NovelSort, NovelUpdate};
pub use user::UserRepository;
pub use vote::{LedgerChange, LedgerOp, VoteRepository, VoteTarget};

use novelhub_common::AppError;
use sea_orm::{DbErr, SqlErr};

/// Build a `%…%` LIKE pattern with the wildcard characters of `query` escaped.
pub(crate) fn contains_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Map an insert/update error, reporting unique-index violations as conflicts.
pub(crate) fn map_write_err(err: DbErr, conflict: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(conflict.to_string()),
        _ => AppError::Database(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("abc"), "%abc%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_map_write_err_plain_error_is_database() {
        let err = map_write_err(DbErr::Custom("boom".to_string()), "taken");
        assert!(matches!(err, AppError::Database(_)));
    }
}
