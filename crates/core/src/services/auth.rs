//! Per-request identity.
//!
//! Every mutating service call takes an [`AuthContext`] explicitly; nothing in
//! the core reads ambient session state.

use novelhub_common::{AppError, AppResult};
use novelhub_db::entities::user::{self, UserRole};

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub role: UserRole,
}

impl AuthContext {
    /// Create a context for a user ID and role.
    #[must_use]
    pub fn new(user_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// Build the context for a loaded user row.
    #[must_use]
    pub fn from_user(user: &user::Model) -> Self {
        Self::new(user.id.clone(), user.role)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Owners and administrators may modify a resource.
    #[must_use]
    pub fn can_modify(&self, owner_id: &str) -> bool {
        self.user_id == owner_id || self.is_admin()
    }

    /// Fail with `Forbidden` unless the caller may modify a resource owned by `owner_id`.
    pub fn ensure_can_modify(&self, owner_id: &str) -> AppResult<()> {
        if self.can_modify(owner_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You do not have permission to modify this resource".to_string(),
            ))
        }
    }

    /// Fail with `Forbidden` unless the caller is an administrator.
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Administrator privileges required".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_can_modify() {
        let ctx = AuthContext::new("u1", UserRole::User);
        assert!(ctx.can_modify("u1"));
        assert!(!ctx.can_modify("u2"));
        assert!(ctx.ensure_can_modify("u1").is_ok());
        assert!(matches!(
            ctx.ensure_can_modify("u2"),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_can_modify_anything() {
        let ctx = AuthContext::new("admin", UserRole::Admin);
        assert!(ctx.can_modify("u1"));
        assert!(ctx.require_admin().is_ok());
    }

    #[test]
    fn test_require_admin_rejects_user() {
        let ctx = AuthContext::new("u1", UserRole::User);
        assert!(matches!(ctx.require_admin(), Err(AppError::Forbidden(_))));
    }
}
