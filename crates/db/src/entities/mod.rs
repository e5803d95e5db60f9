//! Database entities.

#![allow(missing_docs)]

pub mod chapter;
pub mod comment;
pub mod novel;
pub mod user;
pub mod vote;

pub use chapter::Entity as Chapter;
pub use comment::Entity as Comment;
pub use novel::Entity as Novel;
pub use user::Entity as User;
pub use vote::Entity as Vote;
