//! Business logic services.

#![allow(missing_docs)]

pub mod admin;
pub mod auth;
pub mod chapter;
pub mod comment;
pub mod generation;
pub mod novel;
pub mod user;
pub mod views;
pub mod vote;

pub use admin::{AdminNovelQuery, AdminService, AdminUserQuery, SetRoleInput};
pub use auth::AuthContext;
pub use chapter::{ChapterService, CreateChapterInput, UpdateChapterInput};
pub use comment::{CommentService, CreateCommentInput, UpdateCommentInput};
pub use generation::{CompletionClient, GenerateInput, GenerationService, OpenAiClient};
pub use novel::{CreateNovelInput, ListNovelsQuery, NovelService, UpdateNovelInput};
pub use user::{RegisterInput, SignInInput, UserService};
pub use vote::{VoteAction, VoteInput, VoteLookup, VoteService, VoteTransition};
