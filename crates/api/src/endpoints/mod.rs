//! API endpoints.

#![allow(missing_docs)]

mod admin;
mod auth;
mod chapters;
mod comments;
mod generate;
mod me;
mod novels;
mod votes;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(me::router())
        .merge(novels::router())
        .merge(generate::router())
        .merge(chapters::router())
        .merge(comments::router())
        .merge(votes::router())
        .merge(admin::router())
}
