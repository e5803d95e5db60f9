//! HTTP API layer for novelhub.
//!
//! - **Endpoints**: auth, novels, chapters, comments, votes, admin, AI writing
//! - **Extractors**: authentication context and JSON/query bodies that reject
//!   with [`novelhub_common::AppError`]
//! - **Middleware**: bearer-token authentication
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use axum::Router;

pub use endpoints::router;
pub use middleware::AppState;

/// The API router nested under `/api` with authentication applied.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .with_state(state)
}
