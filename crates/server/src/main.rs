//! Novelhub server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use novelhub_api::AppState;
use novelhub_common::Config;
use novelhub_core::{CompletionClient, OpenAiClient};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "novelhub=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting novelhub server...");

    let config = Config::load()?;

    let db = novelhub_db::init(&config.database).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    novelhub_db::migrate(&db).await?;
    info!("Migrations completed");

    let completion_client: Option<Arc<dyn CompletionClient>> =
        match OpenAiClient::from_config(&config.generation) {
            Some(client) => {
                info!(model = %config.generation.model, "AI writing enabled");
                Some(Arc::new(client))
            }
            None => {
                warn!("No GITHUB_TOKEN or OPENAI_API_KEY set; AI writing disabled");
                None
            }
        };

    let state = AppState::new(Arc::new(db), completion_client);

    let app = novelhub_api::app(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
