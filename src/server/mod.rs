//! HTTP server for the chatbot API.
//!
//! Provides REST endpoints for:
//! - Chat (`/api/chat`, `/api/appointment-query`)
//! - Report summaries (`/api/summarize-report`)
//! - Conversation memory (`/api/clear`, `/api/history/{user_id}`)

pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Boxed error returned by the server entry points.
pub type ServerError = Box<dyn std::error::Error + Send + Sync>;

/// Router with the CORS and HTTP tracing layers applied.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve on `port` until Ctrl-C.
///
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn run_server(state: Arc<AppState>, port: u16) -> Result<(), ServerError> {
    run_server_with_shutdown(state, port, ctrl_c()).await
}

/// Serve on `port` until `shutdown_signal` completes.
///
/// In-flight requests finish before the server returns.
///
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn run_server_with_shutdown<F>(
    state: Arc<AppState>,
    port: u16,
    shutdown_signal: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let backend = state.config.llm.backend;
    let app = build_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %backend, "chatbot server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    tracing::info!("chatbot server stopped");
    Ok(())
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "ctrl-c handler unavailable; serving until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
