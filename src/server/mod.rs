//! HTTP front end.
//!
//! - `POST /message` - JSON message through the pipeline
//! - `POST /upload` - multipart image + text through the pipeline
//! - `POST /telegram/send-message` - send a bot message
//! - `POST /telegram/webhook` - Bot API webhook
//! - `GET /telegram/webhook-info` - current webhook registration
//! - `GET /health` - liveness probe
//!
//! Successful pipeline calls answer `{"response": "..."}`. Failures answer
//! `{"error": {"code", "message", "context"}}` with the status of their
//! [`ErrorKind`](crate::ErrorKind).

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::Settings;
pub use error::{ServerError, ServerResult};
pub use state::AppState;

use crate::telegram::setup_webhook;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use middleware::{log_requests, request_id};
use routes::{health, message, not_found, telegram};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the router with all routes and middleware.
///
/// Middleware, outermost first: trace, request id, request logging,
/// timeout, body limit.
pub fn build_router(state: AppState) -> Router {
    let settings = state.settings.clone();

    Router::new()
        .route("/health", get(health::health_check))
        .route("/message", post(message::process_message))
        .route("/upload", post(message::upload))
        .route("/telegram/send-message", post(telegram::send_message))
        .route("/telegram/webhook", post(telegram::webhook))
        .route("/telegram/webhook-info", get(telegram::webhook_info))
        .fallback(not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(settings.max_body_size()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            settings.timeout(),
        ))
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Install the JSON `tracing` subscriber. Later calls are no-ops.
pub fn init_tracing(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .json()
        .try_init();
}

/// Start the server and block until Ctrl+C or SIGTERM.
///
/// Startup order: logging, collaborators, bucket bootstrap, Telegram
/// webhook registration, listener. Bootstrap and webhook failures are
/// logged and do not stop the server.
pub async fn start_server(settings: Settings) -> anyhow::Result<()> {
    init_tracing(&settings.log_level);

    let addr = settings.socket_addr()?;
    let state = AppState::from_settings(settings.clone()).await?;

    if let Err(f) = state.pipeline.ensure_storage().await {
        tracing::warn!(
            kind = %f.kind,
            message = %f.message,
            "continuing without bucket bootstrap"
        );
    }
    if let Some(bot) = &state.telegram {
        // logged inside; the bot still answers once the webhook is fixed
        let _ = setup_webhook(bot, &settings.telegram.webhook_url).await;
    }

    tracing::info!(
        addr = %addr,
        completion_url = %settings.completion.base_url,
        store = state.pipeline.ctx().store.name(),
        telegram = state.telegram.is_some(),
        timeout_secs = settings.timeout_secs,
        max_body_mb = settings.max_body_size_mb,
        "starting message relay"
    );

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
