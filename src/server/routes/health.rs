use crate::server::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// Liveness probe.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let ctx = state.pipeline.ctx();
    Json(json!({
        "status": "healthy",
        "service": "message-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": ctx.backend.name(),
        "store": ctx.store.name(),
        "telegram": state.telegram.is_some(),
    }))
}
