//! `GET /health`.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Liveness body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the server answers.
    pub status: &'static str,
    /// Open WebSocket sessions.
    pub connections: usize,
    /// Upstream model in use.
    pub model: String,
}

/// Report liveness and the open session count.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: state.registry.len(),
        model: state.provider.model().to_string(),
    })
}
