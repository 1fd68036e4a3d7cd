//! Prometheus metrics recorder and `/metrics` endpoint handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::errors::RelayError;
use crate::state::AppState;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at startup before any metrics are recorded.
pub fn install_recorder() -> Result<PrometheusHandle, RelayError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| RelayError::Metrics(e.to_string()))?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// `GET /metrics`: Prometheus text format, or 404 when no recorder is installed.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// WebSocket connection duration seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Relay turns started (counter, labels: transport).
pub const RELAY_TURNS_TOTAL: &str = "relay_turns_total";
/// Relay turns ended by an upstream failure (counter, labels: transport).
pub const RELAY_TURN_ERRORS_TOTAL: &str = "relay_turn_errors_total";
/// Fragments forwarded to clients (counter, labels: transport).
pub const RELAY_FRAGMENTS_TOTAL: &str = "relay_fragments_total";
/// Directed sends dropped because the session was gone (counter).
pub const RELAY_SENDS_DROPPED_TOTAL: &str = "relay_sends_dropped_total";
/// One-shot requests accepted (counter).
pub const QUERY_REQUESTS_TOTAL: &str = "query_requests_total";
/// One-shot requests rejected as invalid (counter).
pub const QUERY_REJECTED_TOTAL: &str = "query_rejected_total";
