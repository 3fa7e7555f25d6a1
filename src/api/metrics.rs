//! Prometheus metrics endpoint

use crate::server::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Prometheus metrics in text exposition format.
///
/// Returns 404 when the recorder was not installed (for example when a test
/// harness builds the router without telemetry).
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics_handle.as_ref() {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics not enabled").into_response(),
    }
}
