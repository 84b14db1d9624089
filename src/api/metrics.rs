//! Prometheus metrics endpoint.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};

use crate::error::AppError;
use crate::metrics;
use crate::server::AppState;

/// GET /metrics - Prometheus metrics endpoint
pub async fn prometheus_metrics(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    update_metrics_from_state(&state);

    let output = metrics::encode_metrics()?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        output,
    ))
}

/// Refresh gauges that are read from state rather than updated in place
fn update_metrics_from_state(state: &AppState) {
    let connected = state.redis_health.is_healthy();
    metrics::REDIS_CONNECTION_STATUS.set(if connected { 1 } else { 0 });

    let worker = state.worker.stats();
    metrics::TASKS_QUEUED.set(worker.queued as i64);
}
