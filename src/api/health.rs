//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::redis::RedisHealthStatus;
use crate::server::AppState;
use crate::worker::WorkerStatsSnapshot;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub redis: RedisHealthResponse,
    pub worker: WorkerStatsSnapshot,
    pub directory_backend: String,
}

#[derive(Debug, Serialize)]
pub struct RedisHealthResponse {
    pub status: String,
    pub connected: bool,
    pub reconnection_attempts: u32,
    pub total_reconnections: u32,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let redis_health = state.redis_health.stats();
    let is_redis_healthy = redis_health.status == RedisHealthStatus::Healthy;

    let status = if is_redis_healthy { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        redis: RedisHealthResponse {
            status: redis_health.status.as_str().to_string(),
            connected: is_redis_healthy,
            reconnection_attempts: redis_health.reconnection_attempts,
            total_reconnections: redis_health.total_reconnections,
        },
        worker: state.worker.stats(),
        directory_backend: state.settings.directory.backend.clone(),
    })
}
