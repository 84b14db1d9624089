//! API layer - ops endpoint handlers.

mod health;
mod metrics;
mod routes;

pub use health::{health, HealthResponse, RedisHealthResponse};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
