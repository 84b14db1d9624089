//! Redis connectivity
//!
//! - `RedisPool`: shared multiplexed connection for commands
//! - `ExponentialBackoff`: reconnection delays for the Pub/Sub trigger
//! - `RedisHealth`: connection health shared with the ops endpoints

mod backoff;
mod health;
pub mod pool;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use health::{RedisHealth, RedisHealthStats, RedisHealthStatus};
pub use pool::{PoolError, RedisPool};
