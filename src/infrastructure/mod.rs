//! Infrastructure layer modules
//!
//! This module contains shared infrastructure components:
//! - `config`: Application configuration and settings
//! - `error`: Hosting error type
//! - `metrics`: Prometheus metrics helpers
//! - `redis`: Redis connection pool, backoff, and health tracking

pub mod config;
pub mod error;
pub mod metrics;
pub mod redis;
