//! Subscriber resolution.
//!
//! A [`SubscriberResolver`] answers "who should hear about this post on this
//! channel for this event". Every store applies the same eligibility rules from
//! [`policy`]; stores only differ in where users and post subscriptions live:
//!
//! - `MemorySubscriberStore`: `DashMap` directory, used in tests and local runs
//! - `RedisSubscriberStore`: per-tenant Redis hashes
//!
//! Use `create_subscriber_resolver()` to pick one from configuration.

mod memory_store;
pub mod policy;
mod redis_store;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::DirectoryConfig;
use crate::domain::{NotificationChannel, NotificationEvent, Post, User};
use crate::redis::RedisPool;

pub use memory_store::MemorySubscriberStore;
pub use redis_store::RedisSubscriberStore;

/// Errors raised while looking up subscribers
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The subscription store could not be reached
    #[error("Subscription store unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be decoded
    #[error("Corrupt subscription data: {0}")]
    Corrupt(String),
}

/// Resolves the users to notify for a post on a channel.
///
/// Implementations are read-only. Results contain active users only, ordered
/// by user id and free of duplicates.
#[async_trait]
pub trait SubscriberResolver: Send + Sync {
    async fn resolve(
        &self,
        post: &Post,
        channel: NotificationChannel,
        event: NotificationEvent,
    ) -> Result<Vec<User>, ResolverError>;
}

/// Create a subscriber resolver based on configuration.
///
/// - `"redis"`: `RedisSubscriberStore` if a Redis pool is provided
/// - `"memory"` (default): an empty `MemorySubscriberStore`
pub fn create_subscriber_resolver(
    settings: &DirectoryConfig,
    redis_pool: Option<Arc<RedisPool>>,
) -> Arc<dyn SubscriberResolver> {
    match settings.backend.as_str() {
        "redis" => {
            if let Some(pool) = redis_pool {
                tracing::info!(
                    backend = "redis",
                    prefix = %settings.redis_prefix,
                    "Creating Redis subscriber store"
                );
                Arc::new(RedisSubscriberStore::new(
                    pool,
                    settings.redis_prefix.clone(),
                ))
            } else {
                tracing::warn!(
                    "Redis subscriber store requested but no pool provided, falling back to memory"
                );
                Arc::new(MemorySubscriberStore::new())
            }
        }
        _ => {
            tracing::info!(backend = "memory", "Creating memory subscriber store");
            Arc::new(MemorySubscriberStore::new())
        }
    }
}
