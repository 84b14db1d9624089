//! Redis-backed subscriber directory.
//!
//! Key layout (owned by the directory writer, read-only here):
//!
//! - `{prefix}:{tenant_id}:users`: hash, field = user id, value = JSON user
//! - `{prefix}:{tenant_id}:post:{post_id}:subscribers`: hash, field = user id,
//!   value = `subscribed` | `unsubscribed`
//!
//! The post subscription hash is only read for post-scoped events.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    EntityId, NotificationChannel, NotificationEvent, Post, SubscriptionStatus, User,
};
use crate::redis::{PoolError, RedisPool};

use super::policy;
use super::{ResolverError, SubscriberResolver};

pub struct RedisSubscriberStore {
    pool: Arc<RedisPool>,
    prefix: String,
}

impl RedisSubscriberStore {
    pub fn new(pool: Arc<RedisPool>, prefix: String) -> Self {
        Self { pool, prefix }
    }

    fn users_key(&self, tenant_id: EntityId) -> String {
        format!("{}:{}:users", self.prefix, tenant_id)
    }

    fn post_subscribers_key(&self, tenant_id: EntityId, post_id: EntityId) -> String {
        format!("{}:{}:post:{}:subscribers", self.prefix, tenant_id, post_id)
    }

    async fn load_subscriptions(
        &self,
        post: &Post,
    ) -> Result<HashMap<EntityId, SubscriptionStatus>, ResolverError> {
        let raw = self
            .pool
            .hgetall(&self.post_subscribers_key(post.tenant_id, post.id))
            .await
            .map_err(unavailable)?;
        decode_subscriptions(raw)
    }
}

fn unavailable(err: PoolError) -> ResolverError {
    ResolverError::Unavailable(err.to_string())
}

fn decode_users(raw: HashMap<String, String>) -> Result<Vec<User>, ResolverError> {
    raw.into_iter()
        .map(|(field, json)| {
            serde_json::from_str::<User>(&json)
                .map_err(|e| ResolverError::Corrupt(format!("user {}: {}", field, e)))
        })
        .collect()
}

fn decode_subscriptions(
    raw: HashMap<String, String>,
) -> Result<HashMap<EntityId, SubscriptionStatus>, ResolverError> {
    raw.into_iter()
        .map(|(field, value)| {
            let user_id = field
                .parse::<EntityId>()
                .map_err(|e| ResolverError::Corrupt(format!("subscriber id '{}': {}", field, e)))?;
            let status = value
                .parse::<SubscriptionStatus>()
                .map_err(ResolverError::Corrupt)?;
            Ok((user_id, status))
        })
        .collect()
}

#[async_trait]
impl SubscriberResolver for RedisSubscriberStore {
    #[tracing::instrument(
        name = "subscribers.resolve",
        skip(self, post),
        fields(backend = "redis", post_id = post.id, tenant_id = post.tenant_id)
    )]
    async fn resolve(
        &self,
        post: &Post,
        channel: NotificationChannel,
        event: NotificationEvent,
    ) -> Result<Vec<User>, ResolverError> {
        let raw_users = self
            .pool
            .hgetall(&self.users_key(post.tenant_id))
            .await
            .map_err(unavailable)?;
        let users = decode_users(raw_users)?;

        let subscriptions = if event.is_post_scoped() {
            self.load_subscriptions(post).await?
        } else {
            HashMap::new()
        };

        let eligible = users
            .into_iter()
            .filter(|user| {
                policy::is_eligible(user, channel, event, subscriptions.get(&user.id).copied())
            })
            .collect();

        let eligible = policy::normalize(eligible);
        tracing::debug!(count = eligible.len(), "Resolved subscribers");
        Ok(eligible)
    }
}
