use std::sync::Arc;

use futures::StreamExt;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::RedisConfig;
use crate::domain::{Post, Tenant, User};
use crate::metrics::TriggerMetrics;
use crate::redis::{ExponentialBackoff, RedisHealth};
use crate::tasks::{NotificationDeps, NotifyAboutNewPost, TaskContext};
use crate::worker::Worker;

/// Message published when a post is created
#[derive(Debug, Deserialize)]
pub struct PostCreatedMessage {
    pub tenant: Tenant,
    /// User who created the post
    pub author: User,
    pub post: Post,
    /// Overrides the tenant locale
    #[serde(default)]
    pub locale: Option<String>,
}

/// Why a trigger message was dropped
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Invalid message: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Post {post_id} belongs to tenant {post_tenant}, message is for tenant {tenant}")]
    TenantMismatch {
        post_id: i64,
        post_tenant: i64,
        tenant: i64,
    },
}

impl TriggerError {
    /// Label used for the rejected-messages metric
    fn reason(&self) -> &'static str {
        match self {
            TriggerError::Parse(_) => "parse_error",
            TriggerError::TenantMismatch { .. } => "tenant_mismatch",
        }
    }
}

impl PostCreatedMessage {
    pub fn parse(payload: &str) -> Result<Self, TriggerError> {
        let message: PostCreatedMessage = serde_json::from_str(payload)?;

        if message.post.tenant_id != message.tenant.id {
            return Err(TriggerError::TenantMismatch {
                post_id: message.post.id,
                post_tenant: message.post.tenant_id,
                tenant: message.tenant.id,
            });
        }

        Ok(message)
    }

    pub fn into_task(self, deps: &NotificationDeps) -> NotifyAboutNewPost {
        let mut ctx = TaskContext::new(self.tenant, self.author);
        if let Some(locale) = self.locale {
            ctx = ctx.with_locale(locale);
        }
        NotifyAboutNewPost::new(ctx, self.post, deps)
    }
}

/// Redis Pub/Sub intake of "post created" messages
pub struct PostCreatedSubscriber {
    config: RedisConfig,
    worker: Worker,
    deps: NotificationDeps,
    health: Arc<RedisHealth>,
    shutdown: broadcast::Sender<()>,
}

impl PostCreatedSubscriber {
    pub fn new(
        config: RedisConfig,
        worker: Worker,
        deps: NotificationDeps,
        health: Arc<RedisHealth>,
        shutdown: broadcast::Sender<()>,
    ) -> Self {
        Self {
            config,
            worker,
            deps,
            health,
            shutdown,
        }
    }

    /// Run until a shutdown signal arrives, reconnecting with exponential backoff
    pub async fn start(&self) -> anyhow::Result<()> {
        let channels = self.config.channels.clone();
        if channels.is_empty() {
            tracing::info!("No trigger channels configured, skipping Redis subscriber");
            return Ok(());
        }

        tracing::info!(channels = ?channels, "Starting post created subscriber");

        let mut backoff = ExponentialBackoff::new();
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            match self.run_subscription_loop(&channels, &mut backoff).await {
                Ok(()) => {
                    tracing::info!("Post created subscriber stopped gracefully");
                    break;
                }
                Err(e) => {
                    self.health.set_reconnecting();
                    let delay = backoff.next_delay();
                    tracing::error!(
                        error = %e,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "Redis subscription error, reconnecting"
                    );

                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            tracing::info!("Shutdown requested while reconnecting");
                            break;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        Ok(())
    }

    async fn run_subscription_loop(
        &self,
        channels: &[String],
        backoff: &mut ExponentialBackoff,
    ) -> anyhow::Result<()> {
        let client = redis::Client::open(self.config.url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;

        for channel in channels {
            if channel.contains('*') || channel.contains('?') || channel.contains('[') {
                pubsub.psubscribe(channel).await?;
                tracing::debug!(pattern = %channel, "Subscribed to pattern");
            } else {
                pubsub.subscribe(channel).await?;
                tracing::debug!(channel = %channel, "Subscribed to channel");
            }
        }

        self.health.set_connected();
        backoff.reset();
        tracing::info!("Redis subscription established");

        let mut message_stream = pubsub.on_message();
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Received shutdown signal");
                    return Ok(());
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(msg) => {
                            let channel = msg.get_channel_name().to_string();
                            let payload: String = match msg.get_payload() {
                                Ok(p) => p,
                                Err(e) => {
                                    TriggerMetrics::record_rejected("payload_error");
                                    tracing::warn!(error = %e, "Failed to get message payload");
                                    continue;
                                }
                            };

                            self.handle_message(&channel, &payload).await;
                        }
                        None => {
                            anyhow::bail!("Redis message stream ended");
                        }
                    }
                }
            }
        }
    }

    async fn handle_message(&self, channel: &str, payload: &str) {
        TriggerMetrics::record_received();

        let message = match PostCreatedMessage::parse(payload) {
            Ok(m) => m,
            Err(e) => {
                TriggerMetrics::record_rejected(e.reason());
                tracing::warn!(
                    error = %e,
                    channel = %channel,
                    "Dropping post created message"
                );
                return;
            }
        };

        let post_id = message.post.id;
        let tenant_id = message.tenant.id;
        let task = message.into_task(&self.deps);

        match self.worker.enqueue(Box::new(task)).await {
            Ok(()) => {
                tracing::debug!(channel = %channel, post_id, tenant_id, "Queued new post notification");
            }
            Err(e) => {
                TriggerMetrics::record_rejected("worker_unavailable");
                tracing::error!(error = %e, post_id, tenant_id, "Failed to queue new post notification");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(tenant_id: i64, post_tenant_id: i64) -> serde_json::Value {
        json!({
            "tenant": {
                "id": tenant_id,
                "name": "Acme",
                "base_url": "https://x.io",
                "logo_url": "https://x.io/logo.png"
            },
            "author": {"id": 1, "name": "Jon", "email": "jon@x.io", "role": "administrator"},
            "post": {
                "id": 70,
                "tenant_id": post_tenant_id,
                "number": 7,
                "slug": "improve-search",
                "title": "Improve search",
                "description": "Make it *fast*",
                "created_at": "2024-05-01T10:00:00Z",
                "author_id": 1
            }
        })
    }

    #[test]
    fn test_parse_post_created_message() {
        let parsed = PostCreatedMessage::parse(&message(3, 3).to_string()).unwrap();

        assert_eq!(parsed.tenant.id, 3);
        assert_eq!(parsed.author.name, "Jon");
        assert_eq!(parsed.post.number, 7);
        assert_eq!(parsed.post.votes_count, 0);
        assert!(parsed.locale.is_none());
    }

    #[test]
    fn test_parse_with_locale_override() {
        let mut value = message(3, 3);
        value["locale"] = json!("pt-BR");

        let parsed = PostCreatedMessage::parse(&value.to_string()).unwrap();
        assert_eq!(parsed.locale.as_deref(), Some("pt-BR"));
    }

    #[test]
    fn test_rejects_malformed_message() {
        let err = PostCreatedMessage::parse(r#"{"tenant": 1}"#).unwrap_err();
        assert_eq!(err.reason(), "parse_error");
    }

    #[test]
    fn test_rejects_post_from_other_tenant() {
        let err = PostCreatedMessage::parse(&message(3, 4).to_string()).unwrap_err();
        assert!(matches!(
            err,
            TriggerError::TenantMismatch {
                post_id: 70,
                post_tenant: 4,
                tenant: 3
            }
        ));
        assert_eq!(err.reason(), "tenant_mismatch");
    }
}
