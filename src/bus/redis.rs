//! Redis Pub/Sub command bus.
//!
//! Each command kind goes to its own channel under the configured prefix:
//!
//! | Command | Channel |
//! |---------|---------|
//! | `AddWebNotification` | `{prefix}:web_notification` |
//! | `SendMail` | `{prefix}:send_mail` |
//! | `TriggerWebhooks` | `{prefix}:webhooks` |
//!
//! Payloads are the JSON form of [`Command`], tagged with `"command"`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::metrics::CommandMetrics;
use crate::redis::RedisPool;

use super::{BusError, Command, CommandBus, CommandKind};

pub struct RedisCommandBus {
    pool: Arc<RedisPool>,
    prefix: String,
}

impl RedisCommandBus {
    pub fn new(pool: Arc<RedisPool>, prefix: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
        }
    }

    /// Channel a command kind is published to
    pub fn channel_for(&self, kind: CommandKind) -> String {
        let suffix = match kind {
            CommandKind::AddWebNotification => "web_notification",
            CommandKind::SendMail => "send_mail",
            CommandKind::TriggerWebhooks => "webhooks",
        };
        format!("{}:{}", self.prefix, suffix)
    }

    async fn deliver(pool: &RedisPool, channel: &str, command: &Command) -> Result<i64, BusError> {
        let payload = serde_json::to_string(command)?;
        pool.publish(channel, &payload)
            .await
            .map_err(|e| BusError::Transport(e.to_string()))
    }
}

#[async_trait]
impl CommandBus for RedisCommandBus {
    #[tracing::instrument(name = "bus.send", skip(self, command), fields(bus = "redis", command = %command.kind()))]
    async fn send(&self, command: Command) -> Result<(), BusError> {
        let kind = command.kind();
        let channel = self.channel_for(kind);

        match Self::deliver(&self.pool, &channel, &command).await {
            Ok(receivers) => {
                CommandMetrics::record_sent(kind.as_str());
                if receivers == 0 {
                    tracing::warn!(channel = %channel, "No subscriber received command");
                }
                Ok(())
            }
            Err(e) => {
                CommandMetrics::record_failed(kind.as_str());
                Err(e)
            }
        }
    }

    fn publish(&self, command: Command) {
        let kind = command.kind();
        let channel = self.channel_for(kind);
        let pool = self.pool.clone();
        CommandMetrics::record_published(kind.as_str());

        tokio::spawn(async move {
            match Self::deliver(&pool, &channel, &command).await {
                Ok(receivers) => {
                    tracing::debug!(channel = %channel, receivers, "Published command");
                }
                Err(e) => {
                    CommandMetrics::record_failed(kind.as_str());
                    tracing::error!(channel = %channel, error = %e, "Failed to publish command");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::RedisConfig;
    use crate::redis::RedisHealth;

    fn bus(prefix: &str) -> RedisCommandBus {
        let pool = RedisPool::new(RedisConfig::default(), Arc::new(RedisHealth::new())).unwrap();
        RedisCommandBus::new(Arc::new(pool), prefix)
    }

    #[test]
    fn test_channel_per_command_kind() {
        let bus = bus("feedback:commands");

        assert_eq!(
            bus.channel_for(CommandKind::AddWebNotification),
            "feedback:commands:web_notification"
        );
        assert_eq!(
            bus.channel_for(CommandKind::SendMail),
            "feedback:commands:send_mail"
        );
        assert_eq!(
            bus.channel_for(CommandKind::TriggerWebhooks),
            "feedback:commands:webhooks"
        );
    }
}
