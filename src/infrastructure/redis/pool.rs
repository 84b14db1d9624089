//! Shared Redis connection for the command bus and subscriber directory.

use std::collections::HashMap;
use std::sync::Arc;

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError, RedisResult};
use tokio::sync::RwLock;

use crate::config::RedisConfig;

use super::RedisHealth;

/// Error type for Redis pool operations.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),
}

/// Lazily connected, multiplexed Redis connection.
///
/// The connection is dropped after a connection-level failure so the next
/// call reconnects. Pub/Sub uses its own dedicated connection.
pub struct RedisPool {
    client: Client,
    connection: RwLock<Option<MultiplexedConnection>>,
    health: Arc<RedisHealth>,
    config: RedisConfig,
}

impl RedisPool {
    pub fn new(config: RedisConfig, health: Arc<RedisHealth>) -> Result<Self, PoolError> {
        let client = Client::open(config.url.as_str())?;

        Ok(Self {
            client,
            connection: RwLock::new(None),
            health,
            config,
        })
    }

    pub async fn get_connection(&self) -> Result<MultiplexedConnection, PoolError> {
        {
            let conn = self.connection.read().await;
            if let Some(ref c) = *conn {
                return Ok(c.clone());
            }
        }

        self.connect().await
    }

    async fn connect(&self) -> Result<MultiplexedConnection, PoolError> {
        let mut conn_guard = self.connection.write().await;

        // Another task may have connected while we waited for the lock
        if let Some(ref c) = *conn_guard {
            return Ok(c.clone());
        }

        match self.client.get_multiplexed_tokio_connection().await {
            Ok(conn) => {
                *conn_guard = Some(conn.clone());
                self.health.set_connected();
                tracing::info!("Redis pool connection established");
                Ok(conn)
            }
            Err(e) => {
                self.health.set_reconnecting();
                tracing::error!(error = %e, "Failed to connect to Redis");
                Err(PoolError::Redis(e))
            }
        }
    }

    /// Run a command on the shared connection, resetting it on connection loss.
    pub async fn execute<F, T, Fut>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: std::future::Future<Output = RedisResult<T>>,
    {
        let conn = self.get_connection().await?;

        match f(conn).await {
            Ok(result) => Ok(result),
            Err(e) => {
                if e.is_connection_dropped() || e.is_io_error() {
                    let mut conn_guard = self.connection.write().await;
                    *conn_guard = None;
                    self.health.set_reconnecting();
                }
                Err(PoolError::Redis(e))
            }
        }
    }

    /// PUBLISH a payload, returning the number of receiving subscribers
    pub async fn publish(&self, channel: &str, payload: &str) -> Result<i64, PoolError> {
        let channel = channel.to_string();
        let payload = payload.to_string();
        self.execute(|mut conn| async move { conn.publish(channel, payload).await })
            .await
    }

    /// HGETALL a hash; a missing key yields an empty map
    pub async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, PoolError> {
        let key = key.to_string();
        self.execute(|mut conn| async move { conn.hgetall(key).await })
            .await
    }

    pub fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    pub fn health(&self) -> &Arc<RedisHealth> {
        &self.health
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub async fn ping(&self) -> Result<(), PoolError> {
        self.execute(|mut conn| async move {
            redis::cmd("PING").query_async::<String>(&mut conn).await
        })
        .await
        .map(|_| ())
    }
}
