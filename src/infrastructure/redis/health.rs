//! Redis connection health tracking

use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU8, Ordering};

use crate::metrics::REDIS_CONNECTION_STATUS;

/// Redis connection health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedisHealthStatus {
    Healthy,
    /// Disconnected, waiting for the next reconnect attempt
    Reconnecting,
}

impl RedisHealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedisHealthStatus::Healthy => "healthy",
            RedisHealthStatus::Reconnecting => "reconnecting",
        }
    }
}

/// Snapshot of Redis health for the ops endpoints
#[derive(Debug, Clone)]
pub struct RedisHealthStats {
    pub status: RedisHealthStatus,
    /// Milliseconds since epoch of the last successful connect, 0 if never
    pub last_connected_ms: i64,
    pub reconnection_attempts: u32,
    pub total_reconnections: u32,
}

/// Redis health tracker shared by the pool and the Pub/Sub trigger
pub struct RedisHealth {
    status: AtomicU8,
    last_connected: AtomicI64,
    reconnection_attempts: AtomicU32,
    total_reconnections: AtomicU32,
}

impl Default for RedisHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl RedisHealth {
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(RedisHealthStatus::Reconnecting as u8),
            last_connected: AtomicI64::new(0),
            reconnection_attempts: AtomicU32::new(0),
            total_reconnections: AtomicU32::new(0),
        }
    }

    pub fn set_connected(&self) {
        let previous = self
            .status
            .swap(RedisHealthStatus::Healthy as u8, Ordering::AcqRel);
        self.last_connected
            .store(chrono::Utc::now().timestamp_millis(), Ordering::Release);

        // The very first connect is not a reconnection
        if previous != RedisHealthStatus::Healthy as u8 && self.reconnection_attempts() > 0 {
            self.total_reconnections.fetch_add(1, Ordering::AcqRel);
        }
        self.reconnection_attempts.store(0, Ordering::Release);
        REDIS_CONNECTION_STATUS.set(1);
    }

    pub fn set_reconnecting(&self) {
        self.status
            .store(RedisHealthStatus::Reconnecting as u8, Ordering::Release);
        self.reconnection_attempts.fetch_add(1, Ordering::AcqRel);
        REDIS_CONNECTION_STATUS.set(0);
    }

    pub fn status(&self) -> RedisHealthStatus {
        match self.status.load(Ordering::Acquire) {
            0 => RedisHealthStatus::Healthy,
            _ => RedisHealthStatus::Reconnecting,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status() == RedisHealthStatus::Healthy
    }

    pub fn reconnection_attempts(&self) -> u32 {
        self.reconnection_attempts.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> RedisHealthStats {
        RedisHealthStats {
            status: self.status(),
            last_connected_ms: self.last_connected.load(Ordering::Acquire),
            reconnection_attempts: self.reconnection_attempts(),
            total_reconnections: self.total_reconnections.load(Ordering::Acquire),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unhealthy() {
        let health = RedisHealth::new();
        assert!(!health.is_healthy());
        assert_eq!(health.stats().last_connected_ms, 0);
    }

    #[test]
    fn test_reconnection_counting() {
        let health = RedisHealth::new();
        health.set_connected();
        assert_eq!(health.stats().total_reconnections, 0);

        health.set_reconnecting();
        health.set_reconnecting();
        assert_eq!(health.reconnection_attempts(), 2);

        health.set_connected();
        let stats = health.stats();
        assert_eq!(stats.status, RedisHealthStatus::Healthy);
        assert_eq!(stats.total_reconnections, 1);
        assert_eq!(stats.reconnection_attempts, 0);
    }
}
