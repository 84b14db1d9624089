use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::redis::RedisHealth;
use crate::worker::Worker;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub redis_health: Arc<RedisHealth>,
    pub worker: Worker,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(settings: Settings, redis_health: Arc<RedisHealth>, worker: Worker) -> Self {
        Self {
            settings: Arc::new(settings),
            redis_health,
            worker,
            start_time: Instant::now(),
        }
    }
}
