//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use crate::error::AppError;

use super::{
    AUDIENCE_SIZE, COMMANDS_TOTAL, TASKS_QUEUED, TASKS_TOTAL, TASK_DURATION,
    TRIGGER_MESSAGES_RECEIVED, TRIGGER_MESSAGES_REJECTED,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, AppError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| AppError::Internal(e.to_string()))
}

/// Helper struct for recording command bus metrics
pub struct CommandMetrics;

impl CommandMetrics {
    pub fn record_sent(command: &str) {
        COMMANDS_TOTAL.with_label_values(&[command, "sent"]).inc();
    }

    pub fn record_failed(command: &str) {
        COMMANDS_TOTAL.with_label_values(&[command, "failed"]).inc();
    }

    /// Fire-and-forget hand-off; delivery is not known to the caller
    pub fn record_published(command: &str) {
        COMMANDS_TOTAL.with_label_values(&[command, "published"]).inc();
    }

    pub fn record_audience(channel: &str, size: usize) {
        AUDIENCE_SIZE
            .with_label_values(&[channel])
            .observe(size as f64);
    }
}

/// Helper struct for recording worker task metrics
pub struct TaskMetrics;

impl TaskMetrics {
    pub fn record_success(task: &str, elapsed: Duration) {
        TASKS_TOTAL.with_label_values(&[task, "success"]).inc();
        TASK_DURATION
            .with_label_values(&[task])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_failure(task: &str, elapsed: Duration) {
        TASKS_TOTAL.with_label_values(&[task, "failure"]).inc();
        TASK_DURATION
            .with_label_values(&[task])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_rejected(task: &str) {
        TASKS_TOTAL.with_label_values(&[task, "rejected"]).inc();
    }

    pub fn set_queued(count: usize) {
        TASKS_QUEUED.set(count as i64);
    }
}

/// Helper struct for recording trigger intake metrics
pub struct TriggerMetrics;

impl TriggerMetrics {
    pub fn record_received() {
        TRIGGER_MESSAGES_RECEIVED.inc();
    }

    pub fn record_rejected(reason: &str) {
        TRIGGER_MESSAGES_REJECTED.with_label_values(&[reason]).inc();
    }
}
