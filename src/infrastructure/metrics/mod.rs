//! Prometheus metrics for the notifier.
//!
//! - Command metrics (dispatched commands by kind and outcome)
//! - Audience metrics (resolved recipients per channel)
//! - Task metrics (runs by task and outcome, duration)
//! - Trigger and Redis health metrics

mod helpers;

pub use helpers::{encode_metrics, CommandMetrics, TaskMetrics, TriggerMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "feedback_notifier";

lazy_static! {
    // ============================================================================
    // Command Metrics
    // ============================================================================

    /// Commands handed to the command bus
    pub static ref COMMANDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_commands_total", METRIC_PREFIX),
        "Total commands handed to the command bus",
        &["command", "outcome"]
    ).unwrap();

    /// Recipients resolved per channel for a single task run
    pub static ref AUDIENCE_SIZE: HistogramVec = register_histogram_vec!(
        format!("{}_audience_size", METRIC_PREFIX),
        "Number of recipients resolved per channel",
        &["channel"],
        vec![0.0, 1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0]
    ).unwrap();

    // ============================================================================
    // Task Metrics
    // ============================================================================

    /// Task runs by outcome
    pub static ref TASKS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_tasks_total", METRIC_PREFIX),
        "Total task runs",
        &["task", "outcome"]
    ).unwrap();

    /// Task run duration
    pub static ref TASK_DURATION: HistogramVec = register_histogram_vec!(
        format!("{}_task_duration_seconds", METRIC_PREFIX),
        "Task run duration in seconds",
        &["task"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    ).unwrap();

    /// Tasks waiting for a worker slot
    pub static ref TASKS_QUEUED: IntGauge = register_int_gauge!(
        format!("{}_tasks_queued", METRIC_PREFIX),
        "Tasks waiting for a worker slot"
    ).unwrap();

    // ============================================================================
    // Trigger & Redis Metrics
    // ============================================================================

    /// Trigger messages received from Redis pub/sub
    pub static ref TRIGGER_MESSAGES_RECEIVED: IntCounter = register_int_counter!(
        format!("{}_trigger_messages_received_total", METRIC_PREFIX),
        "Total trigger messages received from Redis pub/sub"
    ).unwrap();

    /// Trigger messages dropped because they could not be parsed or enqueued
    pub static ref TRIGGER_MESSAGES_REJECTED: IntCounterVec = register_int_counter_vec!(
        format!("{}_trigger_messages_rejected_total", METRIC_PREFIX),
        "Total trigger messages dropped",
        &["reason"]
    ).unwrap();

    /// Redis connection status (1 = connected, 0 = disconnected)
    pub static ref REDIS_CONNECTION_STATUS: IntGauge = register_int_gauge!(
        format!("{}_redis_connection_status", METRIC_PREFIX),
        "Redis connection status (1=connected, 0=disconnected)"
    ).unwrap();
}
