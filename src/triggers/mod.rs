//! Intake of events that start notification tasks.

mod redis;

pub use redis::{PostCreatedMessage, PostCreatedSubscriber, TriggerError};
