//! Command dispatch boundary.
//!
//! Notification tasks never talk to the web, mail or webhook subsystems
//! directly; they hand [`Command`]s to a [`CommandBus`]:
//!
//! - `send`: awaits acknowledgement and surfaces the handler's error
//! - `publish`: fire-and-forget, failures are logged by the bus and never
//!   reach the caller
//!
//! Two buses are provided:
//!
//! - `InProcessBus`: routes commands to handlers registered per command kind
//! - `RedisCommandBus`: serializes commands and publishes them to per-kind
//!   Redis channels consumed by the downstream subsystems

mod commands;
mod in_process;
mod redis;

use async_trait::async_trait;
use thiserror::Error;

pub use commands::{
    AddWebNotification, Command, CommandKind, MailTemplate, Recipient, SendMail,
    TriggerWebhooks, WebhookType,
};
pub use in_process::InProcessBus;
pub use redis::RedisCommandBus;

/// Errors surfaced by [`CommandBus::send`]
#[derive(Debug, Error)]
pub enum BusError {
    #[error("No handler registered for command {0}")]
    NoHandler(CommandKind),

    #[error("Command rejected: {0}")]
    Rejected(String),

    #[error("Failed to serialize command: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Command transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait CommandBus: Send + Sync {
    /// Dispatch a command and wait for its handler to acknowledge it
    async fn send(&self, command: Command) -> Result<(), BusError>;

    /// Hand a command off without waiting. Never fails from the caller's view.
    fn publish(&self, command: Command);
}

/// Handles one kind of command for the [`InProcessBus`]
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, command: Command) -> Result<(), BusError>;
}
