use serde::{Deserialize, Serialize};

use crate::domain::{EntityId, User};
use crate::payload::{NewPostMailProps, WebhookProps};

/// Commands handed to the command bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    AddWebNotification(AddWebNotification),
    SendMail(SendMail),
    TriggerWebhooks(TriggerWebhooks),
}

/// Discriminant of a [`Command`], used for handler routing and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    AddWebNotification,
    SendMail,
    TriggerWebhooks,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::AddWebNotification => "add_web_notification",
            CommandKind::SendMail => "send_mail",
            CommandKind::TriggerWebhooks => "trigger_webhooks",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::AddWebNotification(_) => CommandKind::AddWebNotification,
            Command::SendMail(_) => CommandKind::SendMail,
            Command::TriggerWebhooks(_) => CommandKind::TriggerWebhooks,
        }
    }
}

impl From<AddWebNotification> for Command {
    fn from(cmd: AddWebNotification) -> Self {
        Command::AddWebNotification(cmd)
    }
}

impl From<SendMail> for Command {
    fn from(cmd: SendMail) -> Self {
        Command::SendMail(cmd)
    }
}

impl From<TriggerWebhooks> for Command {
    fn from(cmd: TriggerWebhooks) -> Self {
        Command::TriggerWebhooks(cmd)
    }
}

/// Create one in-app notification for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddWebNotification {
    pub user: User,
    /// Markdown title
    pub title: String,
    /// Site-relative link
    pub link: String,
    pub post_id: EntityId,
}

/// A mail sender or recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    #[serde(default)]
    pub address: String,
    /// Per-recipient template variables, merged over the shared props by the
    /// mail subsystem
    #[serde(default)]
    pub props: serde_json::Map<String, serde_json::Value>,
}

impl Recipient {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            props: serde_json::Map::new(),
        }
    }

    /// Display-only identity with no address, e.g. a sender name
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, String::new())
    }
}

/// Mail template together with its typed variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "template_name", content = "props", rename_all = "snake_case")]
pub enum MailTemplate {
    NewPost(NewPostMailProps),
}

impl MailTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            MailTemplate::NewPost(_) => "new_post",
        }
    }
}

/// Send one templated mail to a list of recipients.
///
/// An empty `to` list is valid and is a no-op for the mail subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMail {
    pub from: Recipient,
    pub to: Vec<Recipient>,
    pub template: MailTemplate,
}

/// Webhook event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookType {
    NewPost,
}

/// Fire every webhook registered for an event type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerWebhooks {
    #[serde(rename = "type")]
    pub kind: WebhookType,
    pub props: WebhookProps,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_kind() {
        let cmd: Command = AddWebNotification {
            user: User::new(2, "Ann", "ann@example.com"),
            title: "t".to_string(),
            link: "/posts/1/a".to_string(),
            post_id: 1,
        }
        .into();

        assert_eq!(cmd.kind(), CommandKind::AddWebNotification);
        assert_eq!(cmd.kind().to_string(), "add_web_notification");
    }

    #[test]
    fn test_add_web_notification_is_tagged() {
        let cmd = Command::AddWebNotification(AddWebNotification {
            user: User::new(2, "Ann", "ann@example.com"),
            title: "New Post: **Hi**".to_string(),
            link: "/posts/1/hi".to_string(),
            post_id: 10,
        });

        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(value["command"], json!("add_web_notification"));
        assert_eq!(value["post_id"], json!(10));
        assert_eq!(value["user"]["id"], json!(2));
    }

    #[test]
    fn test_recipient_named_has_no_address() {
        let sender = Recipient::named("Jon");
        assert_eq!(sender.name, "Jon");
        assert!(sender.address.is_empty());
        assert!(sender.props.is_empty());
    }
}
