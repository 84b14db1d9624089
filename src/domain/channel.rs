//! Notification channels, events and their default subscription rules.

use serde::{Deserialize, Serialize};

use super::model::UserRole;

/// Delivery medium for a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    /// In-app notification list
    Web,
    Email,
}

impl NotificationChannel {
    /// Bit used for this channel inside a settings bitmask
    pub const fn bit(self) -> u8 {
        match self {
            NotificationChannel::Web => 1,
            NotificationChannel::Email => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Web => "web",
            NotificationChannel::Email => "email",
        }
    }
}

impl std::fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitmask enabling every channel
pub const ALL_CHANNELS: u8 = NotificationChannel::Web.bit() | NotificationChannel::Email.bit();

/// Category of occurrence that triggers notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    NewPost,
    NewComment,
    ChangeStatus,
}

impl NotificationEvent {
    /// Key under which a user's explicit channel bitmask for this event is stored
    pub fn settings_key(&self) -> &'static str {
        match self {
            NotificationEvent::NewPost => "event_notification_new_post",
            NotificationEvent::NewComment => "event_notification_new_comment",
            NotificationEvent::ChangeStatus => "event_notification_change_status",
        }
    }

    /// Channel bitmask applied when the user has no explicit setting
    pub fn default_channels(&self) -> u8 {
        ALL_CHANNELS
    }

    /// Roles that receive this event by default when they have no explicit setting
    pub fn default_enabled_roles(&self) -> &'static [UserRole] {
        match self {
            NotificationEvent::NewPost => &[UserRole::Administrator, UserRole::Collaborator],
            NotificationEvent::NewComment | NotificationEvent::ChangeStatus => &[
                UserRole::Administrator,
                UserRole::Collaborator,
                UserRole::Visitor,
            ],
        }
    }

    /// Whether the audience depends on subscriptions to the individual post.
    /// New posts go to the tenant-wide audience.
    pub fn is_post_scoped(&self) -> bool {
        !matches!(self, NotificationEvent::NewPost)
    }

    /// Roles that only receive this event after subscribing to the post
    pub fn subscription_required_roles(&self) -> &'static [UserRole] {
        match self {
            NotificationEvent::NewPost => &[],
            NotificationEvent::NewComment | NotificationEvent::ChangeStatus => &[UserRole::Visitor],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEvent::NewPost => "new_post",
            NotificationEvent::NewComment => "new_comment",
            NotificationEvent::ChangeStatus => "change_status",
        }
    }
}

impl std::fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's explicit stance on a single post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Subscribed,
    Unsubscribed,
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscribed" => Ok(SubscriptionStatus::Subscribed),
            "unsubscribed" => Ok(SubscriptionStatus::Unsubscribed),
            other => Err(format!("unknown subscription status '{}'", other)),
        }
    }
}
