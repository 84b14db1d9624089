//! Post, user and tenant snapshots consumed by the notification pipeline.
//!
//! These are read-only views owned by upstream subsystems. The pipeline never
//! mutates or persists them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier type shared by posts, users and tenants
pub type EntityId = i64;

/// A user-submitted idea on a tenant's feedback board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: EntityId,
    /// Tenant owning the board the post was created on
    pub tenant_id: EntityId,
    /// Sequential display number within the tenant
    pub number: i64,
    pub slug: String,
    pub title: String,
    /// Markdown source of the post body
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub author_id: EntityId,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub votes_count: u32,
    #[serde(default)]
    pub comments_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<PostResponse>,
}

/// Workflow status of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Open,
    Started,
    Completed,
    Declined,
    Planned,
    Duplicate,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Open => "open",
            PostStatus::Started => "started",
            PostStatus::Completed => "completed",
            PostStatus::Declined => "declined",
            PostStatus::Planned => "planned",
            PostStatus::Duplicate => "duplicate",
        }
    }
}

/// Staff response attached to a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostResponse {
    pub text: String,
    pub responded_at: DateTime<Utc>,
    pub responder_name: String,
}

/// Role of a user within a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Visitor,
    Collaborator,
    Administrator,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Visitor => "visitor",
            UserRole::Collaborator => "collaborator",
            UserRole::Administrator => "administrator",
        }
    }
}

/// Account status; only active users receive notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Deleted,
    Blocked,
}

/// A tenant member as seen by the notification pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub status: UserStatus,
    /// Explicit notification settings: event settings key -> channel bitmask
    #[serde(default)]
    pub settings: HashMap<String, u8>,
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl User {
    pub fn new(id: EntityId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            role: UserRole::default(),
            status: UserStatus::default(),
            settings: HashMap::new(),
            locale: default_locale(),
        }
    }

    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = status;
        self
    }

    /// Set an explicit channel bitmask for an event settings key
    pub fn with_setting(mut self, key: impl Into<String>, channels: u8) -> Self {
        self.settings.insert(key.into(), channels);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// An isolated customer workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: EntityId,
    pub name: String,
    /// Absolute base URL of the tenant site, e.g. `https://feedback.acme.com`
    pub base_url: String,
    pub logo_url: String,
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl Tenant {
    /// Base URL without trailing slashes, ready for path concatenation
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

fn default_locale() -> String {
    "en".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_defaults_from_minimal_json() {
        let user: User = serde_json::from_value(json!({
            "id": 3,
            "name": "Jon",
            "email": "jon@example.com"
        }))
        .unwrap();

        assert_eq!(user.role, UserRole::Visitor);
        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(user.locale, "en");
        assert!(user.settings.is_empty());
        assert!(user.is_active());
    }

    #[test]
    fn test_blocked_user_is_not_active() {
        let user = User::new(1, "Jon", "jon@example.com").with_status(UserStatus::Blocked);
        assert!(!user.is_active());
    }

    #[test]
    fn test_tenant_base_url_trims_trailing_slash() {
        let tenant = Tenant {
            id: 1,
            name: "Acme".to_string(),
            base_url: "https://acme.io//".to_string(),
            logo_url: String::new(),
            locale: "en".to_string(),
        };
        assert_eq!(tenant.base_url(), "https://acme.io");
    }

    #[test]
    fn test_post_status_lowercase_serialization() {
        let value = serde_json::to_value(PostStatus::Declined).unwrap();
        assert_eq!(value, json!("declined"));
        assert_eq!(PostStatus::Planned.as_str(), "planned");
    }
}
