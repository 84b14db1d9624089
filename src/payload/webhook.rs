//! Structured webhook properties with `post`, `author` and `tenant` sections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EntityId, Post, Tenant, User};

use super::post_url;

/// Which optional post fields to include
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostSectionOptions {
    /// Include vote and comment counts
    pub include_engagement: bool,
    /// Include status and staff response
    pub include_response: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSection {
    pub id: EntityId,
    pub number: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_user: Option<String>,
}

impl PostSection {
    pub fn new(post: &Post, base_url: &str, options: PostSectionOptions) -> Self {
        let mut section = Self {
            id: post.id,
            number: post.number,
            title: post.title.clone(),
            slug: post.slug.clone(),
            description: post.description.clone(),
            created_at: post.created_at,
            url: post_url(base_url, post),
            votes: None,
            comments: None,
            status: None,
            response: None,
            response_date: None,
            response_user: None,
        };

        if options.include_engagement {
            section.votes = Some(post.votes_count);
            section.comments = Some(post.comments_count);
        }

        if options.include_response {
            section.status = Some(post.status.as_str().to_string());
            if let Some(ref response) = post.response {
                section.response = Some(response.text.clone());
                section.response_date = Some(response.responded_at);
                section.response_user = Some(response.responder_name.clone());
            }
        }

        section
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSection {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<&User> for UserSection {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantSection {
    pub id: EntityId,
    pub name: String,
    pub url: String,
    pub logo: String,
}

impl TenantSection {
    pub fn new(tenant: &Tenant, base_url: &str, logo_url: &str) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name.clone(),
            url: base_url.to_string(),
            logo: logo_url.to_string(),
        }
    }
}

/// Properties handed to webhook templates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<PostSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantSection>,
}

impl WebhookProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_post(mut self, post: &Post, base_url: &str, options: PostSectionOptions) -> Self {
        self.post = Some(PostSection::new(post, base_url, options));
        self
    }

    pub fn with_author(mut self, author: &User) -> Self {
        self.author = Some(UserSection::from(author));
        self
    }

    pub fn with_tenant(mut self, tenant: &Tenant, base_url: &str, logo_url: &str) -> Self {
        self.tenant = Some(TenantSection::new(tenant, base_url, logo_url));
        self
    }
}
