//! Channel payload construction.
//!
//! Everything here is pure and total: given a post, its author and the
//! tenant, it produces the content of web, email and webhook commands.
//! Markdown is passed through untouched; rendering belongs to the consumers.

mod webhook;

use serde::{Deserialize, Serialize};

use crate::domain::{Post, Tenant, User};
use crate::i18n::{
    Localizer, KEY_EMAIL_SUBSCRIPTION_CHANGE, KEY_EMAIL_SUBSCRIPTION_VIEW, KEY_NOTIFICATION_POST,
};

pub use webhook::{PostSection, PostSectionOptions, TenantSection, UserSection, WebhookProps};

/// Site-relative path of a post
pub fn post_path(post: &Post) -> String {
    format!("/posts/{}/{}", post.number, post.slug)
}

/// Absolute URL of a path under a base URL
pub fn absolute_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Absolute URL of a post
pub fn post_url(base_url: &str, post: &Post) -> String {
    absolute_url(base_url, &post_path(post))
}

/// Markdown title of the in-app notification for a new post
pub fn web_title(localizer: &dyn Localizer, locale: &str, post: &Post) -> String {
    format!(
        "{}: **{}**",
        localizer.translate(locale, KEY_NOTIFICATION_POST),
        post.title
    )
}

/// A hyperlink embedded in mail templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub url: String,
}

impl Link {
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }

    /// HTML anchor for the link
    pub fn to_html(&self) -> String {
        format!("<a href='{}'>{}</a>", self.url, self.text)
    }
}

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_html())
    }
}

/// Shared variables of the `new_post` mail template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPostMailProps {
    pub title: String,
    pub site_name: String,
    /// Name of the post author
    pub user_name: String,
    /// Markdown description, rendered by the mail subsystem
    pub content: String,
    pub post_link: Link,
    pub view: Link,
    pub change: Link,
    pub logo: String,
}

impl NewPostMailProps {
    pub fn build(
        localizer: &dyn Localizer,
        locale: &str,
        post: &Post,
        author: &User,
        tenant: &Tenant,
    ) -> Self {
        let base_url = tenant.base_url();
        let url = post_url(base_url, post);

        Self {
            title: post.title.clone(),
            site_name: tenant.name.clone(),
            user_name: author.name.clone(),
            content: post.description.clone(),
            post_link: Link::new(format!("#{}", post.number), url.clone()),
            view: Link::new(
                localizer.translate(locale, KEY_EMAIL_SUBSCRIPTION_VIEW),
                url,
            ),
            change: Link::new(
                localizer.translate(locale, KEY_EMAIL_SUBSCRIPTION_CHANGE),
                absolute_url(base_url, "/settings"),
            ),
            logo: tenant.logo_url.clone(),
        }
    }
}
