use std::sync::Arc;

use async_trait::async_trait;

use crate::bus::{
    AddWebNotification, Command, CommandBus, MailTemplate, Recipient, SendMail, TriggerWebhooks,
    WebhookType,
};
use crate::domain::{NotificationChannel, NotificationEvent, Post, User};
use crate::i18n::Localizer;
use crate::metrics::CommandMetrics;
use crate::payload::{self, NewPostMailProps, PostSectionOptions, WebhookProps};
use crate::subscription::SubscriberResolver;
use crate::worker::Task;

use super::{NotificationDeps, TaskContext, TaskError};

/// Fans a newly created post out to web, email and webhook subscribers.
///
/// Steps run in order and the first failure stops the run:
///
/// 1. one `AddWebNotification` per web subscriber (sent, awaited)
/// 2. one `SendMail` for all email subscribers (published, even if empty)
/// 3. one `TriggerWebhooks` (sent, awaited)
///
/// The author never receives a web or email notification for their own post.
pub struct NotifyAboutNewPost {
    ctx: TaskContext,
    post: Post,
    resolver: Arc<dyn SubscriberResolver>,
    bus: Arc<dyn CommandBus>,
    localizer: Arc<dyn Localizer>,
}

impl NotifyAboutNewPost {
    pub fn new(ctx: TaskContext, post: Post, deps: &NotificationDeps) -> Self {
        Self {
            ctx,
            post,
            resolver: deps.resolver.clone(),
            bus: deps.bus.clone(),
            localizer: deps.localizer.clone(),
        }
    }

    pub fn post(&self) -> &Post {
        &self.post
    }

    pub fn context(&self) -> &TaskContext {
        &self.ctx
    }

    #[tracing::instrument(
        name = "task.notify_new_post",
        skip(self),
        fields(
            tenant_id = self.ctx.tenant.id,
            post_id = self.post.id,
            post_number = self.post.number,
            author_id = self.ctx.author.id
        )
    )]
    pub async fn execute(&self) -> Result<(), TaskError> {
        let base_url = self.ctx.tenant.base_url();
        let logo_url = self.ctx.tenant.logo_url.as_str();

        self.notify_web().await?;
        self.notify_email().await?;
        self.trigger_webhooks(base_url, logo_url).await?;

        tracing::debug!("New post notifications dispatched");
        Ok(())
    }

    async fn notify_web(&self) -> Result<(), TaskError> {
        let users = self.audience(NotificationChannel::Web).await?;

        let title = payload::web_title(self.localizer.as_ref(), &self.ctx.locale, &self.post);
        let link = payload::post_path(&self.post);

        for user in users {
            let command = AddWebNotification {
                user,
                title: title.clone(),
                link: link.clone(),
                post_id: self.post.id,
            };
            self.send(command.into()).await?;
        }

        Ok(())
    }

    async fn notify_email(&self) -> Result<(), TaskError> {
        let users = self.audience(NotificationChannel::Email).await?;

        let to: Vec<Recipient> = users
            .into_iter()
            .map(|user| Recipient::new(user.name, user.email))
            .collect();

        let props = NewPostMailProps::build(
            self.localizer.as_ref(),
            &self.ctx.locale,
            &self.post,
            &self.ctx.author,
            &self.ctx.tenant,
        );

        tracing::debug!(recipients = to.len(), "Publishing new post mail");
        self.bus.publish(
            SendMail {
                from: Recipient::named(self.ctx.author.name.clone()),
                to,
                template: MailTemplate::NewPost(props),
            }
            .into(),
        );

        Ok(())
    }

    async fn trigger_webhooks(&self, base_url: &str, logo_url: &str) -> Result<(), TaskError> {
        let props = WebhookProps::new()
            .with_post(&self.post, base_url, PostSectionOptions::default())
            .with_author(&self.ctx.author)
            .with_tenant(&self.ctx.tenant, base_url, logo_url);

        self.send(
            TriggerWebhooks {
                kind: WebhookType::NewPost,
                props,
            }
            .into(),
        )
        .await
    }

    /// Subscribers of a channel, without the author
    async fn audience(&self, channel: NotificationChannel) -> Result<Vec<User>, TaskError> {
        let users = self
            .resolver
            .resolve(&self.post, channel, NotificationEvent::NewPost)
            .await
            .map_err(|source| TaskError::Resolve { channel, source })?;

        let author_id = self.ctx.author.id;
        let users: Vec<User> = users.into_iter().filter(|u| u.id != author_id).collect();

        CommandMetrics::record_audience(channel.as_str(), users.len());
        tracing::debug!(channel = %channel, count = users.len(), "Resolved audience");
        Ok(users)
    }

    async fn send(&self, command: Command) -> Result<(), TaskError> {
        let kind = command.kind();
        self.bus
            .send(command)
            .await
            .map_err(|source| TaskError::Dispatch {
                command: kind,
                source,
            })
    }
}

#[async_trait]
impl Task for NotifyAboutNewPost {
    fn name(&self) -> &'static str {
        "notify_new_post"
    }

    async fn run(&self) -> Result<(), TaskError> {
        self.execute().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::bus::InProcessBus;
    use crate::domain::{Tenant, UserRole};
    use crate::i18n::Catalog;
    use crate::subscription::MemorySubscriberStore;

    fn tenant() -> Tenant {
        Tenant {
            id: 1,
            name: "Acme".to_string(),
            base_url: "https://x.io".to_string(),
            logo_url: "https://x.io/logo.png".to_string(),
            locale: "en".to_string(),
        }
    }

    fn post() -> Post {
        Post {
            id: 70,
            tenant_id: 1,
            number: 7,
            slug: "improve-search".to_string(),
            title: "Improve search".to_string(),
            description: String::new(),
            created_at: Utc::now(),
            author_id: 1,
            status: Default::default(),
            votes_count: 0,
            comments_count: 0,
            response: None,
        }
    }

    #[tokio::test]
    async fn test_missing_handler_stops_the_run() {
        let store = Arc::new(MemorySubscriberStore::new());
        store.upsert_user(
            1,
            User::new(2, "Ann", "ann@x.io").with_role(UserRole::Administrator),
        );
        let bus = Arc::new(InProcessBus::new());
        let deps = NotificationDeps::new(store, bus.clone(), Arc::new(Catalog::builtin("en")));

        let author = User::new(1, "Jon", "jon@x.io");
        let task = NotifyAboutNewPost::new(TaskContext::new(tenant(), author), post(), &deps);

        let result = task.run().await;
        assert!(matches!(
            result,
            Err(TaskError::Dispatch {
                command: crate::bus::CommandKind::AddWebNotification,
                ..
            })
        ));
        assert_eq!(task.name(), "notify_new_post");
    }

    #[tokio::test]
    async fn test_empty_directory_reaches_webhook_step() {
        let store = Arc::new(MemorySubscriberStore::new());
        let bus = Arc::new(InProcessBus::new());
        let deps = NotificationDeps::new(store, bus.clone(), Arc::new(Catalog::builtin("en")));

        // Without a webhook handler the final step fails, after the mail was published
        let author = User::new(1, "Jon", "jon@x.io");
        let task = NotifyAboutNewPost::new(TaskContext::new(tenant(), author), post(), &deps);

        let result = task.execute().await;
        assert!(matches!(
            result,
            Err(TaskError::Dispatch {
                command: crate::bus::CommandKind::TriggerWebhooks,
                ..
            })
        ));
    }
}
