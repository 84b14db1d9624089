//! In-memory subscriber directory using DashMap.
//!
//! Data lives only as long as the process. Used by tests and by the `memory`
//! directory backend for local development.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::{
    EntityId, NotificationChannel, NotificationEvent, Post, SubscriptionStatus, User,
};

use super::policy;
use super::{ResolverError, SubscriberResolver};

/// In-memory subscriber directory.
///
/// Users are kept per tenant; post subscriptions per (tenant, post).
#[derive(Default)]
pub struct MemorySubscriberStore {
    users: DashMap<EntityId, HashMap<EntityId, User>>,
    post_subscriptions: DashMap<(EntityId, EntityId), HashMap<EntityId, SubscriptionStatus>>,
}

impl MemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user of a tenant
    pub fn upsert_user(&self, tenant_id: EntityId, user: User) {
        self.users.entry(tenant_id).or_default().insert(user.id, user);
    }

    pub fn remove_user(&self, tenant_id: EntityId, user_id: EntityId) -> Option<User> {
        self.users
            .get_mut(&tenant_id)
            .and_then(|mut users| users.remove(&user_id))
    }

    /// Record a user's explicit (un)subscription to a post
    pub fn set_post_subscription(
        &self,
        tenant_id: EntityId,
        post_id: EntityId,
        user_id: EntityId,
        status: SubscriptionStatus,
    ) {
        self.post_subscriptions
            .entry((tenant_id, post_id))
            .or_default()
            .insert(user_id, status);
    }

    pub fn user_count(&self, tenant_id: EntityId) -> usize {
        self.users.get(&tenant_id).map(|u| u.len()).unwrap_or(0)
    }
}

#[async_trait]
impl SubscriberResolver for MemorySubscriberStore {
    #[tracing::instrument(
        name = "subscribers.resolve",
        skip(self, post),
        fields(backend = "memory", post_id = post.id, tenant_id = post.tenant_id)
    )]
    async fn resolve(
        &self,
        post: &Post,
        channel: NotificationChannel,
        event: NotificationEvent,
    ) -> Result<Vec<User>, ResolverError> {
        let users = match self.users.get(&post.tenant_id) {
            Some(users) => users,
            None => return Ok(Vec::new()),
        };
        let subscriptions = self.post_subscriptions.get(&(post.tenant_id, post.id));

        let eligible = users
            .values()
            .filter(|user| {
                let subscription = subscriptions
                    .as_ref()
                    .and_then(|subs| subs.get(&user.id).copied());
                policy::is_eligible(user, channel, event, subscription)
            })
            .cloned()
            .collect();

        let eligible = policy::normalize(eligible);
        tracing::debug!(count = eligible.len(), "Resolved subscribers");
        Ok(eligible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::domain::{PostStatus, UserRole, UserStatus};

    fn post(tenant_id: EntityId, id: EntityId) -> Post {
        Post {
            id,
            tenant_id,
            number: id,
            slug: "a-post".to_string(),
            title: "A post".to_string(),
            description: String::new(),
            created_at: Utc::now(),
            author_id: 1,
            status: PostStatus::Open,
            votes_count: 0,
            comments_count: 0,
            response: None,
        }
    }

    fn user(id: EntityId, role: UserRole) -> User {
        User::new(id, format!("user-{}", id), format!("user{}@example.com", id)).with_role(role)
    }

    #[tokio::test]
    async fn test_unknown_tenant_resolves_empty() {
        let store = MemorySubscriberStore::new();
        let users = store
            .resolve(&post(9, 1), NotificationChannel::Web, NotificationEvent::NewPost)
            .await
            .unwrap();
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn test_resolves_sorted_active_staff() {
        let store = MemorySubscriberStore::new();
        store.upsert_user(1, user(5, UserRole::Collaborator));
        store.upsert_user(1, user(2, UserRole::Administrator));
        store.upsert_user(1, user(3, UserRole::Visitor));
        store.upsert_user(
            1,
            user(4, UserRole::Administrator).with_status(UserStatus::Deleted),
        );

        let users = store
            .resolve(&post(1, 10), NotificationChannel::Email, NotificationEvent::NewPost)
            .await
            .unwrap();

        let ids: Vec<_> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![2, 5]);
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let store = MemorySubscriberStore::new();
        store.upsert_user(1, user(2, UserRole::Administrator));
        store.upsert_user(2, user(3, UserRole::Administrator));

        let users = store
            .resolve(&post(2, 10), NotificationChannel::Web, NotificationEvent::NewPost)
            .await
            .unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, 3);
    }

    #[tokio::test]
    async fn test_post_subscriptions_apply_to_post_scoped_events() {
        let store = MemorySubscriberStore::new();
        store.upsert_user(1, user(2, UserRole::Administrator));
        store.upsert_user(1, user(3, UserRole::Visitor));
        store.set_post_subscription(1, 10, 2, SubscriptionStatus::Unsubscribed);
        store.set_post_subscription(1, 10, 3, SubscriptionStatus::Subscribed);

        let users = store
            .resolve(&post(1, 10), NotificationChannel::Web, NotificationEvent::NewComment)
            .await
            .unwrap();

        let ids: Vec<_> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_remove_user() {
        let store = MemorySubscriberStore::new();
        store.upsert_user(1, user(2, UserRole::Administrator));
        assert_eq!(store.user_count(1), 1);

        assert!(store.remove_user(1, 2).is_some());
        assert_eq!(store.user_count(1), 0);
        assert!(store.remove_user(7, 2).is_none());
    }
}
