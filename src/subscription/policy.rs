//! Eligibility rules shared by every subscriber store.

use crate::domain::{NotificationChannel, NotificationEvent, SubscriptionStatus, User};

/// Whether the user's preferences enable `channel` for `event`.
///
/// An explicit setting wins. Without one, the user gets the event's default
/// channels if their role is enabled by default for the event.
pub fn channel_enabled(user: &User, channel: NotificationChannel, event: NotificationEvent) -> bool {
    match user.settings.get(event.settings_key()) {
        Some(mask) => mask & channel.bit() != 0,
        None => {
            event.default_enabled_roles().contains(&user.role)
                && event.default_channels() & channel.bit() != 0
        }
    }
}

/// Whether the user follows the post closely enough to receive `event`.
///
/// Roles that must opt in need an explicit subscription; everyone else is
/// in unless they unsubscribed from the post. Events that are not post
/// scoped ignore post subscriptions entirely.
pub fn follows_post(
    user: &User,
    event: NotificationEvent,
    subscription: Option<SubscriptionStatus>,
) -> bool {
    if !event.is_post_scoped() {
        true
    } else if event.subscription_required_roles().contains(&user.role) {
        subscription == Some(SubscriptionStatus::Subscribed)
    } else {
        subscription != Some(SubscriptionStatus::Unsubscribed)
    }
}

/// Full eligibility check for a single user.
pub fn is_eligible(
    user: &User,
    channel: NotificationChannel,
    event: NotificationEvent,
    subscription: Option<SubscriptionStatus>,
) -> bool {
    user.is_active()
        && follows_post(user, event, subscription)
        && channel_enabled(user, channel, event)
}

/// Sort by id and drop duplicate ids, keeping the first occurrence
pub fn normalize(mut users: Vec<User>) -> Vec<User> {
    users.sort_by_key(|u| u.id);
    users.dedup_by_key(|u| u.id);
    users
}
