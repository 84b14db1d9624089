//! Domain types shared across the pipeline
//!
//! - `model`: post, user and tenant snapshots
//! - `channel`: notification channels, events and default subscription rules

mod channel;
mod model;

pub use channel::{NotificationChannel, NotificationEvent, SubscriptionStatus, ALL_CHANNELS};
pub use model::{
    EntityId, Post, PostResponse, PostStatus, Tenant, User, UserRole, UserStatus,
};
