//! Notification tasks.
//!
//! A task is one unit of work handed to the worker runtime. It carries an
//! explicit [`TaskContext`] (tenant, acting user, locale) and the shared
//! adapters it needs in [`NotificationDeps`].

mod new_post;

use std::sync::Arc;

use thiserror::Error;

use crate::bus::{BusError, CommandBus, CommandKind};
use crate::domain::{NotificationChannel, Tenant, User};
use crate::i18n::Localizer;
use crate::subscription::{ResolverError, SubscriberResolver};

pub use new_post::NotifyAboutNewPost;

/// Request-scoped context a task runs under
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub tenant: Tenant,
    /// User whose action triggered the task
    pub author: User,
    pub locale: String,
}

impl TaskContext {
    /// Context using the tenant's locale
    pub fn new(tenant: Tenant, author: User) -> Self {
        let locale = tenant.locale.clone();
        Self {
            tenant,
            author,
            locale,
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }
}

/// Adapters shared by every task
#[derive(Clone)]
pub struct NotificationDeps {
    pub resolver: Arc<dyn SubscriberResolver>,
    pub bus: Arc<dyn CommandBus>,
    pub localizer: Arc<dyn Localizer>,
}

impl NotificationDeps {
    pub fn new(
        resolver: Arc<dyn SubscriberResolver>,
        bus: Arc<dyn CommandBus>,
        localizer: Arc<dyn Localizer>,
    ) -> Self {
        Self {
            resolver,
            bus,
            localizer,
        }
    }
}

/// Why a task stopped. Steps already dispatched are not rolled back.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Failed to resolve {channel} subscribers: {source}")]
    Resolve {
        channel: NotificationChannel,
        source: ResolverError,
    },

    #[error("Failed to dispatch {command}: {source}")]
    Dispatch {
        command: CommandKind,
        source: BusError,
    },
}
