use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;

use crate::metrics::CommandMetrics;

use super::{BusError, Command, CommandBus, CommandHandler, CommandKind};

/// Command bus that runs registered handlers inside the current process.
///
/// Published commands run on spawned tokio tasks. Their handles are kept until
/// [`InProcessBus::flush`] awaits them, so shutdown and tests can wait for
/// outstanding work.
#[derive(Default)]
pub struct InProcessBus {
    handlers: DashMap<CommandKind, Arc<dyn CommandHandler>>,
    pending: DashMap<u64, JoinHandle<()>>,
    next_id: AtomicU64,
}

impl InProcessBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for a command kind, replacing any previous one
    pub fn register(&self, kind: CommandKind, handler: Arc<dyn CommandHandler>) {
        if self.handlers.insert(kind, handler).is_some() {
            tracing::warn!(command = %kind, "Replaced command handler");
        }
    }

    pub fn has_handler(&self, kind: CommandKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Number of published commands not yet flushed
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Wait for every published command to finish, including commands
    /// published by handlers while flushing
    pub async fn flush(&self) {
        loop {
            let ids: Vec<u64> = self.pending.iter().map(|entry| *entry.key()).collect();
            if ids.is_empty() {
                break;
            }

            for id in ids {
                if let Some((_, handle)) = self.pending.remove(&id) {
                    if let Err(e) = handle.await {
                        tracing::error!(error = %e, "Published command task panicked");
                    }
                }
            }
        }
    }

    fn handler_for(&self, kind: CommandKind) -> Result<Arc<dyn CommandHandler>, BusError> {
        self.handlers
            .get(&kind)
            .map(|h| h.value().clone())
            .ok_or(BusError::NoHandler(kind))
    }
}

#[async_trait]
impl CommandBus for InProcessBus {
    #[tracing::instrument(name = "bus.send", skip(self, command), fields(bus = "in_process", command = %command.kind()))]
    async fn send(&self, command: Command) -> Result<(), BusError> {
        let kind = command.kind();

        let result = match self.handler_for(kind) {
            Ok(handler) => handler.handle(command).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                CommandMetrics::record_sent(kind.as_str());
                Ok(())
            }
            Err(e) => {
                CommandMetrics::record_failed(kind.as_str());
                Err(e)
            }
        }
    }

    fn publish(&self, command: Command) {
        let kind = command.kind();
        CommandMetrics::record_published(kind.as_str());

        let handler = match self.handler_for(kind) {
            Ok(handler) => handler,
            Err(e) => {
                CommandMetrics::record_failed(kind.as_str());
                tracing::error!(command = %kind, error = %e, "Dropping published command");
                return;
            }
        };

        // Drop handles of commands that already completed
        self.pending.retain(|_, handle| !handle.is_finished());

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = tokio::spawn(async move {
            if let Err(e) = handler.handle(command).await {
                CommandMetrics::record_failed(kind.as_str());
                tracing::error!(command = %kind, error = %e, "Published command failed");
            }
        });
        self.pending.insert(id, handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use crate::bus::{AddWebNotification, MailTemplate, Recipient, SendMail};
    use crate::domain::User;
    use crate::payload::{Link, NewPostMailProps};

    struct CountingHandler {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingHandler {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CommandHandler for CountingHandler {
        async fn handle(&self, _command: Command) -> Result<(), BusError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(BusError::Rejected("handler failure".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn web_command() -> Command {
        AddWebNotification {
            user: User::new(2, "Ann", "ann@example.com"),
            title: "New Post: **Hi**".to_string(),
            link: "/posts/1/hi".to_string(),
            post_id: 1,
        }
        .into()
    }

    fn mail_command() -> Command {
        let link = Link::new("#1", "https://x.io/posts/1/hi");
        SendMail {
            from: Recipient::named("Jon"),
            to: vec![Recipient::new("Ann", "ann@example.com")],
            template: MailTemplate::NewPost(NewPostMailProps {
                title: "Hi".to_string(),
                site_name: "Acme".to_string(),
                user_name: "Jon".to_string(),
                content: String::new(),
                post_link: link.clone(),
                view: link.clone(),
                change: link,
                logo: String::new(),
            }),
        }
        .into()
    }

    #[tokio::test]
    async fn test_send_routes_to_registered_handler() {
        let bus = InProcessBus::new();
        let handler = CountingHandler::new(false);
        bus.register(CommandKind::AddWebNotification, handler.clone());

        bus.send(web_command()).await.unwrap();
        assert_eq!(handler.calls(), 1);
    }

    #[tokio::test]
    async fn test_send_without_handler() {
        let bus = InProcessBus::new();

        let result = bus.send(web_command()).await;
        assert!(matches!(
            result,
            Err(BusError::NoHandler(CommandKind::AddWebNotification))
        ));
    }

    #[tokio::test]
    async fn test_send_surfaces_handler_error() {
        let bus = InProcessBus::new();
        bus.register(CommandKind::AddWebNotification, CountingHandler::new(true));

        let result = bus.send(web_command()).await;
        assert!(matches!(result, Err(BusError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_publish_runs_after_flush() {
        let bus = InProcessBus::new();
        let handler = CountingHandler::new(false);
        bus.register(CommandKind::SendMail, handler.clone());

        bus.publish(mail_command());
        bus.publish(mail_command());
        bus.flush().await;

        assert_eq!(handler.calls(), 2);
        assert_eq!(bus.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_failure_is_silent() {
        let bus = InProcessBus::new();
        let handler = CountingHandler::new(true);
        bus.register(CommandKind::SendMail, handler.clone());

        bus.publish(mail_command());
        bus.flush().await;

        assert_eq!(handler.calls(), 1);
    }

    #[tokio::test]
    async fn test_publish_without_handler_is_dropped() {
        let bus = InProcessBus::new();

        bus.publish(mail_command());
        bus.flush().await;

        assert_eq!(bus.pending_count(), 0);
        assert!(!bus.has_handler(CommandKind::SendMail));
    }
}
