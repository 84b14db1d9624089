use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use feedback_notifier::bus::RedisCommandBus;
use feedback_notifier::config::Settings;
use feedback_notifier::i18n::Catalog;
use feedback_notifier::redis::{RedisHealth, RedisPool};
use feedback_notifier::server::{create_app, AppState};
use feedback_notifier::subscription::create_subscriber_resolver;
use feedback_notifier::tasks::NotificationDeps;
use feedback_notifier::telemetry::init_telemetry;
use feedback_notifier::triggers::PostCreatedSubscriber;
use feedback_notifier::worker::Worker;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::new()?;

    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");

    // Shared Redis connection for the command bus and the subscriber directory
    let redis_health = Arc::new(RedisHealth::new());
    let redis_pool = Arc::new(RedisPool::new(settings.redis.clone(), redis_health.clone())?);

    let resolver = create_subscriber_resolver(&settings.directory, Some(redis_pool.clone()));
    if settings.directory.backend != "redis" {
        tracing::warn!(
            backend = %settings.directory.backend,
            "Subscriber directory is in-memory and starts empty; no notifications will be sent"
        );
    }

    let bus = Arc::new(RedisCommandBus::new(
        redis_pool.clone(),
        settings.redis.command_prefix.clone(),
    ));
    let localizer = Arc::new(Catalog::builtin(settings.i18n.default_locale.clone()));
    let deps = NotificationDeps::new(resolver, bus, localizer);

    let (shutdown_tx, _) = broadcast::channel(1);

    let (worker, worker_handle) = Worker::spawn(&settings.worker, shutdown_tx.subscribe());

    let subscriber = PostCreatedSubscriber::new(
        settings.redis.clone(),
        worker.clone(),
        deps,
        redis_health.clone(),
        shutdown_tx.clone(),
    );
    let subscriber_handle = tokio::spawn(async move {
        if let Err(e) = subscriber.start().await {
            tracing::error!(error = %e, "Post created subscriber failed");
        }
    });

    let state = AppState::new(settings.clone(), redis_health, worker);
    let app = create_app(state);

    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Ops server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    tracing::info!("Waiting for background tasks to finish...");
    let _ = tokio::join!(subscriber_handle, worker_handle);

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Stops the trigger and drains the worker
    let _ = shutdown_tx.send(());
}
