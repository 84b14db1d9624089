//! Bounded-concurrency task runner.
//!
//! Tasks are queued on a bounded channel and run on their own tokio task once a
//! semaphore permit is free. Failures are logged and counted, never retried.
//! On shutdown the queue is closed, already queued tasks still run, and the
//! runner waits for every in-flight task before returning.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::WorkerConfig;
use crate::metrics::TaskMetrics;
use crate::tasks::TaskError;

/// A unit of work run by the [`Worker`]
#[async_trait]
pub trait Task: Send + Sync {
    /// Stable name used in logs and metrics
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<(), TaskError>;
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Worker queue is full")]
    QueueFull,

    #[error("Worker is shut down")]
    Closed,
}

/// Task counters
#[derive(Debug, Default)]
pub struct WorkerStats {
    pub queued: AtomicU64,
    pub running: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
}

impl WorkerStats {
    pub fn snapshot(&self) -> WorkerStatsSnapshot {
        WorkerStatsSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            running: self.running.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of worker statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerStatsSnapshot {
    pub queued: u64,
    pub running: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Handle used to submit tasks. Cheap to clone.
#[derive(Clone)]
pub struct Worker {
    sender: mpsc::Sender<Box<dyn Task>>,
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Start the runner loop. The returned handle completes once the runner
    /// has drained after a shutdown signal (or every `Worker` was dropped).
    pub fn spawn(
        config: &WorkerConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> (Self, JoinHandle<()>) {
        let capacity = config.queue_capacity.max(1);
        let concurrency = config.concurrency.max(1);

        let (sender, receiver) = mpsc::channel(capacity);
        let stats = Arc::new(WorkerStats::default());

        let handle = tokio::spawn(run_loop(receiver, concurrency, stats.clone(), shutdown));

        tracing::info!(concurrency, queue_capacity = capacity, "Worker started");

        (Self { sender, stats }, handle)
    }

    /// Queue a task without waiting for capacity
    pub fn submit(&self, task: Box<dyn Task>) -> Result<(), WorkerError> {
        let name = task.name();
        self.mark_queued();
        match self.sender.try_send(task) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.unmark_queued();
                TaskMetrics::record_rejected(name);
                match e {
                    mpsc::error::TrySendError::Full(_) => Err(WorkerError::QueueFull),
                    mpsc::error::TrySendError::Closed(_) => Err(WorkerError::Closed),
                }
            }
        }
    }

    /// Queue a task, waiting for capacity if the queue is full
    pub async fn enqueue(&self, task: Box<dyn Task>) -> Result<(), WorkerError> {
        let name = task.name();
        self.mark_queued();
        match self.sender.send(task).await {
            Ok(()) => Ok(()),
            Err(_) => {
                self.unmark_queued();
                TaskMetrics::record_rejected(name);
                Err(WorkerError::Closed)
            }
        }
    }

    pub fn stats(&self) -> WorkerStatsSnapshot {
        self.stats.snapshot()
    }

    // Counted before the send so the runner never sees a task it has not counted
    fn mark_queued(&self) {
        let queued = self.stats.queued.fetch_add(1, Ordering::Relaxed) + 1;
        TaskMetrics::set_queued(queued as usize);
    }

    fn unmark_queued(&self) {
        let queued = self.stats.queued.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        TaskMetrics::set_queued(queued as usize);
    }
}

async fn run_loop(
    mut receiver: mpsc::Receiver<Box<dyn Task>>,
    concurrency: usize,
    stats: Arc<WorkerStats>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let semaphore = Arc::new(Semaphore::new(concurrency));
    // Cleared once every shutdown sender is gone; the queue then ends the loop
    let mut listening = true;

    loop {
        tokio::select! {
            signal = shutdown.recv(), if listening => {
                match signal {
                    Ok(()) | Err(RecvError::Lagged(_)) => {
                        tracing::info!("Worker received shutdown signal, draining queue");
                        receiver.close();
                        while let Some(task) = receiver.recv().await {
                            start_task(task, &semaphore, &stats).await;
                        }
                        break;
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!("Shutdown channel closed, running until handles are dropped");
                        listening = false;
                    }
                }
            }
            task = receiver.recv() => {
                match task {
                    Some(task) => start_task(task, &semaphore, &stats).await,
                    None => break,
                }
            }
        }
    }

    // Every permit back means every task finished
    let _ = semaphore.acquire_many(concurrency as u32).await;
    tracing::info!(stats = ?stats.snapshot(), "Worker stopped");
}

async fn start_task(task: Box<dyn Task>, semaphore: &Arc<Semaphore>, stats: &Arc<WorkerStats>) {
    let permit = match semaphore.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return,
    };

    let queued = stats.queued.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
    TaskMetrics::set_queued(queued as usize);
    stats.running.fetch_add(1, Ordering::Relaxed);

    let stats = stats.clone();
    let name = task.name();
    let span = tracing::info_span!("worker.task", task = name);

    tokio::spawn(
        async move {
            let _permit = permit;
            let started = Instant::now();
            let result = task.run().await;
            let elapsed = started.elapsed();

            stats.running.fetch_sub(1, Ordering::Relaxed);

            match result {
                Ok(()) => {
                    stats.succeeded.fetch_add(1, Ordering::Relaxed);
                    TaskMetrics::record_success(name, elapsed);
                    tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "Task completed");
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    TaskMetrics::record_failure(name, elapsed);
                    tracing::error!(
                        error = %e,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Task failed"
                    );
                }
            }
        }
        .instrument(span),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use crate::bus::{BusError, CommandKind};

    struct TestTask {
        runs: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Task for TestTask {
        fn name(&self) -> &'static str {
            "test_task"
        }

        async fn run(&self) -> Result<(), TaskError> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(TaskError::Dispatch {
                    command: CommandKind::TriggerWebhooks,
                    source: BusError::Transport("down".to_string()),
                })
            } else {
                Ok(())
            }
        }
    }

    fn config(concurrency: usize, queue_capacity: usize) -> WorkerConfig {
        WorkerConfig {
            concurrency,
            queue_capacity,
        }
    }

    #[tokio::test]
    async fn test_runs_tasks_and_counts_outcomes() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (worker, handle) = Worker::spawn(&config(2, 16), shutdown_tx.subscribe());
        let runs = Arc::new(AtomicUsize::new(0));

        for i in 0..5 {
            worker
                .enqueue(Box::new(TestTask {
                    runs: runs.clone(),
                    fail: i % 2 == 0,
                }))
                .await
                .unwrap();
        }

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 5);
        let stats = worker.stats();
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.running, 0);
        assert_eq!(stats.queued, 0);
    }

    #[tokio::test]
    async fn test_rejects_after_shutdown() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (worker, handle) = Worker::spawn(&config(1, 4), shutdown_tx.subscribe());

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        let result = worker.submit(Box::new(TestTask {
            runs: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }));
        assert!(matches!(result, Err(WorkerError::Closed)));
    }

    #[tokio::test]
    async fn test_stops_when_all_handles_dropped() {
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let (worker, handle) = Worker::spawn(&config(1, 4), shutdown_tx.subscribe());
        let runs = Arc::new(AtomicUsize::new(0));

        worker
            .submit(Box::new(TestTask {
                runs: runs.clone(),
                fail: false,
            }))
            .unwrap();
        drop(worker);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_keeps_serving_after_shutdown_sender_dropped() {
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        let (worker, handle) = Worker::spawn(&config(1, 4), shutdown_rx);
        let runs = Arc::new(AtomicUsize::new(0));

        drop(shutdown_tx);
        tokio::time::sleep(Duration::from_millis(20)).await;

        worker
            .enqueue(Box::new(TestTask {
                runs: runs.clone(),
                fail: false,
            }))
            .await
            .unwrap();
        assert!(!handle.is_finished());

        drop(worker);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
