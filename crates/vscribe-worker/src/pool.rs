//! Worker pool consuming the job queue.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use vscribe_queue::{JobQueue, QueueError};

use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::processor::{panic_message, JobProcessor};

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of concurrent workers
    pub workers: usize,
    /// Blocking pop timeout
    pub pop_timeout: Duration,
    /// Pause after a queue backend error
    pub error_backoff: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            pop_timeout: Duration::from_secs(5),
            error_backoff: Duration::from_secs(1),
        }
    }
}

/// Snapshot of pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub queue_errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    queue_errors: AtomicU64,
}

/// Fixed set of workers that pop job ids and hand them to the processor.
pub struct WorkerPool {
    queue: Arc<dyn JobQueue>,
    processor: Arc<JobProcessor>,
    config: PoolConfig,
    shutdown: watch::Sender<bool>,
    counters: Arc<Counters>,
    name: String,
}

impl WorkerPool {
    pub fn new(queue: Arc<dyn JobQueue>, processor: Arc<JobProcessor>, config: PoolConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            queue,
            processor,
            config,
            shutdown,
            counters: Arc::new(Counters::default()),
            name: format!("pool-{}", Uuid::new_v4()),
        }
    }

    /// Run every worker until shutdown. Resolves once all of them have exited.
    pub async fn run(&self) -> WorkerResult<()> {
        if self.config.workers == 0 {
            return Err(WorkerError::configuration("worker pool needs at least one worker"));
        }

        info!(
            pool = %self.name,
            workers = self.config.workers,
            pop_timeout_secs = self.config.pop_timeout.as_secs_f64(),
            "Starting worker pool"
        );

        let handles: Vec<_> = (0..self.config.workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    queue: Arc::clone(&self.queue),
                    processor: Arc::clone(&self.processor),
                    config: self.config.clone(),
                    shutdown: self.shutdown.subscribe(),
                    counters: Arc::clone(&self.counters),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!(pool = %self.name, error = %e, "Worker task ended abnormally");
            }
        }

        info!(pool = %self.name, stats = ?self.stats(), "Worker pool stopped");
        Ok(())
    }

    /// Signal shutdown. Idle workers stop immediately; a worker processing a
    /// job finishes it first.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Receiver that flips to `true` on shutdown.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            processed: self.counters.processed.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            queue_errors: self.counters.queue_errors.load(Ordering::Relaxed),
        }
    }
}

struct Worker {
    id: usize,
    queue: Arc<dyn JobQueue>,
    processor: Arc<JobProcessor>,
    config: PoolConfig,
    shutdown: watch::Receiver<bool>,
    counters: Arc<Counters>,
}

impl Worker {
    async fn run(mut self) {
        debug!(worker = self.id, "Worker started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let popped = tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                result = self.queue.pop(self.config.pop_timeout) => result,
            };

            match popped {
                Ok(Some(message)) => self.handle(message.job_id).await,
                Ok(None) => trace!(worker = self.id, "Idle tick"),
                Err(QueueError::Closed) => {
                    warn!(worker = self.id, "Queue closed, stopping worker");
                    break;
                }
                Err(e) if e.is_invalid_payload() => {
                    self.record_queue_error(&e);
                    warn!(worker = self.id, error = %e, "Skipping invalid queue message");
                }
                Err(e) => {
                    self.record_queue_error(&e);
                    error!(worker = self.id, error = %e, "Error consuming jobs");

                    tokio::select! {
                        _ = self.shutdown.changed() => break,
                        _ = tokio::time::sleep(self.config.error_backoff) => {}
                    }
                }
            }
        }

        debug!(worker = self.id, "Worker stopped");
    }

    async fn handle(&self, job_id: vscribe_models::JobId) {
        info!(worker = self.id, job_id = %job_id, "Executing job");
        metrics::worker_busy();

        let succeeded = match AssertUnwindSafe(self.processor.execute(&job_id))
            .catch_unwind()
            .await
        {
            Ok(succeeded) => succeeded,
            Err(panic) => {
                error!(
                    worker = self.id,
                    job_id = %job_id,
                    panic = %panic_message(panic.as_ref()),
                    "Job processor panicked"
                );
                false
            }
        };

        metrics::worker_idle();
        self.counters.processed.fetch_add(1, Ordering::Relaxed);
        if succeeded {
            self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_queue_error(&self, e: &QueueError) {
        self.counters.queue_errors.fetch_add(1, Ordering::Relaxed);
        metrics::record_queue_error(e.kind());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::FallbackOrchestrator;
    use crate::testing::{RecordingStore, ScriptedProvider, ScriptedQueue};
    use vscribe_models::{JobStatus, JobUpdate};
    use vscribe_providers::TranscriptionProvider;

    fn fast_config(workers: usize, error_backoff: Duration) -> PoolConfig {
        PoolConfig {
            workers,
            pop_timeout: Duration::from_millis(20),
            error_backoff,
        }
    }

    fn pool(
        queue: Arc<ScriptedQueue>,
        store: Arc<RecordingStore>,
        provider: Arc<ScriptedProvider>,
        config: PoolConfig,
    ) -> Arc<WorkerPool> {
        let orchestrator = FallbackOrchestrator::new(vec![provider as Arc<dyn TranscriptionProvider>])
            .unwrap();
        let processor = Arc::new(JobProcessor::new(store, Arc::new(orchestrator)));
        Arc::new(WorkerPool::new(queue, processor, config))
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_processes_queued_jobs_then_stops() {
        let queue = Arc::new(ScriptedQueue::with_jobs(&["a", "b", "c"]));
        let store = Arc::new(
            RecordingStore::new()
                .with_job("a", "https://v/a")
                .with_job("b", "https://v/b")
                .with_pending("c"),
        );
        let pool = pool(
            queue,
            store.clone(),
            ScriptedProvider::text("A", "text"),
            fast_config(2, Duration::from_millis(10)),
        );

        let runner = tokio::spawn({
            let pool = Arc::clone(&pool);
            async move { pool.run().await }
        });

        wait_for(|| pool.stats().processed == 3).await;
        pool.shutdown();
        runner.await.unwrap().unwrap();

        let stats = pool.stats();
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(store.job("a").unwrap().status, JobStatus::Done);
        assert_eq!(store.job("c").unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_backoff_is_interrupted_by_shutdown() {
        let queue = Arc::new(ScriptedQueue::always_failing());
        let pool = pool(
            queue.clone(),
            Arc::new(RecordingStore::new()),
            ScriptedProvider::text("A", "text"),
            fast_config(3, Duration::from_secs(3600)),
        );

        let runner = tokio::spawn({
            let pool = Arc::clone(&pool);
            async move { pool.run().await }
        });

        wait_for(|| pool.stats().queue_errors >= 3).await;
        pool.shutdown();

        tokio::time::timeout(Duration::from_secs(2), runner)
            .await
            .expect("pool did not stop during backoff")
            .unwrap()
            .unwrap();
        assert_eq!(queue.pops(), 3);
    }

    #[tokio::test]
    async fn test_invalid_payload_skips_backoff() {
        let queue = Arc::new(ScriptedQueue::new());
        queue.push_result(Err(QueueError::invalid_payload("{}", "missing jobId")));
        queue.push_job("a");
        let store = Arc::new(RecordingStore::new().with_job("a", "https://v/a"));
        let pool = pool(
            queue,
            store.clone(),
            ScriptedProvider::text("A", "text"),
            fast_config(1, Duration::from_secs(3600)),
        );

        let runner = tokio::spawn({
            let pool = Arc::clone(&pool);
            async move { pool.run().await }
        });

        wait_for(|| pool.stats().processed == 1).await;
        pool.shutdown();
        runner.await.unwrap().unwrap();

        assert_eq!(pool.stats().queue_errors, 1);
        assert_eq!(store.last_update(), Some(JobUpdate::done("text")));
    }

    #[tokio::test]
    async fn test_worker_recovers_after_transient_error() {
        let queue = Arc::new(ScriptedQueue::new());
        queue.push_result(Err(QueueError::connection_failed("connection reset")));
        queue.push_job("a");
        let store = Arc::new(RecordingStore::new().with_job("a", "https://v/a"));
        let pool = pool(
            queue.clone(),
            store.clone(),
            ScriptedProvider::text("A", "text"),
            fast_config(1, Duration::from_millis(30)),
        );

        let runner = tokio::spawn({
            let pool = Arc::clone(&pool);
            async move { pool.run().await }
        });

        wait_for(|| pool.stats().processed == 1).await;
        pool.shutdown();
        runner.await.unwrap().unwrap();

        let stats = pool.stats();
        assert_eq!(stats.queue_errors, 1);
        assert_eq!(stats.succeeded, 1);
        assert!(queue.pops() >= 2);
        assert_eq!(store.job("a").unwrap().status, JobStatus::Done);
    }

    #[tokio::test]
    async fn test_in_flight_job_finishes_after_shutdown() {
        let queue = Arc::new(ScriptedQueue::with_jobs(&["slow"]));
        let store = Arc::new(RecordingStore::new().with_job("slow", "https://v/slow"));
        let provider = ScriptedProvider::delayed("A", Duration::from_millis(200), "late text");
        let pool = pool(
            queue,
            store.clone(),
            provider.clone(),
            fast_config(1, Duration::from_millis(10)),
        );

        let runner = tokio::spawn({
            let pool = Arc::clone(&pool);
            async move { pool.run().await }
        });

        wait_for(|| provider.calls() == 1).await;
        pool.shutdown();
        assert!(pool.is_shutting_down());
        runner.await.unwrap().unwrap();

        assert_eq!(pool.stats().succeeded, 1);
        assert_eq!(store.job("slow").unwrap().transcript.as_deref(), Some("late text"));
    }

    #[tokio::test]
    async fn test_spawns_configured_worker_count() {
        let queue = Arc::new(ScriptedQueue::always_failing());
        let pool = pool(
            queue.clone(),
            Arc::new(RecordingStore::new()),
            ScriptedProvider::text("A", "text"),
            fast_config(4, Duration::from_secs(3600)),
        );

        let runner = tokio::spawn({
            let pool = Arc::clone(&pool);
            async move { pool.run().await }
        });

        wait_for(|| queue.pops() == 4).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(queue.pops(), 4);

        pool.shutdown();
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let pool = pool(
            Arc::new(ScriptedQueue::new()),
            Arc::new(RecordingStore::new()),
            ScriptedProvider::text("A", "text"),
            fast_config(0, Duration::from_millis(10)),
        );
        let err = pool.run().await.unwrap_err();
        assert!(err.is_configuration());
    }
}
