//! Scripted collaborators for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use vscribe_models::{Job, JobId, JobMessage, JobUpdate};
use vscribe_providers::{ProviderError, ProviderKind, ProviderResult, TranscriptionProvider};
use vscribe_queue::{JobQueue, QueueError, QueueResult};
use vscribe_store::{JobStore, StoreError, StoreResult};

enum Behavior {
    Text(String),
    Fail(String),
    Delayed(Duration, String),
    Panic,
}

/// Provider that always answers the same way and counts its calls.
pub struct ScriptedProvider {
    name: String,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn build(name: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn text(name: &str, text: &str) -> Arc<Self> {
        Self::build(name, Behavior::Text(text.to_string()))
    }

    pub fn failing(name: &str, message: &str) -> Arc<Self> {
        Self::build(name, Behavior::Fail(message.to_string()))
    }

    pub fn delayed(name: &str, delay: Duration, text: &str) -> Arc<Self> {
        Self::build(name, Behavior::Delayed(delay, text.to_string()))
    }

    pub fn panicking(name: &str) -> Arc<Self> {
        Self::build(name, Behavior::Panic)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Supadata
    }

    async fn transcribe(&self, _video_url: &str) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Text(text) => Ok(text.clone()),
            Behavior::Fail(message) => Err(ProviderError::Timeout(message.clone())),
            Behavior::Delayed(delay, text) => {
                tokio::time::sleep(*delay).await;
                Ok(text.clone())
            }
            Behavior::Panic => panic!("provider crashed"),
        }
    }
}

/// How the store answers status writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Apply,
    /// `Done` writes report zero rows; `Failed` writes still apply
    RejectDone,
    /// `Done` writes return an error; `Failed` writes still apply
    ErrorOnDone,
    /// Every write returns an error
    ErrorAlways,
}

/// In-memory job store recording every write.
#[derive(Default)]
pub struct RecordingStore {
    urls: HashMap<String, String>,
    jobs: Mutex<HashMap<String, Job>>,
    updates: Mutex<Vec<(JobId, JobUpdate)>>,
    reads: AtomicUsize,
    fail_reads: bool,
    panic_on_read: bool,
    write_mode: WriteMode,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending job mapped to `url`.
    pub fn with_job(mut self, job_id: &str, url: &str) -> Self {
        self.urls.insert(job_id.to_string(), url.to_string());
        self.with_pending(job_id)
    }

    /// Register a pending job with no video row.
    pub fn with_pending(self, job_id: &str) -> Self {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.insert(job_id.to_string(), Job::new(JobId::from(job_id)));
        }
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn panicking_reads(mut self) -> Self {
        self.panic_on_read = true;
        self
    }

    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    pub fn updates(&self) -> Vec<(JobId, JobUpdate)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn last_update(&self) -> Option<JobUpdate> {
        self.updates().pop().map(|(_, update)| update)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn job(&self, job_id: &str) -> Option<Job> {
        self.jobs.lock().unwrap().get(job_id).cloned()
    }
}

#[async_trait]
impl JobStore for RecordingStore {
    async fn get_video_url(&self, job_id: &JobId) -> StoreResult<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_read {
            panic!("store crashed");
        }
        if self.fail_reads {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.urls.get(job_id.as_str()).cloned())
    }

    async fn update_status(&self, job_id: &JobId, update: &JobUpdate) -> StoreResult<bool> {
        self.updates
            .lock()
            .unwrap()
            .push((job_id.clone(), update.clone()));

        let is_done = matches!(update, JobUpdate::Done { .. });
        match self.write_mode {
            WriteMode::ErrorAlways => return Err(StoreError::Database(sqlx::Error::PoolTimedOut)),
            WriteMode::ErrorOnDone if is_done => {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut))
            }
            WriteMode::RejectDone if is_done => return Ok(false),
            _ => {}
        }

        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(job_id.as_str()) {
            Some(job) => {
                job.apply(update);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_job(&self, job_id: &JobId) -> StoreResult<Option<Job>> {
        Ok(self.job(job_id.as_str()))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Queue that replays scripted pop results, then idles.
#[derive(Default)]
pub struct ScriptedQueue {
    script: Mutex<VecDeque<QueueResult<Option<JobMessage>>>>,
    repeat_error: bool,
    pops: AtomicUsize,
}

impl ScriptedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs(ids: &[&str]) -> Self {
        let queue = Self::new();
        for id in ids {
            queue.push_job(id);
        }
        queue
    }

    /// Answer every pop with a connection error.
    pub fn always_failing() -> Self {
        Self {
            repeat_error: true,
            ..Self::default()
        }
    }

    pub fn push_job(&self, id: &str) {
        self.push_result(Ok(Some(JobMessage::new(JobId::from(id)))));
    }

    pub fn push_result(&self, result: QueueResult<Option<JobMessage>>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn pops(&self) -> usize {
        self.pops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobQueue for ScriptedQueue {
    async fn pop(&self, timeout: Duration) -> QueueResult<Option<JobMessage>> {
        self.pops.fetch_add(1, Ordering::SeqCst);
        if self.repeat_error {
            return Err(QueueError::connection_failed("connection refused"));
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }

    async fn len(&self) -> QueueResult<u64> {
        Ok(self.script.lock().unwrap().len() as u64)
    }

    async fn ping(&self) -> QueueResult<()> {
        Ok(())
    }
}
