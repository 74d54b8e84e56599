//! Single-job lifecycle: resolve URL, transcribe, persist a terminal status.
//!
//! `execute` never returns an error and never panics. Every failure,
//! including a panic inside a collaborator, ends in a best-effort `Failed`
//! write so no job is left looking like it is still being worked on.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::{error, Instrument};

use vscribe_models::{JobId, JobUpdate};
use vscribe_store::JobStore;

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::orchestrator::FallbackOrchestrator;

pub struct JobProcessor {
    store: Arc<dyn JobStore>,
    orchestrator: Arc<FallbackOrchestrator>,
}

impl JobProcessor {
    pub fn new(store: Arc<dyn JobStore>, orchestrator: Arc<FallbackOrchestrator>) -> Self {
        Self { store, orchestrator }
    }

    /// Process one job. Returns true only when a `Done` status was stored.
    pub async fn execute(&self, job_id: &JobId) -> bool {
        if job_id.is_blank() {
            error!("Refusing to process job with blank id");
            return false;
        }

        let logger = JobLogger::new(job_id, "transcription");
        let started = Instant::now();

        let outcome = AssertUnwindSafe(self.process(job_id, &logger, started))
            .catch_unwind()
            .instrument(logger.span())
            .await;

        let succeeded = match outcome {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                let message = e.to_string();
                logger.log_error(&message);
                self.mark_failed(job_id, message, &logger).await;
                false
            }
            Err(panic) => {
                let message = format!("Job {} aborted: {}", job_id, panic_message(panic.as_ref()));
                logger.log_error(&message);
                self.mark_failed(job_id, message, &logger).await;
                false
            }
        };

        metrics::record_job(
            if succeeded { "done" } else { "failed" },
            started.elapsed().as_secs_f64(),
        );
        succeeded
    }

    async fn process(&self, job_id: &JobId, logger: &JobLogger, started: Instant) -> WorkerResult<()> {
        let video_url = self
            .store
            .get_video_url(job_id)
            .await?
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                WorkerError::invalid_input(format!("No video URL found for job {}", job_id))
            })?;

        logger.log_start(&video_url);

        let transcript = self.orchestrator.transcribe(&video_url).await?;
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(WorkerError::EmptyTranscript(job_id.clone()));
        }

        logger.log_progress("Storing transcript");
        match self.store.update_status(job_id, &JobUpdate::done(transcript)).await {
            Ok(true) => {
                logger.log_completion(transcript.len(), started.elapsed());
                Ok(())
            }
            Ok(false) => Err(WorkerError::persistence(format!(
                "Failed to persist transcript for job {}: update did not apply",
                job_id
            ))),
            Err(e) => Err(WorkerError::persistence(format!(
                "Failed to persist transcript for job {}: {}",
                job_id, e
            ))),
        }
    }

    /// Best-effort `Failed` write; problems are logged, never raised.
    async fn mark_failed(&self, job_id: &JobId, message: String, logger: &JobLogger) {
        let update = JobUpdate::failed(message);
        let write = AssertUnwindSafe(self.store.update_status(job_id, &update))
            .catch_unwind()
            .await;

        match write {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => logger.log_warning("Failed status was not applied (no matching job)"),
            Ok(Err(e)) if e.is_connection_error() => logger.log_warning(&format!(
                "Could not record failure, database unreachable: {}",
                e
            )),
            Ok(Err(e)) => logger.log_warning(&format!("Could not record failure: {}", e)),
            Err(panic) => logger.log_warning(&format!(
                "Could not record failure: {}",
                panic_message(panic.as_ref())
            )),
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
