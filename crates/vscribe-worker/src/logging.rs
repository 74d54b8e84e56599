//! Tracing setup and per-job log lines.

use std::time::Duration;

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vscribe_models::JobId;

/// Install the global subscriber: JSON when `LOG_FORMAT=json`, ANSI text
/// otherwise. `RUST_LOG` refines the default `vscribe=info` filter.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vscribe=info,sqlx=warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Lifecycle log lines for one job, all carrying the job id.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: &'static str,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &'static str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation,
        }
    }

    pub fn log_start(&self, video_url: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            video_url = %video_url,
            "Processing job"
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(job_id = %self.job_id, operation = self.operation, "{}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, operation = self.operation, "{}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, operation = self.operation, "Job failed: {}", message);
    }

    pub fn log_completion(&self, transcript_chars: usize, elapsed: Duration) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            transcript_chars,
            elapsed_ms = elapsed.as_millis() as u64,
            "Job completed"
        );
    }

    /// Span wrapping everything done for this job.
    pub fn span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, operation = self.operation)
    }
}
