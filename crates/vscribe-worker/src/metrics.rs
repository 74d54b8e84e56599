//! Prometheus metrics for the worker.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{WorkerError, WorkerResult};

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::configuration(format!("Failed to start metrics exporter: {}", e)))
}

/// Metric names as constants for consistency.
pub mod names {
    // Job metrics
    pub const JOBS_TOTAL: &str = "vscribe_jobs_total";
    pub const JOB_DURATION_SECONDS: &str = "vscribe_job_duration_seconds";

    // Provider metrics
    pub const PROVIDER_ATTEMPTS_TOTAL: &str = "vscribe_provider_attempts_total";
    pub const PROVIDER_DURATION_SECONDS: &str = "vscribe_provider_duration_seconds";

    // Queue / pool metrics
    pub const QUEUE_ERRORS_TOTAL: &str = "vscribe_queue_errors_total";
    pub const QUEUE_LENGTH: &str = "vscribe_queue_length";
    pub const WORKERS_ACTIVE: &str = "vscribe_workers_active";
}

/// Record a finished job. `outcome` is `done` or `failed`.
pub fn record_job(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::JOBS_TOTAL, &labels).increment(1);
    histogram!(names::JOB_DURATION_SECONDS).record(duration_secs);
}

/// Record one provider attempt. `outcome` is `success`, `empty` or `error`.
pub fn record_provider_attempt(provider: &str, outcome: &str, duration_secs: f64) {
    let labels = [
        ("provider", provider.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::PROVIDER_ATTEMPTS_TOTAL, &labels).increment(1);

    let labels = [("provider", provider.to_string())];
    histogram!(names::PROVIDER_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_queue_error(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::QUEUE_ERRORS_TOTAL, &labels).increment(1);
}

pub fn set_queue_length(length: u64) {
    gauge!(names::QUEUE_LENGTH).set(length as f64);
}

pub fn worker_busy() {
    gauge!(names::WORKERS_ACTIVE).increment(1.0);
}

pub fn worker_idle() {
    gauge!(names::WORKERS_ACTIVE).decrement(1.0);
}
