//! Video transcription worker.
//!
//! This crate provides:
//! - Ordered provider fallback (`FallbackOrchestrator`)
//! - The per-job lifecycle (`JobProcessor`)
//! - A queue-consuming worker pool with graceful shutdown
//! - Worker configuration, logging and metrics

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod pool;
pub mod processor;

#[cfg(test)]
pub(crate) mod testing;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use orchestrator::FallbackOrchestrator;
pub use pool::{PoolConfig, PoolStats, WorkerPool};
pub use processor::JobProcessor;
