//! Worker configuration.

use std::net::SocketAddr;
use std::time::Duration;

use vscribe_providers::ProviderKind;

use crate::error::{WorkerError, WorkerResult};
use crate::pool::PoolConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of queue consumers
    pub concurrency: usize,
    /// How long a single pop blocks before an idle tick
    pub pop_timeout: Duration,
    /// Pause after a queue backend error
    pub error_backoff: Duration,
    /// Providers in fallback order
    pub providers: Vec<ProviderKind>,
    /// Prometheus listener address, disabled when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            pop_timeout: Duration::from_secs(5),
            error_backoff: Duration::from_millis(1000),
            providers: vec![ProviderKind::Supadata],
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let concurrency = std::env::var("WORKER_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);
        if concurrency == 0 {
            return Err(WorkerError::configuration(
                "WORKER_CONCURRENCY must be at least 1",
            ));
        }

        let providers = std::env::var("TRANSCRIPTION_PROVIDERS")
            .unwrap_or_else(|_| "supadata".to_string());
        let providers = ProviderKind::parse_list(&providers)
            .map_err(|e| WorkerError::configuration(format!("TRANSCRIPTION_PROVIDERS: {}", e)))?;

        let metrics_addr = match std::env::var("METRICS_ADDR") {
            Ok(addr) if !addr.trim().is_empty() => Some(addr.trim().parse().map_err(|e| {
                WorkerError::configuration(format!("Invalid METRICS_ADDR '{}': {}", addr, e))
            })?),
            _ => None,
        };

        Ok(Self {
            concurrency,
            pop_timeout: Duration::from_secs(
                std::env::var("WORKER_POP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            error_backoff: Duration::from_millis(
                std::env::var("WORKER_ERROR_BACKOFF_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            providers,
            metrics_addr,
        })
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            workers: self.concurrency,
            pop_timeout: self.pop_timeout,
            error_backoff: self.error_backoff,
        }
    }
}
