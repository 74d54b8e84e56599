//! Job queue backed by a Redis list.
//!
//! The backend LPUSHes `{"jobId": "..."}` payloads; workers BRPOP them, so
//! jobs are consumed in FIFO order and each payload reaches one worker.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use vscribe_models::JobMessage;

use crate::error::{QueueError, QueueResult};
use crate::pool::RedisPool;

/// Source of job messages consumed by the worker pool.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Block for up to `timeout` waiting for the next message.
    ///
    /// Returns `Ok(None)` when the timeout elapses with nothing queued.
    async fn pop(&self, timeout: Duration) -> QueueResult<Option<JobMessage>>;

    /// Number of messages waiting.
    async fn len(&self) -> QueueResult<u64>;

    /// Check backend connectivity.
    async fn ping(&self) -> QueueResult<()>;
}

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// List key holding pending job messages
    pub queue_name: String,
    /// Maximum pooled connections
    pub max_connections: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            queue_name: "video_processing".to_string(),
            max_connections: 50,
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            queue_name: std::env::var("QUEUE_NAME")
                .unwrap_or_else(|_| "video_processing".to_string()),
            max_connections: std::env::var("REDIS_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(50),
        }
    }
}

/// Redis list queue client.
pub struct RedisQueue {
    pool: RedisPool,
    config: QueueConfig,
}

impl RedisQueue {
    /// Create a queue client without touching the network.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        let pool = RedisPool::new(client, config.max_connections);
        Ok(Self { pool, config })
    }

    /// Create the client and verify the connection.
    pub async fn connect(config: QueueConfig) -> QueueResult<Self> {
        let queue = Self::new(config)?;
        queue.ping().await.map_err(|e| {
            QueueError::connection_failed(format!(
                "Redis at {} is unreachable: {}",
                redact_url(&queue.config.redis_url),
                e
            ))
        })?;
        info!(
            queue = %queue.config.queue_name,
            max_connections = queue.config.max_connections,
            "Redis connection established"
        );
        Ok(queue)
    }

    /// Create from environment variables.
    pub async fn from_env() -> QueueResult<Self> {
        Self::connect(QueueConfig::from_env()).await
    }

    /// Enqueue a job message.
    pub async fn push(&self, message: &JobMessage) -> QueueResult<()> {
        let payload = message.to_json()?;
        let mut conn = self.pool.get().await?;

        redis::cmd("LPUSH")
            .arg(&self.config.queue_name)
            .arg(&payload)
            .query_async::<()>(&mut *conn)
            .await?;
        conn.release();

        debug!(job_id = %message.job_id, "Enqueued job");
        Ok(())
    }

    /// Close the connection pool.
    pub fn close(&self) {
        self.pool.close();
        info!(queue = %self.config.queue_name, "Redis connection pool closed");
    }

    pub fn queue_name(&self) -> &str {
        &self.config.queue_name
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn pop(&self, timeout: Duration) -> QueueResult<Option<JobMessage>> {
        let mut conn = self.pool.get().await?;

        let reply: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(&self.config.queue_name)
            .arg(brpop_timeout(timeout))
            .query_async(&mut *conn)
            .await?;
        conn.release();

        let Some((_, payload)) = reply else {
            return Ok(None);
        };

        match JobMessage::from_json(&payload) {
            Ok(message) => {
                debug!(job_id = %message.job_id, "Popped job from queue");
                Ok(Some(message))
            }
            Err(e) => {
                warn!(payload = %payload, error = %e, "Dropping malformed queue message");
                Err(QueueError::invalid_payload(payload, e))
            }
        }
    }

    async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.pool.get().await?;
        let len: u64 = redis::cmd("LLEN")
            .arg(&self.config.queue_name)
            .query_async(&mut *conn)
            .await?;
        conn.release();
        Ok(len)
    }

    async fn ping(&self) -> QueueResult<()> {
        let mut conn = self.pool.get().await?;
        redis::cmd("PING").query_async::<()>(&mut *conn).await?;
        conn.release();
        Ok(())
    }
}

/// BRPOP takes seconds as a float; zero would block forever.
fn brpop_timeout(timeout: Duration) -> f64 {
    timeout.as_secs_f64().max(0.01)
}

/// Strip credentials from a Redis URL before logging it.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
