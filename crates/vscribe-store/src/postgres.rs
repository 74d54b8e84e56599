//! Postgres-backed job store.
//!
//! Reads the job to URL mapping from `videos` and writes terminal statuses to
//! `jobs`. The pool is created by [`PostgresJobStore::connect`] and closed
//! with [`PostgresJobStore::close`]; nothing here is process-global.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use tracing::{debug, info, instrument, warn};

use vscribe_models::{Job, JobId, JobStatus, JobUpdate};

use crate::error::{StoreError, StoreResult};
use crate::store::JobStore;

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Postgres connection URL
    pub database_url: String,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// Pool size cap
    pub max_connections: u32,
    /// Wait limit for a free connection
    pub acquire_timeout: Duration,
    /// Server-side statement timeout
    pub statement_timeout: Duration,
}

impl StoreConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            min_connections: 1,
            max_connections: 20,
            acquire_timeout: Duration::from_secs(10),
            statement_timeout: Duration::from_secs(60),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| StoreError::config("DATABASE_URL must be set"))?;

        if database_url.trim().is_empty() {
            return Err(StoreError::config("DATABASE_URL cannot be empty"));
        }

        Ok(Self {
            database_url,
            min_connections: std::env::var("DATABASE_MIN_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            acquire_timeout: Duration::from_secs(
                std::env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            statement_timeout: Duration::from_secs(
                std::env::var("DATABASE_STATEMENT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        })
    }
}

#[derive(Debug, FromRow)]
struct JobRow {
    id: String,
    status: String,
    transcription: Option<String>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::from_str(&row.status)
            .map_err(|e| StoreError::invalid_row(format!("job {}: {}", row.id, e)))?;

        Ok(Job {
            id: JobId::from_string(row.id),
            status,
            transcript: row.transcription,
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres job store.
#[derive(Debug, Clone)]
pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build the connection pool and verify it.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let options = PgConnectOptions::from_str(&config.database_url)?.options([(
            "statement_timeout",
            format!("{}ms", config.statement_timeout.as_millis()),
        )]);

        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        info!(
            min_connections = config.min_connections,
            max_connections = config.max_connections,
            "PostgreSQL connection pool created"
        );

        Ok(Self::new(pool))
    }

    /// Create from environment variables.
    pub async fn from_env() -> StoreResult<Self> {
        Self::connect(&StoreConfig::from_env()?).await
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL connection pool closed");
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    #[instrument(skip(self), fields(job_id = %job_id))]
    async fn get_video_url(&self, job_id: &JobId) -> StoreResult<Option<String>> {
        let url: Option<String> = sqlx::query_scalar(
            r#"
            SELECT v.url
            FROM videos v
            WHERE v.job_id = $1
            ORDER BY v.created_at ASC
            LIMIT 1
            "#,
        )
        .bind(job_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if url.is_none() {
            debug!("No video mapped to job");
        }
        Ok(url)
    }

    #[instrument(skip(self, update), fields(job_id = %job_id, status = %update.status()))]
    async fn update_status(&self, job_id: &JobId, update: &JobUpdate) -> StoreResult<bool> {
        let result = match update {
            JobUpdate::Done { transcript } => {
                sqlx::query(
                    r#"
                    UPDATE jobs
                    SET status = $2, transcription = $3, error = NULL, updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(job_id.as_str())
                .bind(JobStatus::Done.as_str())
                .bind(transcript)
                .execute(&self.pool)
                .await?
            }
            JobUpdate::Failed { error } => {
                sqlx::query(
                    r#"
                    UPDATE jobs
                    SET status = $2, error = $3, updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(job_id.as_str())
                .bind(JobStatus::Failed.as_str())
                .bind(error)
                .execute(&self.pool)
                .await?
            }
        };

        let applied = result.rows_affected() == 1;
        if !applied {
            warn!(rows = result.rows_affected(), "Status update did not apply");
        }
        Ok(applied)
    }

    #[instrument(skip(self), fields(job_id = %job_id))]
    async fn get_job(&self, job_id: &JobId) -> StoreResult<Option<Job>> {
        let row: Option<JobRow> = sqlx::query_as(
            r#"
            SELECT id, status, transcription, error, created_at, updated_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(job_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Job::try_from).transpose()
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
