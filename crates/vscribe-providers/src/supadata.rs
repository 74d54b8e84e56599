//! Supadata transcript API client.
//!
//! `GET /transcript` answers either with the transcript (`200`) or, for long
//! videos, with a job id (`202`) that is polled at `GET /transcript/{jobId}`
//! until it completes or fails.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::http::{error_from_response, short_url, validate_media_url};
use crate::provider::{ProviderKind, TranscriptionProvider};

const DEFAULT_BASE_URL: &str = "https://api.supadata.ai/v1";

/// Supadata client configuration.
#[derive(Debug, Clone)]
pub struct SupadataConfig {
    pub api_key: String,
    pub base_url: String,
    /// Preferred transcript language
    pub lang: String,
    /// `native`, `generate` or `auto`
    pub mode: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Delay between job status polls
    pub poll_interval: Duration,
    /// Polls before giving up on an async job
    pub max_polls: u32,
}

impl SupadataConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            lang: "en".to_string(),
            mode: "auto".to_string(),
            timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(2000),
            max_polls: 60,
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = std::env::var("SUPADATA_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::config("SUPADATA_API_KEY not set"))?;

        let defaults = Self::new(api_key);
        Ok(Self {
            base_url: std::env::var("SUPADATA_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url.clone()),
            lang: std::env::var("SUPADATA_LANG").unwrap_or(defaults.lang.clone()),
            mode: std::env::var("SUPADATA_MODE").unwrap_or(defaults.mode.clone()),
            timeout: std::env::var("SUPADATA_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            poll_interval: std::env::var("SUPADATA_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            max_polls: std::env::var("SUPADATA_MAX_POLLS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_polls),
            ..defaults
        })
    }
}

/// Transcript body: plain text when `text=true`, timed chunks otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Content {
    Text(String),
    Chunks(Vec<Chunk>),
}

#[derive(Debug, Deserialize)]
struct Chunk {
    text: String,
}

impl Content {
    fn into_text(self) -> String {
        match self {
            Content::Text(text) => text,
            Content::Chunks(chunks) => chunks
                .into_iter()
                .map(|c| c.text)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    content: Content,
    #[serde(default)]
    lang: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobAccepted {
    #[serde(rename = "jobId")]
    job_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum JobState {
    Queued,
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: JobState,
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Supadata API client.
pub struct SupadataClient {
    http: Client,
    config: SupadataConfig,
}

impl SupadataClient {
    pub fn new(config: SupadataConfig) -> ProviderResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("vscribe-providers/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Self::new(SupadataConfig::from_env()?)
    }

    async fn poll_job(&self, job_id: &str) -> ProviderResult<String> {
        let url = format!("{}/transcript/{}", self.config.base_url, job_id);

        for attempt in 1..=self.config.max_polls {
            tokio::time::sleep(self.config.poll_interval).await;

            let response = self
                .http
                .get(&url)
                .header("x-api-key", &self.config.api_key)
                .send()
                .await
                .map_err(|e| ProviderError::from_transport(e, "Supadata job poll"))?;

            if !response.status().is_success() {
                return Err(error_from_response(response).await);
            }

            let body: JobStatusResponse = response.json().await?;
            match body.status {
                JobState::Completed => {
                    let content = body.content.ok_or_else(|| {
                        ProviderError::invalid_response("completed job has no content")
                    })?;
                    debug!(job_id, attempt, "Supadata job completed");
                    return Ok(content.into_text());
                }
                JobState::Failed => {
                    let message = body
                        .error
                        .map(|e| match e {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        })
                        .unwrap_or_else(|| "unknown error".to_string());
                    return Err(ProviderError::JobFailed {
                        job_id: job_id.to_string(),
                        message,
                    });
                }
                JobState::Queued | JobState::Active => {
                    debug!(job_id, attempt, "Supadata job still running");
                }
            }
        }

        warn!(job_id, polls = self.config.max_polls, "Supadata job did not finish");
        Err(ProviderError::Timeout(format!(
            "Supadata job {} not finished after {} polls",
            job_id, self.config.max_polls
        )))
    }
}

#[async_trait]
impl TranscriptionProvider for SupadataClient {
    fn name(&self) -> &str {
        ProviderKind::Supadata.as_str()
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Supadata
    }

    async fn transcribe(&self, video_url: &str) -> ProviderResult<String> {
        let media_url = validate_media_url(video_url)?;
        info!(url = short_url(video_url), "Requesting Supadata transcript");

        let response = self
            .http
            .get(format!("{}/transcript", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .query(&[
                ("url", media_url.as_str()),
                ("lang", self.config.lang.as_str()),
                ("text", "true"),
                ("mode", self.config.mode.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(e, "Supadata request"))?;

        match response.status() {
            StatusCode::OK => {
                let body: TranscriptResponse = response.json().await?;
                debug!(lang = ?body.lang, "Supadata returned transcript");
                Ok(body.content.into_text())
            }
            StatusCode::ACCEPTED => {
                let job: JobAccepted = response.json().await?;
                info!(job_id = %job.job_id, "Supadata queued transcript job");
                self.poll_job(&job.job_id).await
            }
            _ => Err(error_from_response(response).await),
        }
    }
}
