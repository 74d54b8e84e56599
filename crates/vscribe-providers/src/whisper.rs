//! Local Whisper inference server client.
//!
//! Downloads the media file, then uploads it to a whisper.cpp style server
//! (`POST /inference`, multipart `file`) and returns the decoded text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{error_from_response, short_url, validate_media_url};
use crate::provider::{ProviderKind, TranscriptionProvider};

/// Whisper client configuration.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Base URL of the inference server
    pub server_url: String,
    pub language: String,
    pub download_timeout: Duration,
    pub request_timeout: Duration,
    /// Upper bound on downloaded media size
    pub max_download_bytes: u64,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            language: "en".to_string(),
            download_timeout: Duration::from_secs(300),
            request_timeout: Duration::from_secs(300),
            max_download_bytes: 512 * 1024 * 1024,
        }
    }
}

impl WhisperConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        let defaults = Self::default();
        let server_url = std::env::var("WHISPER_SERVER_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or(defaults.server_url);

        Url::parse(&server_url).map_err(|e| {
            ProviderError::config(format!("Invalid WHISPER_SERVER_URL '{}': {}", server_url, e))
        })?;

        Ok(Self {
            server_url,
            language: std::env::var("WHISPER_LANGUAGE").unwrap_or(defaults.language),
            download_timeout: std::env::var("WHISPER_DOWNLOAD_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.download_timeout),
            request_timeout: std::env::var("WHISPER_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_download_bytes: std::env::var("WHISPER_MAX_DOWNLOAD_MB")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(megabytes)
                .unwrap_or(defaults.max_download_bytes),
        })
    }
}

fn megabytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    text: String,
}

/// Whisper server client.
pub struct WhisperClient {
    http: Client,
    config: WhisperConfig,
}

impl WhisperClient {
    pub fn new(config: WhisperConfig) -> ProviderResult<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("vscribe-providers/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Self::new(WhisperConfig::from_env()?)
    }

    async fn download(&self, url: Url) -> ProviderResult<Vec<u8>> {
        let limit = self.config.max_download_bytes;

        let mut response = self
            .http
            .get(url)
            .timeout(self.config.download_timeout)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(e, "Media download"))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        if let Some(size) = response.content_length() {
            if size > limit {
                return Err(ProviderError::MediaTooLarge { size, limit });
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ProviderError::from_transport(e, "Media download"))?
        {
            let size = (bytes.len() + chunk.len()) as u64;
            if size > limit {
                return Err(ProviderError::MediaTooLarge { size, limit });
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!(bytes = bytes.len(), "Media downloaded");
        Ok(bytes)
    }
}

#[async_trait]
impl TranscriptionProvider for WhisperClient {
    fn name(&self) -> &str {
        ProviderKind::Whisper.as_str()
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Whisper
    }

    async fn transcribe(&self, video_url: &str) -> ProviderResult<String> {
        let media_url = validate_media_url(video_url)?;
        info!(url = short_url(video_url), "Downloading media for Whisper");

        let media = self.download(media_url).await?;

        let form = Form::new()
            .part("file", Part::bytes(media).file_name("media"))
            .text("response_format", "json")
            .text("language", self.config.language.clone());

        let response = self
            .http
            .post(format!("{}/inference", self.config.server_url))
            .timeout(self.config.request_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(e, "Whisper inference"))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: InferenceResponse = response.json().await?;
        Ok(body.text)
    }
}
