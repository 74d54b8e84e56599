//! HTTP helpers shared by the provider clients.

use reqwest::Response;
use serde::Deserialize;
use url::Url;

use crate::error::{ProviderError, ProviderResult};

/// Accept only absolute http(s) URLs with a host.
pub(crate) fn validate_media_url(raw: &str) -> ProviderResult<Url> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed)
        .map_err(|e| ProviderError::invalid_url(format!("{}: {}", trimmed, e)))?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        scheme => Err(ProviderError::invalid_url(format!(
            "unsupported URL '{}' (scheme {})",
            trimmed, scheme
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Build an error from a non-success response, preferring a JSON
/// `message`/`error` field over the raw body.
pub(crate) async fn error_from_response(response: Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or(body);

    ProviderError::from_http_status(status, truncate(&message, 500))
}

/// Shorten a URL for log lines.
pub(crate) fn short_url(url: &str) -> &str {
    truncate(url, 100)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
