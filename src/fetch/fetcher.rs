//! Image fetching with bounded retry.
//!
//! Takes one image source string and produces validated image bytes plus
//! their sniffed format. Three kinds of source are accepted:
//!
//! ```text
//! https://cdn.example.com/a.jpg     HTTP(S) — fetched with retry/backoff
//! data:image/png;base64,iVBO...     inline payload, decoded in place
//! ./saved/local.jpg                 local file, read directly
//! ```
//!
//! ## Retry discipline
//!
//! An HTTP fetch makes at most `max_retries + 1` attempts. Transient
//! failures (timeout, connection errors, 5xx, 429) are retried with
//! linear backoff; any other status is final on the spot. A body that is
//! not a recognizable image is also final — the server answered, the
//! answer is just not an image, and asking again won't change it.
//!
//! Every failure here is a per-row failure. The pipeline records it on
//! the row's manifest entry and moves on.

use crate::fetch::retry;
use crate::fetch::transport::{Transport, TransportError};
use crate::normalize::ImageFormat;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid content: {0}")]
    InvalidContent(String),
    #[error("invalid source: {0}")]
    InvalidUrl(String),
}

/// Knobs for the HTTP fetch path.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Whole-request timeout, connect through body.
    pub timeout: Duration,
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Base delay for linear backoff between attempts.
    pub retry_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_secs(15),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Validated image bytes and their sniffed format.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

/// Resolve one image source to bytes.
///
/// Dispatches on the source shape; only HTTP(S) sources involve the
/// transport and the retry loop.
pub fn fetch(
    transport: &impl Transport,
    source: &str,
    config: &FetchConfig,
) -> Result<FetchResult, FetchError> {
    let source = source.trim();
    if source.is_empty() {
        return Err(FetchError::InvalidUrl("empty image source".to_string()));
    }
    if source.starts_with("data:") {
        return fetch_data_url(source);
    }
    if let Ok(url) = reqwest::Url::parse(source) {
        if matches!(url.scheme(), "http" | "https") {
            return fetch_http(transport, source, config);
        }
    }
    let path = Path::new(source);
    if path.is_file() {
        return fetch_local(path);
    }
    Err(FetchError::InvalidUrl(format!(
        "unsupported source: {source}"
    )))
}

fn fetch_http(
    transport: &impl Transport,
    url: &str,
    config: &FetchConfig,
) -> Result<FetchResult, FetchError> {
    // Replaced on the first attempt; the loop always runs at least once.
    let mut last_error = FetchError::Network("no attempts made".to_string());

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            std::thread::sleep(retry::retry_delay(config.retry_delay, attempt));
        }
        match transport.get(url) {
            Ok(response) if retry::is_success(response.status) => {
                return image_result(response.body, response.content_type.as_deref());
            }
            Ok(response) if retry::is_retryable_status(response.status) => {
                last_error = FetchError::HttpStatus(response.status);
            }
            Ok(response) => return Err(FetchError::HttpStatus(response.status)),
            Err(TransportError::Timeout) => last_error = FetchError::Timeout,
            Err(TransportError::Network(message)) => last_error = FetchError::Network(message),
        }
    }
    Err(last_error)
}

/// Decode a `data:` URL payload.
///
/// `data:[<mediatype>][;base64],<payload>` — non-base64 payloads are taken
/// as literal bytes.
fn fetch_data_url(source: &str) -> Result<FetchResult, FetchError> {
    let rest = &source["data:".len()..];
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| FetchError::InvalidUrl("data URL has no comma separator".to_string()))?;

    let (mime, is_base64) = match header.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (header, false),
    };

    let bytes = if is_base64 {
        BASE64
            .decode(payload.trim())
            .map_err(|e| FetchError::InvalidContent(format!("base64 decode failed: {e}")))?
    } else {
        payload.as_bytes().to_vec()
    };

    let content_type = if mime.is_empty() { None } else { Some(mime) };
    image_result(bytes, content_type)
}

fn fetch_local(path: &Path) -> Result<FetchResult, FetchError> {
    let bytes = std::fs::read(path)
        .map_err(|e| FetchError::Network(format!("failed to read {}: {e}", path.display())))?;
    image_result(bytes, None)
}

/// Accept the body only if it sniffs as an image.
///
/// The content-type header is reported in the error for diagnosis but
/// never trusted for acceptance.
fn image_result(body: Vec<u8>, content_type: Option<&str>) -> Result<FetchResult, FetchError> {
    if body.is_empty() {
        return Err(FetchError::InvalidContent("empty body".to_string()));
    }
    match ImageFormat::sniff(&body) {
        Some(format) => Ok(FetchResult {
            bytes: body,
            format,
        }),
        None => Err(FetchError::InvalidContent(match content_type {
            Some(ct) => format!("body is not a recognizable image (content-type: {ct})"),
            None => "body is not a recognizable image".to_string(),
        })),
    }
}
