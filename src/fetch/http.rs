//! Live [`Transport`] implementation backed by `reqwest`.

use crate::fetch::transport::{Transport, TransportError, TransportResponse};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;

/// Sent with every request. CDNs fronting social media images vary their
/// response on `Accept`, and some refuse clients that do not claim image
/// support.
const ACCEPT_IMAGES: &str =
    "image/avif,image/webp,image/heif,image/heic,image/apng,image/*;q=0.8,*/*;q=0.5";

/// Some hosts reject unadorned generic user agents outright.
const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; snapstash/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Blocking HTTP client with a fixed per-request timeout.
///
/// The timeout covers the whole request, connect through body. Redirects
/// are followed (reqwest's default policy).
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<HttpTransport, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, ACCEPT_IMAGES)
            .send()
            .map_err(classify)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        // Body is read even for error statuses; the fetcher decides what
        // to do with the status code.
        let body = response.bytes().map_err(classify)?.to_vec();

        Ok(TransportResponse {
            status,
            content_type,
            body,
        })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err.to_string())
    }
}
