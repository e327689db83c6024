//! HTTP transport abstraction.
//!
//! A [`Transport`] performs exactly one GET and reports what came back —
//! no retries, no body interpretation, no policy. Everything above it
//! (retry classification, backoff, image sniffing) lives in
//! [`fetcher`](crate::fetch::fetcher) and is pure logic, which is the
//! point of the seam: tests drive the full retry machinery against a
//! scripted mock instead of a live server.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
}

/// One HTTP response, reduced to what the fetcher needs.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// A blocking HTTP GET. Implementations must not retry internally.
pub trait Transport {
    fn get(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted transport: hands out queued responses in order and records
    /// every requested URL.
    ///
    /// The final scripted response is sticky — it keeps replaying so retry
    /// loops always have something to hit ("server answers 503 forever" is
    /// one `Ok(status_response(503))` entry).
    pub struct MockTransport {
        responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
        requests: Mutex<Vec<String>>,
    }

    impl MockTransport {
        pub fn with_responses(
            responses: Vec<Result<TransportResponse, TransportError>>,
        ) -> MockTransport {
            MockTransport {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Every URL requested so far, in order.
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl Transport for MockTransport {
        fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
            self.requests.lock().unwrap().push(url.to_string());
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap_or_else(|| {
                    Err(TransportError::Network(
                        "mock transport: no scripted response".to_string(),
                    ))
                })
            }
        }
    }
}
