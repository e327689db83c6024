//! Retry classification and backoff schedule.
//!
//! Pure policy, no I/O. The fetcher consults this module to decide
//! whether a failed attempt is worth repeating and how long to wait
//! before the next one.
//!
//! ## What retries
//!
//! ```text
//! retried        timeouts, connection-level failures, 5xx, 429
//! not retried    other 4xx (the answer won't change), invalid content
//! ```
//!
//! ## Backoff
//!
//! Linear: `base × attempt`. With the default 500ms base the waits are
//! 500ms, 1s, 1.5s, ... Growth is deliberate but mild — these are CDN
//! image fetches, not a contended API.

use std::time::Duration;

/// Whether a response status is worth retrying.
///
/// 5xx is a server-side fault, 429 is an explicit "come back later".
/// Every other status is a stable answer.
pub fn is_retryable_status(status: u16) -> bool {
    status >= 500 || status == 429
}

pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Delay before retry number `attempt` (1-based).
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    base * attempt
}
