//! Image fetching: transport seam, retry policy, and source resolution.
//!
//! Layered so that everything above the socket is testable:
//!
//! ```text
//! fetcher     source dispatch, retry loop, image validation   (pure logic)
//! retry       status classification + backoff schedule        (pure policy)
//! transport   the Transport trait — one GET, no policy        (the seam)
//! http        reqwest-backed live implementation              (the socket)
//! ```

pub mod fetcher;
pub mod http;
pub mod retry;
pub mod transport;

pub use fetcher::{FetchConfig, FetchError, FetchResult, fetch};
pub use http::HttpTransport;
pub use transport::{Transport, TransportError, TransportResponse};
