//! Polite fetch layer
//!
//! This module contains everything between a caller asking for a URL and a
//! response body coming back:
//! - A process-wide pacer enforcing a minimum interval between requests
//! - HTTP client construction with the source's fixed header set
//! - Outcome classification by HTTP status and transport error class
//! - A bounded retry loop with jittered backoff on rate limiting

mod client;
mod outcome;
mod pacer;
mod retry;
mod scheduler;

pub use client::{build_http_client, image_headers, request_headers};
pub use outcome::{FetchError, FetchOutcome, TransportErrorKind};
#[doc(hidden)]
pub use pacer::ManualClock;
pub use pacer::{Clock, Pacer, Sleep, SystemClock};
pub use retry::{RetryPolicy, RetryState};
pub use scheduler::{FetchOptions, RequestScheduler};
