//! Raw fetcher: downloads source files and validates what came back.
//!
//! - [`HttpClient`] - pooled `reqwest` client with timeouts and a size ceiling
//! - [`FetchError`] - transport vs. status vs. wrong-content failures
//! - [`check_signature`] - block page and file signature sniffing
//! - [`RetryPolicy`] - bounded retry for transport failures only

mod client;
mod constants;
mod error;
mod retry;
mod sniff;

pub use client::{ClientSettings, FetchedBody, HttpClient};
pub use constants::{CONNECT_TIMEOUT_SECS, MAX_BODY_BYTES, READ_TIMEOUT_SECS};
pub use error::FetchError;
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, FailureType, MAX_ATTEMPTS_CEILING, RetryDecision, RetryPolicy,
    classify_error,
};
pub use sniff::{ExpectedContent, check_signature, looks_like_html};
