//! Bounded retry for transport failures.
//!
//! Only transport failures ([`FailureType::Transient`]) are retried, and only
//! up to [`RetryPolicy::max_attempts`] in total. Status errors and block pages
//! are [`FailureType::Permanent`]: repeating the same request gets the same
//! answer.
//!
//! # Example
//!
//! ```
//! use caschool_core::fetch::{FetchError, FailureType, RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::default();
//! let error = FetchError::timeout("https://example.com/acgr24.txt");
//! assert_eq!(classify_error(&error), FailureType::Transient);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { attempt, .. } => assert_eq!(attempt, 2),
//!     RetryDecision::DoNotRetry { reason } => panic!("{reason}"),
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::FetchError;

/// Default maximum attempts, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;
const MAX_JITTER: Duration = Duration::from_millis(250);

/// Hard ceiling on attempts regardless of configuration.
pub const MAX_ATTEMPTS_CEILING: u32 = 5;

/// Classification of a fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// May succeed on retry (connection reset, timeout).
    Transient,
    /// Will not succeed on retry (404, block page, bad URL).
    Permanent,
}

/// Decision on whether to retry a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after `delay`; `attempt` is the number of the next attempt.
    Retry { delay: Duration, attempt: u32 },
    /// Give up.
    DoNotRetry { reason: String },
}

/// Retry configuration with exponential backoff and jitter.
///
/// ```text
/// delay = min(base_delay * multiplier^(attempt - 1), max_delay) + jitter
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to `1..=MAX_ATTEMPTS_CEILING`.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
    ) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS_CEILING),
            base_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Default delays with a custom attempt count.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS_CEILING),
            ..Self::default()
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::with_max_attempts(1)
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides whether to retry after `attempt` (1-indexed) failed.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );
        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * f64::from(self.backoff_multiplier).powf(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64) + Self::jitter()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn jitter() -> Duration {
        let jitter_ms = rand::thread_rng().gen_range(0..=MAX_JITTER.as_millis() as u64);
        Duration::from_millis(jitter_ms)
    }
}

/// Classifies a fetch error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Timeout | Transient |
/// | Network (most) | Transient |
/// | Network (TLS) | Permanent |
/// | HttpStatus, BlockPage, UnexpectedContent | Permanent |
/// | TooLarge, InvalidUrl, ClientBuild | Permanent |
#[must_use]
pub fn classify_error(error: &FetchError) -> FailureType {
    match error {
        FetchError::Timeout { .. } => FailureType::Transient,
        FetchError::Network { source, .. } => {
            if is_tls_error(source) {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }
        FetchError::HttpStatus { .. }
        | FetchError::BlockPage { .. }
        | FetchError::UnexpectedContent { .. }
        | FetchError::TooLarge { .. }
        | FetchError::InvalidUrl { .. }
        | FetchError::ClientBuild { .. } => FailureType::Permanent,
    }
}

fn is_tls_error(error: &reqwest::Error) -> bool {
    let text = error.to_string().to_lowercase();
    ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| text.contains(needle))
}
