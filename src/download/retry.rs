//! Retry logic with exponential backoff and per-attempt timeouts.
//!
//! This module provides the [`RetryPolicy`] and [`FailureType`] types for
//! classifying HTTP errors and determining retry behavior, plus
//! [`run_with_retry`], the single retry loop shared by every request variant
//! of [`HttpClient`](super::HttpClient).
//!
//! # Overview
//!
//! When an attempt fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - Temporary failures that may succeed on retry
//! - [`FailureType::Permanent`] - Failures that won't succeed regardless of retries
//! - [`FailureType::RateLimited`] - Server rate limiting (retries with backoff)
//! - [`FailureType::Cancelled`] - The caller asked to stop
//!
//! The [`RetryPolicy`] then determines whether to retry based on failure type
//! and attempt count, calculating exponential backoff delays.
//!
//! # Example
//!
//! ```
//! use attachments_core::download::{
//!     DownloadError, RetryPolicy, FailureType, RetryDecision, classify_error
//! };
//!
//! let policy = RetryPolicy::default();
//! let error = DownloadError::http_status("https://example.com/file.png", 503);
//! let failure_type = classify_error(&error);
//!
//! match policy.should_retry(failure_type, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::Exhausted { attempts } => {
//!         println!("Gave up after {attempts} attempts");
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::DownloadError;
use super::constants::{DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_RETRY_DELAY, DEFAULT_RETRY_DELAY};

/// Default maximum attempts (including the first one).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Classification of request failure types.
///
/// Used to determine whether a failed attempt should be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: attempt timeout, 5xx server errors, connection refused.
    Transient,

    /// Permanent failure that won't succeed regardless of retries.
    ///
    /// Examples: 404 Not Found, invalid URL, file too large, local IO error.
    Permanent,

    /// Server rate limiting (HTTP 429).
    RateLimited,

    /// The top-level cancellation signal fired.
    Cancelled,
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// The failure was retryable but every allowed attempt has been used.
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    /// Do not retry: the failure would not go away.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior with exponential backoff.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `base_delay`: 1 second
/// - `max_delay`: 32 seconds
/// - `attempt_timeout`: 30 seconds
///
/// # Delay Calculation
///
/// ```text
/// delay = min(base_delay * 2^(attempt - 1), max_delay)
/// ```
///
/// With defaults, delays are 1s then 2s before hitting max attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Base delay for the first retry.
    base_delay: Duration,

    /// Maximum delay cap.
    max_delay: Duration,

    /// Hard limit for one attempt; the attempt is cancelled when it elapses.
    attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_RETRY_DELAY,
            max_delay: DEFAULT_MAX_RETRY_DELAY,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with custom settings.
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Maximum attempts including initial (clamped to >= 1)
    /// * `base_delay` - Base delay for first retry
    /// * `max_delay` - Maximum delay cap
    /// * `attempt_timeout` - Hard timeout for each attempt
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            attempt_timeout,
        }
    }

    /// Creates a policy with a custom `max_attempts`, using defaults for other settings.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns a copy with a different base backoff delay.
    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Returns a copy with a different per-attempt timeout.
    #[must_use]
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the base backoff delay.
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the hard timeout applied to each attempt.
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Determines whether to retry a failed attempt.
    ///
    /// # Arguments
    ///
    /// * `failure_type` - Classification of the failure
    /// * `attempt` - The attempt number that just failed (1-indexed)
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        match failure_type {
            FailureType::Permanent => {
                return RetryDecision::DoNotRetry {
                    reason: "permanent failure - retry would not help".to_string(),
                };
            }
            FailureType::Cancelled => {
                return RetryDecision::DoNotRetry {
                    reason: "cancelled by caller".to_string(),
                };
            }
            FailureType::Transient | FailureType::RateLimited => {}
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::Exhausted { attempts: attempt };
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

    /// Calculates the backoff for the attempt that just failed.
    ///
    /// Formula: `min(base_delay * 2^(attempt - 1), max_delay)`
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Classifies an error into a failure type for retry decisions.
///
/// # HTTP Status Code Classification
///
/// | Status | Type | Rationale |
/// |--------|------|-----------|
/// | 408 | Transient | Request timeout - may succeed |
/// | 429 | RateLimited | Rate limited - retry with backoff |
/// | other 4xx | Permanent | Client error - won't succeed on retry |
/// | 5xx | Transient | Server error - may be temporary |
///
/// # Non-HTTP Errors
///
/// | Error | Type | Rationale |
/// |-------|------|-----------|
/// | Timeout | Transient | Network may recover |
/// | Network (most) | Transient | Server may come back |
/// | Network (TLS, builder) | Permanent | Certificate/config issue |
/// | Cancelled | Cancelled | Caller is shutting down |
/// | IO, InvalidUrl, TooLarge | Permanent | Won't change on retry |
#[instrument]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { status, .. } => classify_http_status(*status),

        DownloadError::Timeout { .. } => FailureType::Transient,

        DownloadError::Cancelled { .. } => FailureType::Cancelled,

        DownloadError::Network { source, .. } => {
            if source.is_builder() || is_tls_error(source) {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }

        DownloadError::RetriesExhausted { last_error, .. } => classify_error(last_error),

        DownloadError::Io { .. }
        | DownloadError::InvalidUrl { .. }
        | DownloadError::TooLarge { .. }
        | DownloadError::ClientBuild { .. } => FailureType::Permanent,
    }
}

/// Classifies an HTTP status code into a failure type.
#[allow(clippy::match_same_arms)]
fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 => FailureType::Transient,   // Request Timeout
        429 => FailureType::RateLimited, // Too Many Requests

        status if (400..500).contains(&status) => FailureType::Permanent,

        status if (500..600).contains(&status) => FailureType::Transient,

        _ => FailureType::Permanent,
    }
}

/// Checks if a reqwest error is a TLS/certificate error.
fn is_tls_error(error: &reqwest::Error) -> bool {
    let error_string = error.to_string().to_lowercase();
    error_string.contains("certificate")
        || error_string.contains("tls")
        || error_string.contains("ssl")
        || error_string.contains("handshake")
}

/// Runs `operation` until it succeeds, fails permanently, or runs out of attempts.
///
/// Each attempt is raced against the policy's attempt timeout and the
/// `cancel` token; a losing attempt future is dropped, which aborts the
/// in-flight request. Backoff sleeps also observe `cancel`.
///
/// The closure receives the 1-indexed attempt number.
///
/// # Errors
///
/// - The attempt's own error when it is not retryable.
/// - [`DownloadError::RetriesExhausted`] when every allowed attempt failed
///   with a retryable error.
/// - [`DownloadError::Cancelled`] when `cancel` fires.
pub async fn run_with_retry<T, F, Fut>(
    url: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, DownloadError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, DownloadError>>,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        debug!(url, attempt, max_attempts = policy.max_attempts(), "attempting request");

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(DownloadError::cancelled(url)),
            timed = tokio::time::timeout(policy.attempt_timeout(), operation(attempt)) => {
                timed.unwrap_or_else(|_| Err(DownloadError::timeout(url)))
            }
        };

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        match policy.should_retry(classify_error(&error), attempt) {
            RetryDecision::Retry {
                delay,
                attempt: next_attempt,
            } => {
                info!(
                    url,
                    attempt = next_attempt,
                    max_attempts = policy.max_attempts(),
                    delay_ms = delay.as_millis(),
                    error = %error,
                    "retrying request"
                );
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
                    () = tokio::time::sleep(delay) => {}
                }
            }
            RetryDecision::Exhausted { attempts } => {
                warn!(url, attempts, error = %error, "request failed after all attempts");
                return Err(DownloadError::retries_exhausted(url, attempts, error));
            }
            RetryDecision::DoNotRetry { reason } => {
                debug!(url, %reason, "not retrying request");
                return Err(error);
            }
        }
    }
}
