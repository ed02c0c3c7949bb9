//! Retrying HTTP client used for rendered-body lookups and file downloads.
//!
//! This module provides request execution with bounded retries, exponential
//! backoff and a hard per-attempt timeout enforced by cancelling the attempt.
//!
//! # Features
//!
//! - Buffered responses ([`HttpClient::execute`]) for callers that stream bytes themselves
//! - Incrementally decoded text bodies ([`HttpClient::execute_streaming_text`])
//! - One retry state machine ([`run_with_retry`]) shared by both variants
//! - Structured error types with full context
//! - A shared cancellation token reaching every in-flight request
//!
//! # Example
//!
//! ```no_run
//! use attachments_core::download::{HttpClient, HttpRequest, RetryPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let response = client
//!     .execute(&HttpRequest::get("https://example.com/image.png"), &RetryPolicy::default())
//!     .await?;
//! println!("status: {}", response.status());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod retry;

pub use client::{HttpClient, HttpRequest};
pub use error::DownloadError;
pub use retry::{
    DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error, run_with_retry,
};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
