//! Error types for the download module.
//!
//! This module defines structured errors for all HTTP operations,
//! providing context-rich error messages for debugging and user feedback.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching or downloading over HTTP.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// A single attempt exceeded its hard timeout and was cancelled.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The request was aborted by the top-level cancellation signal.
    #[error("request to {url} cancelled")]
    Cancelled {
        /// The URL whose request was cancelled.
        url: String,
    },

    /// Non-2xx HTTP response.
    #[error("HTTP {status} {status_text} fetching {url}: {body}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Canonical reason phrase for the status.
        status_text: String,
        /// Response body text (best-effort).
        body: String,
    },

    /// File system error while writing a download.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The response is larger than the configured limit.
    #[error("file at {url} is too large: {actual_bytes} bytes exceeds limit of {limit_bytes} bytes")]
    TooLarge {
        /// The URL being downloaded.
        url: String,
        /// Configured maximum size in bytes.
        limit_bytes: u64,
        /// Declared or received size in bytes.
        actual_bytes: u64,
    },

    /// All attempts for a transient failure were used up.
    #[error("failed to fetch {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// The URL that kept failing.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        last_error: Box<DownloadError>,
    },

    /// The underlying reqwest client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error without a response body.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::http_status_with_body(url, status, "", "")
    }

    /// Creates an HTTP status error carrying the status text and response body.
    pub fn http_status_with_body(
        url: impl Into<String>,
        status: u16,
        status_text: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a size-limit error.
    pub fn too_large(url: impl Into<String>, limit_bytes: u64, actual_bytes: u64) -> Self {
        Self::TooLarge {
            url: url.into(),
            limit_bytes,
            actual_bytes,
        }
    }

    /// Wraps the final attempt's error once retries are used up.
    pub fn retries_exhausted(url: impl Into<String>, attempts: u32, last_error: Self) -> Self {
        Self::RetriesExhausted {
            url: url.into(),
            attempts,
            last_error: Box::new(last_error),
        }
    }

    /// Returns true when this error (or the final attempt it wraps) is a size-limit rejection.
    #[must_use]
    pub fn is_too_large(&self) -> bool {
        match self {
            Self::TooLarge { .. } => true,
            Self::RetriesExhausted { last_error, .. } => last_error.is_too_large(),
            _ => false,
        }
    }
}

// Constructors take the URL or path explicitly instead of `From` impls:
// reqwest and IO errors do not carry the context our variants need.
