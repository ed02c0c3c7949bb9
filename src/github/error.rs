//! Error types for the GitHub REST client.

use thiserror::Error;

use crate::download::DownloadError;

/// Errors from GitHub REST lookups.
#[derive(Debug, Error)]
pub enum GithubError {
    /// The HTTP request failed (after retries where applicable).
    #[error(transparent)]
    Http(DownloadError),

    /// The response body was not the expected JSON shape.
    #[error("unexpected response from {url}: {source}")]
    Decode {
        /// Endpoint that returned the body.
        url: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A repository reference was not of the form `owner/name`.
    #[error("invalid repository '{input}': expected owner/name")]
    InvalidRepo {
        /// The rejected input.
        input: String,
    },

    /// The token contains characters that cannot be sent in a header.
    #[error("GitHub token contains characters not allowed in an HTTP header")]
    InvalidToken,
}

impl GithubError {
    /// Wraps an HTTP failure.
    #[must_use]
    pub fn http(source: DownloadError) -> Self {
        Self::Http(source)
    }

    /// Creates a decode error for `url`.
    #[must_use]
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid repository error.
    #[must_use]
    pub fn invalid_repo(input: impl Into<String>) -> Self {
        Self::InvalidRepo {
            input: input.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_repo_display() {
        assert_eq!(
            GithubError::invalid_repo("nope").to_string(),
            "invalid repository 'nope': expected owner/name"
        );
    }

    #[test]
    fn test_http_error_is_transparent() {
        let error = GithubError::http(DownloadError::timeout("https://api.github.com/x"));
        assert_eq!(error.to_string(), "timeout fetching https://api.github.com/x");
    }
}
