//! Attachments Core Library
//!
//! This library finds files uploaded into GitHub issues, pull requests,
//! reviews and comments, resolves them to their signed download URLs and
//! fetches them into a local staging directory, producing a map from each
//! original attachment URL to the local file.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`attachments`] - Reference extraction, resolution, matching, classification and the pipeline
//! - [`download`] - Retrying HTTP client with per-attempt timeouts and cancellation
//! - [`github`] - GitHub REST access for rendered bodies and source texts

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attachments;
pub mod download;
pub mod github;
#[cfg(test)]
pub(crate) mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use attachments::{
    AttachmentOptions, AttachmentPipeline, AttachmentUrlMap, PipelineReport, RenderedBodySource,
    SourceText,
};
pub use download::{
    DEFAULT_MAX_RETRIES, DownloadError, FailureType, HttpClient, HttpRequest, RetryDecision,
    RetryPolicy, classify_error,
};
pub use github::{GithubClient, GithubError, RepoRef};
