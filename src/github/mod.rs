//! GitHub REST access for attachment processing.
//!
//! [`GithubClient`] implements [`crate::attachments::RenderedBodySource`] by
//! requesting `body_html` from the issue, pull request, review and comment
//! endpoints. It also collects the [`crate::attachments::SourceText`]s of an
//! issue or pull request.

mod client;
mod error;
mod repo;

pub use client::{DEFAULT_API_URL, GithubClient, PAGE_SIZE};
pub use error::GithubError;
pub use repo::RepoRef;
