//! Resolution of attachment links to authenticated URLs via rendered HTML.
//!
//! The platform only exposes the signed, time-limited download URL of an
//! uploaded file in the HTML rendering of the text that references it. The
//! resolver fetches that rendering through a [`RenderedBodySource`] and scans
//! it for three URL shapes, in document order:
//!
//! 1. signed images on the private image host (`...?jwt=...`)
//! 2. generic uploads under `<server>/user-attachments/files/`
//! 3. images on the legacy image host

use std::collections::HashSet;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, instrument, warn};

use super::error::{AttachmentError, RenderedBodyError};
use super::hosts::AttachmentHosts;
use super::model::{ResolvedUrl, SourceText};

/// Characters that terminate a URL inside HTML attributes or text.
const URL_BODY: &str = r#"[^\s"'<>()]"#;

/// Read access to the HTML rendering of each kind of source text.
///
/// Every method returns `Ok(None)` when the platform has no rendered body.
#[async_trait]
pub trait RenderedBodySource: Send + Sync {
    /// Rendered HTML of an issue or pull-request conversation comment.
    async fn issue_comment_html(&self, comment_id: u64)
    -> Result<Option<String>, RenderedBodyError>;

    /// Rendered HTML of an inline review comment.
    async fn review_comment_html(
        &self,
        comment_id: u64,
    ) -> Result<Option<String>, RenderedBodyError>;

    /// Rendered HTML of a pull request review summary.
    async fn review_html(
        &self,
        pull_number: u64,
        review_id: u64,
    ) -> Result<Option<String>, RenderedBodyError>;

    /// Rendered HTML of an issue body.
    async fn issue_html(&self, issue_number: u64) -> Result<Option<String>, RenderedBodyError>;

    /// Rendered HTML of a pull request body.
    async fn pull_request_html(
        &self,
        pull_number: u64,
    ) -> Result<Option<String>, RenderedBodyError>;
}

/// Turns a [`SourceText`] into the ordered list of its authenticated URLs.
#[derive(Debug, Clone)]
pub struct RenderedLinkResolver {
    pattern: Regex,
}

impl RenderedLinkResolver {
    /// Builds a resolver for the given hosts.
    ///
    /// # Errors
    ///
    /// Returns [`AttachmentError::Pattern`] if the URL pattern fails to compile.
    pub fn new(hosts: &AttachmentHosts) -> Result<Self, AttachmentError> {
        let private = regex::escape(hosts.private_image_host());
        let files = regex::escape(&format!("{}files/", hosts.attachments_prefix()));
        let legacy = regex::escape(hosts.legacy_image_host());
        let pattern = Regex::new(&format!(
            "(?P<signed>{private}/{URL_BODY}*?jwt={URL_BODY}+)\
             |(?P<file>{files}{URL_BODY}+)\
             |(?P<legacy>{legacy}/{URL_BODY}+)"
        ))
        .map_err(AttachmentError::pattern)?;
        Ok(Self { pattern })
    }

    /// Fetches the rendered HTML for `source` and extracts resolved URLs.
    ///
    /// Returns `None` when no rendered body is available, whether the
    /// platform has none or the lookup failed. Both cases are logged.
    #[instrument(skip_all, fields(source = %source))]
    pub async fn resolve(
        &self,
        source: &SourceText,
        bodies: &dyn RenderedBodySource,
    ) -> Option<Vec<ResolvedUrl>> {
        let html = match source {
            SourceText::IssueBody { issue_number, .. } => bodies.issue_html(*issue_number).await,
            SourceText::PullRequestBody { pull_number, .. } => {
                bodies.pull_request_html(*pull_number).await
            }
            SourceText::IssueComment { comment_id, .. } => {
                bodies.issue_comment_html(*comment_id).await
            }
            SourceText::Review {
                pull_number,
                review_id,
                ..
            } => bodies.review_html(*pull_number, *review_id).await,
            SourceText::ReviewComment { comment_id, .. } => {
                bodies.review_comment_html(*comment_id).await
            }
        };

        match html {
            Ok(Some(html)) => Some(self.extract_resolved_urls(&html)),
            Ok(None) => {
                warn!(source = %source, "no rendered body available");
                None
            }
            Err(error) => {
                warn!(source = %source, error = %error, "rendered body lookup failed");
                None
            }
        }
    }

    /// Scans HTML for authenticated URLs, deduplicated in first-seen order.
    #[must_use]
    pub fn extract_resolved_urls(&self, html: &str) -> Vec<ResolvedUrl> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        for captures in self.pattern.captures_iter(html) {
            let (found, is_image_shaped) = if let Some(m) = captures.name("signed") {
                (m, true)
            } else if let Some(m) = captures.name("file") {
                (m, false)
            } else if let Some(m) = captures.name("legacy") {
                (m, true)
            } else {
                continue;
            };

            let url = found.as_str().replace("&amp;", "&");
            if !seen.insert(url.clone()) {
                continue;
            }
            resolved.push(ResolvedUrl {
                url,
                ordinal: resolved.len(),
                is_image_shaped,
            });
        }

        debug!(count = resolved.len(), "extracted resolved URLs");
        resolved
    }
}
