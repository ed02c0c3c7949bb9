//! Discovery of uploaded-file links in raw markdown.

use regex::Regex;
use tracing::{debug, trace};

use super::AttachmentError;
use super::hosts::AttachmentHosts;
use super::model::AttachmentReference;

/// Finds markdown links (`[label](url)` and `![label](url)`) that point at
/// the platform's `user-attachments/assets/` or `user-attachments/files/` paths.
#[derive(Debug, Clone)]
pub struct ReferenceExtractor {
    pattern: Regex,
}

impl ReferenceExtractor {
    /// Builds an extractor for the given hosts.
    ///
    /// # Errors
    ///
    /// Returns [`AttachmentError::Pattern`] if the link pattern fails to compile.
    pub fn new(hosts: &AttachmentHosts) -> Result<Self, AttachmentError> {
        let prefix = regex::escape(&hosts.attachments_prefix());
        // Optional `<...>` around the URL and an optional quoted title are tolerated.
        let pattern = Regex::new(&format!(
            r#"!?\[[^\]]*\]\(\s*<?({prefix}(?:assets|files)/[^\s)>]+)>?(?:\s+"[^"]*")?\s*\)"#
        ))
        .map_err(AttachmentError::pattern)?;
        Ok(Self { pattern })
    }

    /// Returns references in the order they appear; ordinal is the index.
    #[tracing::instrument(skip(self, body), fields(body_len = body.len()))]
    #[must_use]
    pub fn extract(&self, body: &str) -> Vec<AttachmentReference> {
        let references: Vec<AttachmentReference> = self
            .pattern
            .captures_iter(body)
            .filter_map(|captures| captures.get(1))
            .enumerate()
            .map(|(ordinal, url)| {
                trace!(ordinal, url = url.as_str(), "found attachment reference");
                AttachmentReference {
                    original_url: url.as_str().to_string(),
                    ordinal,
                }
            })
            .collect();

        debug!(count = references.len(), "extracted attachment references");
        references
    }
}

/// One-shot helper: compiles an extractor and runs it over `body`.
///
/// # Errors
///
/// Returns [`AttachmentError::Pattern`] if the link pattern fails to compile.
pub fn extract_references(
    body: &str,
    hosts: &AttachmentHosts,
) -> Result<Vec<AttachmentReference>, AttachmentError> {
    Ok(ReferenceExtractor::new(hosts)?.extract(body))
}
