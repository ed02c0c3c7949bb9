//! Pairing of markdown references with resolved URLs.

use tracing::debug;

use super::model::{AttachmentReference, AttachmentUrlMap, MatchedAttachment, ResolvedUrl};

/// Pairs the references of one source text with its resolved URLs.
///
/// Implementations only ever see the two lists of a single text; ordinals of
/// different texts are never compared.
pub trait AttachmentMatcher: Send + Sync {
    /// Returns the pairs to download, skipping URLs already in `url_map`.
    fn match_attachments(
        &self,
        references: &[AttachmentReference],
        resolved: &[ResolvedUrl],
        url_map: &AttachmentUrlMap,
    ) -> Vec<MatchedAttachment>;
}

/// Pairs the i-th reference with the i-th resolved URL.
///
/// This assumes the rendered HTML lists attachments in the same order as the
/// markdown, which holds for the platform's renderer today. Trailing entries
/// on the longer side are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrdinalMatcher;

impl AttachmentMatcher for OrdinalMatcher {
    fn match_attachments(
        &self,
        references: &[AttachmentReference],
        resolved: &[ResolvedUrl],
        url_map: &AttachmentUrlMap,
    ) -> Vec<MatchedAttachment> {
        if references.len() != resolved.len() {
            debug!(
                references = references.len(),
                resolved = resolved.len(),
                "reference and resolved counts differ; trailing entries dropped"
            );
        }

        pair_by_position(references, resolved)
            .into_iter()
            .filter(|pair| !url_map.contains(&pair.reference.original_url))
            .collect()
    }
}

/// Zips both lists up to the shorter length, in ascending ordinal order.
#[must_use]
pub fn pair_by_position(
    references: &[AttachmentReference],
    resolved: &[ResolvedUrl],
) -> Vec<MatchedAttachment> {
    references
        .iter()
        .zip(resolved)
        .map(|(reference, resolved)| MatchedAttachment {
            reference: reference.clone(),
            resolved: resolved.clone(),
        })
        .collect()
}
