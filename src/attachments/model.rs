//! Data types flowing through the attachment pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::classify::FileCategory;

/// One body of user-authored markdown that may contain attachment references.
///
/// The variant decides which rendered-HTML lookup applies to the text, so
/// adding a new shape forces every dispatch site to handle it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceText {
    /// Top-level body of an issue.
    IssueBody {
        /// Issue number.
        issue_number: u64,
        /// Raw markdown.
        body: String,
    },
    /// Top-level body of a pull request.
    #[serde(rename = "pr_body")]
    PullRequestBody {
        /// Pull request number.
        pull_number: u64,
        /// Raw markdown.
        body: String,
    },
    /// Conversation comment on an issue or pull request.
    IssueComment {
        /// Comment id.
        comment_id: u64,
        /// Raw markdown.
        body: String,
    },
    /// Summary body of a pull request review.
    #[serde(rename = "review_body")]
    Review {
        /// Pull request the review belongs to.
        pull_number: u64,
        /// Review id.
        review_id: u64,
        /// Raw markdown.
        body: String,
    },
    /// Inline review comment on a pull request diff.
    ReviewComment {
        /// Review comment id.
        comment_id: u64,
        /// Raw markdown.
        body: String,
    },
}

impl SourceText {
    /// Returns the raw markdown body.
    #[must_use]
    pub fn body(&self) -> &str {
        match self {
            Self::IssueBody { body, .. }
            | Self::PullRequestBody { body, .. }
            | Self::IssueComment { body, .. }
            | Self::Review { body, .. }
            | Self::ReviewComment { body, .. } => body,
        }
    }

    /// Returns the stable variant tag (`issue_body`, `pr_body`, ...).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IssueBody { .. } => "issue_body",
            Self::PullRequestBody { .. } => "pr_body",
            Self::IssueComment { .. } => "issue_comment",
            Self::Review { .. } => "review_body",
            Self::ReviewComment { .. } => "review_comment",
        }
    }

    /// Returns the identifier used to look the text up.
    #[must_use]
    pub fn id(&self) -> u64 {
        match self {
            Self::IssueBody { issue_number, .. } => *issue_number,
            Self::PullRequestBody { pull_number, .. } => *pull_number,
            Self::IssueComment { comment_id, .. } | Self::ReviewComment { comment_id, .. } => {
                *comment_id
            }
            Self::Review { review_id, .. } => *review_id,
        }
    }
}

impl fmt::Display for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind(), self.id())
    }
}

/// A link to an uploaded file as it literally appears in markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentReference {
    /// The URL exactly as written.
    pub original_url: String,
    /// Position among references found in the same text.
    pub ordinal: usize,
}

/// An authenticated, time-limited URL found in the rendered HTML of a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    /// The URL that actually serves the bytes.
    pub url: String,
    /// Position among deduplicated resolved URLs of the same text.
    pub ordinal: usize,
    /// True when the URL lives on a dedicated image-serving host.
    pub is_image_shaped: bool,
}

/// A reference paired with the resolved URL of equal ordinal in the same text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedAttachment {
    /// The markdown reference.
    pub reference: AttachmentReference,
    /// Its resolved counterpart.
    pub resolved: ResolvedUrl,
}

/// A matched attachment with its derived file type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedAttachment {
    /// The matched pair.
    pub matched: MatchedAttachment,
    /// Lowercased extension including the leading dot (e.g. `.png`).
    pub extension: String,
    /// Coarse file-type bucket.
    pub category: FileCategory,
}

impl ClassifiedAttachment {
    /// The original (unauthenticated) URL used as map key.
    #[must_use]
    pub fn original_url(&self) -> &str {
        &self.matched.reference.original_url
    }

    /// The authenticated URL the bytes are fetched from.
    #[must_use]
    pub fn resolved_url(&self) -> &str {
        &self.matched.resolved.url
    }
}

/// A classified attachment that now exists on local disk.
#[derive(Debug, Clone)]
pub struct DownloadedAttachment {
    /// The attachment that was downloaded.
    pub classified: ClassifiedAttachment,
    /// Where the bytes were written.
    pub local_path: PathBuf,
    /// Number of bytes written.
    pub size_bytes: u64,
    /// When the download finished.
    pub downloaded_at: SystemTime,
}

/// Mapping from original attachment URL to the local file holding its bytes.
///
/// Keys are unique: the first successful download of a URL wins and later
/// insertions for the same URL are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentUrlMap {
    entries: BTreeMap<String, PathBuf>,
}

impl AttachmentUrlMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `original_url → local_path` unless the URL is already present.
    ///
    /// Returns `true` when the entry was inserted.
    pub fn insert_if_absent(&mut self, original_url: impl Into<String>, local_path: PathBuf) -> bool {
        match self.entries.entry(original_url.into()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(local_path);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Returns true when the original URL already has a local file.
    #[must_use]
    pub fn contains(&self, original_url: &str) -> bool {
        self.entries.contains_key(original_url)
    }

    /// Returns the local path for an original URL.
    #[must_use]
    pub fn get(&self, original_url: &str) -> Option<&Path> {
        self.entries.get(original_url).map(PathBuf::as_path)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no attachment was downloaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries ordered by original URL.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(url, path)| (url.as_str(), path.as_path()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_source_text_serde_tags() {
        let json = r#"[
            {"type": "issue_body", "issue_number": 1, "body": "a"},
            {"type": "pr_body", "pull_number": 2, "body": "b"},
            {"type": "issue_comment", "comment_id": 3, "body": "c"},
            {"type": "review_body", "pull_number": 2, "review_id": 4, "body": "d"},
            {"type": "review_comment", "comment_id": 5, "body": "e"}
        ]"#;
        let sources: Vec<SourceText> = serde_json::from_str(json).unwrap();
        let kinds: Vec<_> = sources.iter().map(SourceText::kind).collect();
        assert_eq!(
            kinds,
            ["issue_body", "pr_body", "issue_comment", "review_body", "review_comment"]
        );
        assert_eq!(sources[3].id(), 4);
        assert_eq!(sources[4].body(), "e");
    }

    #[test]
    fn test_source_text_display() {
        let source = SourceText::IssueComment {
            comment_id: 42,
            body: String::new(),
        };
        assert_eq!(source.to_string(), "issue_comment#42");
    }

    #[test]
    fn test_url_map_first_writer_wins() {
        let mut map = AttachmentUrlMap::new();
        assert!(map.insert_if_absent("https://x/a", PathBuf::from("/tmp/first.png")));
        assert!(!map.insert_if_absent("https://x/a", PathBuf::from("/tmp/second.png")));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("https://x/a"), Some(Path::new("/tmp/first.png")));
        assert!(map.contains("https://x/a"));
        assert!(!map.contains("https://x/b"));
    }

    #[test]
    fn test_url_map_serializes_as_object() {
        let mut map = AttachmentUrlMap::new();
        map.insert_if_absent("https://x/a", PathBuf::from("/tmp/a.png"));
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, serde_json::json!({"https://x/a": "/tmp/a.png"}));
    }
}
