//! Pipeline configuration.

use std::path::PathBuf;

use super::classify::FileCategory;
use super::hosts::AttachmentHosts;
use crate::download::RetryPolicy;
use crate::download::constants::DEFAULT_MAX_FILE_SIZE_BYTES;

/// Name of the staging directory created under the system temp dir.
pub const DEFAULT_DOWNLOADS_SUBDIR: &str = "github-attachments";

/// Settings for one [`super::AttachmentPipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentOptions {
    /// Staging directory for downloaded files.
    pub downloads_dir: PathBuf,
    /// Largest accepted file in bytes.
    pub max_file_size_bytes: u64,
    /// When set, only these extensions are downloaded.
    pub allowed_extensions: Option<Vec<String>>,
    /// When set, only these categories are downloaded.
    pub allowed_categories: Option<Vec<FileCategory>>,
    /// Retry policy for each download.
    pub retry_policy: RetryPolicy,
    /// Host prefixes recognized as attachment links.
    pub hosts: AttachmentHosts,
}

impl Default for AttachmentOptions {
    fn default() -> Self {
        Self {
            downloads_dir: std::env::temp_dir().join(DEFAULT_DOWNLOADS_SUBDIR),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            allowed_extensions: None,
            allowed_categories: None,
            retry_policy: RetryPolicy::default(),
            hosts: AttachmentHosts::default(),
        }
    }
}

impl AttachmentOptions {
    #[must_use]
    pub fn with_downloads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.downloads_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.max_file_size_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_allowed_extensions(mut self, extensions: Vec<String>) -> Self {
        self.allowed_extensions = Some(extensions);
        self
    }

    #[must_use]
    pub fn with_allowed_categories(mut self, categories: Vec<FileCategory>) -> Self {
        self.allowed_categories = Some(categories);
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    #[must_use]
    pub fn with_hosts(mut self, hosts: AttachmentHosts) -> Self {
        self.hosts = hosts;
        self
    }
}
