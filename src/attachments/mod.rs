//! Attachment discovery, resolution and download.
//!
//! Users upload files into issues and pull requests as markdown links such
//! as `![shot](https://github.com/user-attachments/assets/<id>)`. Those links
//! are not directly downloadable by an API client; the signed, time-limited
//! URL only appears in the HTML rendering of the same text. This module
//! pairs the two and fetches the bytes into a staging directory.
//!
//! # Architecture
//!
//! - [`ReferenceExtractor`] - finds attachment links in raw markdown
//! - [`RenderedLinkResolver`] - finds signed URLs in rendered HTML via a [`RenderedBodySource`]
//! - [`AttachmentMatcher`] - pairs both lists ([`OrdinalMatcher`] pairs by position)
//! - [`classify()`] - derives extension and [`FileCategory`]; `other` is never fetched
//! - [`AttachmentDownloader`] - size-limited download through the retrying client
//! - [`AttachmentPipeline`] - runs all of the above and builds an [`AttachmentUrlMap`]
//! - [`substitute_local_paths`] - rewrites text to point at downloaded files

mod classify;
mod downloader;
mod error;
mod extract;
mod filename;
mod hosts;
mod matcher;
mod model;
mod options;
mod pipeline;
mod render;
mod rewrite;

pub use classify::{
    DEFAULT_IMAGE_EXTENSION, FileCategory, IGNORE_EXTENSION, classify, is_allowed,
};
pub use downloader::AttachmentDownloader;
pub use error::{AttachmentError, RenderedBodyError};
pub use extract::{ReferenceExtractor, extract_references};
pub use filename::{build_local_filename, url_hash_prefix};
pub use hosts::{
    AttachmentHosts, DEFAULT_LEGACY_IMAGE_HOST, DEFAULT_PRIVATE_IMAGE_HOST, DEFAULT_SERVER_URL,
};
pub use matcher::{AttachmentMatcher, OrdinalMatcher, pair_by_position};
pub use model::{
    AttachmentReference, AttachmentUrlMap, ClassifiedAttachment, DownloadedAttachment,
    MatchedAttachment, ResolvedUrl, SourceText,
};
pub use options::{AttachmentOptions, DEFAULT_DOWNLOADS_SUBDIR};
pub use pipeline::{AttachmentOutcome, AttachmentPipeline, PipelineReport};
pub use render::{RenderedBodySource, RenderedLinkResolver};
pub use rewrite::substitute_local_paths;
