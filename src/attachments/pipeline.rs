//! End-to-end attachment processing for a batch of source texts.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::AttachmentError;
use super::classify::{FileCategory, classify, is_allowed};
use super::downloader::AttachmentDownloader;
use super::extract::ReferenceExtractor;
use super::matcher::{AttachmentMatcher, OrdinalMatcher};
use super::model::{
    AttachmentUrlMap, ClassifiedAttachment, DownloadedAttachment, MatchedAttachment, SourceText,
};
use super::options::AttachmentOptions;
use super::render::{RenderedBodySource, RenderedLinkResolver};
use crate::download::{DownloadError, FailureType, HttpClient, classify_error};

/// What happened to one attachment URL during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentOutcome {
    /// Not downloaded: the type is unknown or outside the allow-lists.
    RejectedUnsupported {
        /// Derived extension.
        extension: String,
        /// Derived category.
        category: FileCategory,
    },
    /// Not kept: the file exceeds the size limit.
    RejectedTooLarge,
    /// Downloaded to the given path.
    Downloaded(PathBuf),
    /// The download failed; the message describes the last error.
    Failed(String),
    /// The URL was already downloaded earlier in the run.
    SkippedDuplicate,
}

/// Result of [`AttachmentPipeline::run`].
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// `original URL → local path` for every successful download.
    pub url_map: AttachmentUrlMap,
    /// Every successful download, in processing order.
    pub downloaded: Vec<DownloadedAttachment>,
    /// Outcome per original URL, in processing order.
    pub outcomes: Vec<(String, AttachmentOutcome)>,
    /// True when the run stopped early because of cancellation.
    pub cancelled: bool,
}

impl PipelineReport {
    fn record(&mut self, original_url: &str, outcome: AttachmentOutcome) {
        self.outcomes.push((original_url.to_string(), outcome));
    }

    /// Number of outcomes matching `predicate`.
    pub fn count_outcomes(&self, predicate: impl Fn(&AttachmentOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| predicate(outcome))
            .count()
    }
}

/// Discovers, resolves, classifies and downloads attachments of source texts.
///
/// Texts are processed one after another and the attachments of one text in
/// ordinal order. Nothing is shared between runs: each [`run`](Self::run)
/// starts with an empty map.
///
/// # Example
///
/// ```no_run
/// use attachments_core::attachments::{AttachmentOptions, AttachmentPipeline, SourceText};
/// use attachments_core::download::HttpClient;
/// use attachments_core::github::{GithubClient, RepoRef};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let github = GithubClient::new(client.clone(), RepoRef::parse("octo/repo")?);
/// let pipeline = AttachmentPipeline::new(client, AttachmentOptions::default())?;
/// let sources = vec![SourceText::IssueBody { issue_number: 1, body: "...".into() }];
/// let report = pipeline.run(&sources, &github).await;
/// println!("{} attachments downloaded", report.url_map.len());
/// # Ok(())
/// # }
/// ```
pub struct AttachmentPipeline {
    extractor: ReferenceExtractor,
    resolver: RenderedLinkResolver,
    matcher: Box<dyn AttachmentMatcher>,
    client: HttpClient,
    cancel: CancellationToken,
    options: AttachmentOptions,
}

impl AttachmentPipeline {
    /// Creates a pipeline using the [`OrdinalMatcher`].
    ///
    /// Downloads go through `client` and observe its cancellation token.
    ///
    /// # Errors
    ///
    /// Returns [`AttachmentError::Pattern`] if the configured hosts produce an
    /// invalid link pattern.
    pub fn new(client: HttpClient, options: AttachmentOptions) -> Result<Self, AttachmentError> {
        let extractor = ReferenceExtractor::new(&options.hosts)?;
        let resolver = RenderedLinkResolver::new(&options.hosts)?;
        let cancel = client.cancellation_token().clone();
        Ok(Self {
            extractor,
            resolver,
            matcher: Box::new(OrdinalMatcher),
            client,
            cancel,
            options,
        })
    }

    /// Replaces the reference/resolved-URL matcher.
    #[must_use]
    pub fn with_matcher(mut self, matcher: Box<dyn AttachmentMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Processes `sources` and returns the map of downloaded attachments.
    ///
    /// Never fails: per-attachment problems are recorded as outcomes, and a
    /// staging directory that cannot be created or a cancellation ends the
    /// run early with whatever was downloaded so far. Map values are absolute
    /// paths even when the configured staging directory is relative.
    #[instrument(skip_all, fields(sources = sources.len()))]
    pub async fn run(
        &self,
        sources: &[SourceText],
        bodies: &dyn RenderedBodySource,
    ) -> PipelineReport {
        let mut report = PipelineReport::default();

        let staging_dir = match prepare_staging_dir(&self.options.downloads_dir).await {
            Ok(dir) => dir,
            Err(error) => {
                error!(error = %error, "attachment processing aborted");
                return report;
            }
        };
        let downloader = AttachmentDownloader::new(
            self.client.clone(),
            self.options.retry_policy.clone(),
            self.options.max_file_size_bytes,
            staging_dir,
        );

        let mut sequence: u64 = 0;
        for source in sources {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            self.process_source(source, bodies, &downloader, &mut report, &mut sequence)
                .await;
            if report.cancelled {
                break;
            }
        }

        if report.cancelled {
            warn!(
                downloaded = report.url_map.len(),
                "attachment processing cancelled; returning partial results"
            );
        } else {
            info!(
                downloaded = report.url_map.len(),
                outcomes = report.outcomes.len(),
                "attachment processing complete"
            );
        }
        report
    }

    async fn process_source(
        &self,
        source: &SourceText,
        bodies: &dyn RenderedBodySource,
        downloader: &AttachmentDownloader,
        report: &mut PipelineReport,
        sequence: &mut u64,
    ) {
        let references = self.extractor.extract(source.body());
        if references.is_empty() {
            return;
        }
        for reference in &references {
            if report.url_map.contains(&reference.original_url) {
                debug!(url = %reference.original_url, "already downloaded in this run");
                report.record(&reference.original_url, AttachmentOutcome::SkippedDuplicate);
            }
        }

        let Some(resolved) = self.resolver.resolve(source, bodies).await else {
            return;
        };

        let matched = self
            .matcher
            .match_attachments(&references, &resolved, &report.url_map);
        debug!(source = %source, matched = matched.len(), "matched attachments");

        for pair in matched {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                return;
            }
            self.process_attachment(pair, downloader, report, sequence)
                .await;
            if report.cancelled {
                return;
            }
        }
    }

    async fn process_attachment(
        &self,
        pair: MatchedAttachment,
        downloader: &AttachmentDownloader,
        report: &mut PipelineReport,
        sequence: &mut u64,
    ) {
        let original_url = pair.reference.original_url.clone();
        // The same URL can appear twice within one text.
        if report.url_map.contains(&original_url) {
            report.record(&original_url, AttachmentOutcome::SkippedDuplicate);
            return;
        }

        let (extension, category) = classify(&pair.reference, &pair.resolved);
        let allowed = category != FileCategory::Other
            && is_allowed(
                &extension,
                category,
                self.options.allowed_extensions.as_deref(),
                self.options.allowed_categories.as_deref(),
            );
        if !allowed {
            info!(url = %original_url, %extension, %category, "skipping unsupported attachment");
            report.record(
                &original_url,
                AttachmentOutcome::RejectedUnsupported {
                    extension,
                    category,
                },
            );
            return;
        }

        let classified = ClassifiedAttachment {
            matched: pair,
            extension,
            category,
        };
        let result = downloader.download(&classified, *sequence).await;
        *sequence += 1;

        match result {
            Ok(downloaded) => {
                report
                    .url_map
                    .insert_if_absent(original_url.clone(), downloaded.local_path.clone());
                report.record(
                    &original_url,
                    AttachmentOutcome::Downloaded(downloaded.local_path.clone()),
                );
                report.downloaded.push(downloaded);
            }
            Err(error) => self.record_failure(&original_url, &error, report),
        }
    }

    fn record_failure(&self, original_url: &str, error: &DownloadError, report: &mut PipelineReport) {
        if error.is_too_large() {
            warn!(url = %original_url, error = %error, "attachment exceeds size limit");
            report.record(original_url, AttachmentOutcome::RejectedTooLarge);
            return;
        }
        if classify_error(error) == FailureType::Cancelled || self.cancel.is_cancelled() {
            report.cancelled = true;
        }
        warn!(url = %original_url, error = %error, "attachment download failed");
        report.record(original_url, AttachmentOutcome::Failed(error.to_string()));
    }
}

/// Creates the staging directory and returns it as an absolute path.
async fn prepare_staging_dir(dir: &Path) -> Result<PathBuf, AttachmentError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AttachmentError::staging_dir(dir, e))?;
    std::path::absolute(dir).map_err(|e| AttachmentError::staging_dir(dir, e))
}
