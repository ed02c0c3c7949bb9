//! Size-limited download of classified attachments into the staging directory.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use futures_util::StreamExt;
use reqwest::Response;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::filename::build_local_filename;
use super::model::{ClassifiedAttachment, DownloadedAttachment};
use crate::download::{DownloadError, HttpClient, HttpRequest, RetryPolicy};

/// Fetches attachment bytes through the retrying client and writes them to disk.
#[derive(Debug, Clone)]
pub struct AttachmentDownloader {
    client: HttpClient,
    policy: RetryPolicy,
    max_file_size_bytes: u64,
    downloads_dir: PathBuf,
}

impl AttachmentDownloader {
    /// Creates a downloader writing into `downloads_dir`, which must exist.
    #[must_use]
    pub fn new(
        client: HttpClient,
        policy: RetryPolicy,
        max_file_size_bytes: u64,
        downloads_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            policy,
            max_file_size_bytes,
            downloads_dir: downloads_dir.into(),
        }
    }

    /// Downloads one attachment from its resolved URL.
    ///
    /// A declared `content-length` above the limit is rejected before any
    /// file is created; a length exactly at the limit is accepted. The body is
    /// also counted while streaming, and a partial file is removed on any
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::TooLarge`] when the limit is exceeded, or any
    /// transport, HTTP status, retry or IO error from the fetch and write.
    #[instrument(
        skip(self, attachment),
        fields(url = %attachment.original_url(), category = %attachment.category)
    )]
    pub async fn download(
        &self,
        attachment: &ClassifiedAttachment,
        sequence: u64,
    ) -> Result<DownloadedAttachment, DownloadError> {
        let url = attachment.resolved_url();
        let response = self
            .client
            .execute(&HttpRequest::get(url), &self.policy)
            .await?;

        if let Some(declared) = response.content_length()
            && declared > self.max_file_size_bytes
        {
            debug!(declared, limit = self.max_file_size_bytes, "rejecting by content-length");
            return Err(DownloadError::too_large(
                attachment.original_url(),
                self.max_file_size_bytes,
                declared,
            ));
        }

        let filename = build_local_filename(
            attachment.category,
            attachment.original_url(),
            &attachment.extension,
            sequence,
            SystemTime::now(),
        );
        let file_path = self.downloads_dir.join(filename);

        let file = File::create(&file_path)
            .await
            .map_err(|e| DownloadError::io(file_path.clone(), e))?;

        let stream_result = stream_to_file(
            file,
            response,
            attachment.original_url(),
            &file_path,
            self.max_file_size_bytes,
            self.client.cancellation_token(),
        )
        .await;

        let size_bytes = match stream_result {
            Ok(size_bytes) => size_bytes,
            Err(error) => {
                debug!(path = %file_path.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&file_path).await;
                return Err(error);
            }
        };

        info!(path = %file_path.display(), bytes = size_bytes, "attachment downloaded");

        Ok(DownloadedAttachment {
            classified: attachment.clone(),
            local_path: file_path,
            size_bytes,
            downloaded_at: SystemTime::now(),
        })
    }
}

/// Streams a response body to file, enforcing the size limit as bytes arrive.
async fn stream_to_file(
    file: File,
    response: Response,
    url: &str,
    file_path: &Path,
    limit_bytes: u64,
    cancel: &CancellationToken,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(url)),
            next = stream.next() => next,
        };
        let Some(chunk_result) = next else { break };
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        bytes_written += chunk.len() as u64;
        if bytes_written > limit_bytes {
            return Err(DownloadError::too_large(url, limit_bytes, bytes_written));
        }

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}
