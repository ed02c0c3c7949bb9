//! Retrying HTTP client.
//!
//! This module provides the `HttpClient` struct which executes requests with
//! bounded retries, exponential backoff and a hard per-attempt timeout, in a
//! buffered flavour ([`HttpClient::execute`]) and an incrementally streamed
//! text flavour ([`HttpClient::execute_streaming_text`]).

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, Response};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, UNREADABLE_BODY_PLACEHOLDER};
use super::error::DownloadError;
use super::retry::{RetryPolicy, run_with_retry};
use crate::user_agent;

/// A GET request description that can be replayed on every attempt.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    url: String,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl HttpRequest {
    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Adds a header to every attempt of this request.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }
}

/// HTTP client with retry, backoff, and per-attempt timeouts.
///
/// This client is designed to be created once and reused for every request of
/// a run, taking advantage of connection pooling. Every request observes the
/// client's cancellation token, so one `cancel()` stops all in-flight work.
///
/// # Example
///
/// ```no_run
/// use attachments_core::download::{HttpClient, HttpRequest, RetryPolicy};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let text = client
///     .execute_streaming_text(&HttpRequest::get("https://example.com/"), &RetryPolicy::default())
///     .await?;
/// println!("{} bytes of text", text.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    cancel: CancellationToken,
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes (for large files)
    /// - Gzip decompression: enabled
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the reqwest client cannot be built.
    pub fn new() -> Result<Self, DownloadError> {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the reqwest client cannot be built.
    pub fn new_with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|source| DownloadError::ClientBuild { source })?;
        Ok(Self {
            client,
            cancel: CancellationToken::new(),
        })
    }

    /// Replaces the cancellation token observed by every request.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the cancellation token shared by all requests of this client.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Executes a request and returns the successful (2xx) response.
    ///
    /// The response body is left unread so callers can stream it.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is invalid
    /// - The server answers with a non-2xx status (the error carries the body)
    /// - Every attempt failed transiently ([`DownloadError::RetriesExhausted`])
    /// - The client was cancelled
    #[instrument(skip(self, request, policy), fields(url = %request.url))]
    pub async fn execute(
        &self,
        request: &HttpRequest,
        policy: &RetryPolicy,
    ) -> Result<Response, DownloadError> {
        validate_url(&request.url)?;
        run_with_retry(&request.url, policy, &self.cancel, move |attempt| {
            debug!(attempt, "sending request");
            self.send_once(request)
        })
        .await
    }

    /// Executes a request and returns its body as text, read incrementally.
    ///
    /// Chunks are decoded as UTF-8 as they arrive; a multi-byte character
    /// split across chunks is reassembled and invalid bytes become U+FFFD.
    /// The retry and timeout contract applies to the whole streaming attempt.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute), plus network errors raised while
    /// the body is streaming.
    #[instrument(skip(self, request, policy), fields(url = %request.url))]
    pub async fn execute_streaming_text(
        &self,
        request: &HttpRequest,
        policy: &RetryPolicy,
    ) -> Result<String, DownloadError> {
        validate_url(&request.url)?;
        run_with_retry(&request.url, policy, &self.cancel, move |attempt| async move {
            debug!(attempt, "sending streaming request");
            let response = self.send_once(request).await?;
            read_text_stream(response, &request.url).await
        })
        .await
    }

    /// Sends one attempt, turning non-2xx responses into errors.
    async fn send_once(&self, request: &HttpRequest) -> Result<Response, DownloadError> {
        let mut builder = self.client.get(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.clone(), value.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(request.url.as_str())
            } else {
                DownloadError::network(request.url.as_str(), e)
            }
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("").to_string();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| UNREADABLE_BODY_PLACEHOLDER.to_string());
        Err(DownloadError::http_status_with_body(
            request.url.as_str(),
            status.as_u16(),
            status_text,
            body,
        ))
    }
}

fn validate_url(url: &str) -> Result<(), DownloadError> {
    let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(DownloadError::invalid_url(url)),
    }
}

/// Streams a response body into a `String`, decoding chunk by chunk.
async fn read_text_stream(response: Response, url: &str) -> Result<String, DownloadError> {
    let mut stream = response.bytes_stream();
    let mut decoder = Utf8ChunkDecoder::default();
    let mut text = String::new();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;
        decoder.push(&chunk, &mut text);
    }
    decoder.finish(&mut text);

    Ok(text)
}

/// Incremental UTF-8 decoder that carries incomplete trailing sequences over.
#[derive(Debug, Default)]
struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    fn push(&mut self, chunk: &[u8], out: &mut String) {
        self.pending.extend_from_slice(chunk);
        let mut consumed = 0;
        loop {
            match std::str::from_utf8(&self.pending[consumed..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    consumed = self.pending.len();
                    break;
                }
                Err(error) => {
                    let valid_end = consumed + error.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[consumed..valid_end]));
                    match error.error_len() {
                        Some(invalid_len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            consumed = valid_end + invalid_len;
                        }
                        None => {
                            // Incomplete sequence at the end; wait for the next chunk.
                            consumed = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..consumed);
    }

    fn finish(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            out.push_str(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
    }
}
