//! GitHub REST client for rendered bodies and source-text collection.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderName, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::error::GithubError;
use super::repo::RepoRef;
use crate::attachments::{RenderedBodyError, RenderedBodySource, SourceText};
use crate::download::{HttpClient, HttpRequest, RetryPolicy};

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Media type that makes the API return `body_html`.
const HTML_MEDIA_TYPE: &str = "application/vnd.github.html+json";

/// Media type for raw markdown bodies.
const RAW_MEDIA_TYPE: &str = "application/vnd.github+json";

const API_VERSION: &str = "2022-11-28";

/// Page size used for list endpoints (the API maximum).
pub const PAGE_SIZE: usize = 100;

/// Upper bound on pages fetched from one list endpoint.
const MAX_PAGES: u32 = 100;

// ==================== GitHub API Response Types ====================

#[derive(Debug, Deserialize)]
struct RenderedBody {
    #[serde(default)]
    body_html: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NumberedBody {
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentifiedBody {
    id: u64,
    #[serde(default)]
    body: Option<String>,
}

/// Accessor for one repository on GitHub or a GitHub Enterprise server.
///
/// All requests go through the shared retrying [`HttpClient`], so they obey
/// its cancellation token.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: HttpClient,
    repo: RepoRef,
    api_base: String,
    token: Option<String>,
    policy: RetryPolicy,
}

impl GithubClient {
    /// Creates an unauthenticated client for `repo` against [`DEFAULT_API_URL`].
    #[must_use]
    pub fn new(http: HttpClient, repo: RepoRef) -> Self {
        Self {
            http,
            repo,
            api_base: DEFAULT_API_URL.to_string(),
            token: None,
            policy: RetryPolicy::default(),
        }
    }

    /// Sets the REST API base URL (e.g. `https://ghe.example.com/api/v3`).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        let mut api_base = api_base.into();
        while api_base.ends_with('/') {
            api_base.pop();
        }
        self.api_base = api_base;
        self
    }

    /// Sets the bearer token; an empty token is treated as none.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Sets the retry policy used for API calls.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the repository this client targets.
    #[must_use]
    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{path}",
            self.api_base,
            self.repo.owner(),
            self.repo.name()
        )
    }

    fn request(&self, url: &str, media_type: &'static str) -> Result<HttpRequest, GithubError> {
        let mut request = HttpRequest::get(url)
            .header(ACCEPT, HeaderValue::from_static(media_type))
            .header(
                HeaderName::from_static("x-github-api-version"),
                HeaderValue::from_static(API_VERSION),
            );
        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|_| GithubError::InvalidToken)?;
            value.set_sensitive(true);
            request = request.header(AUTHORIZATION, value);
        }
        Ok(request)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        media_type: &'static str,
    ) -> Result<T, GithubError> {
        let request = self.request(url, media_type)?;
        let text = self
            .http
            .execute_streaming_text(&request, &self.policy)
            .await
            .map_err(GithubError::http)?;
        serde_json::from_str(&text).map_err(|e| GithubError::decode(url, e))
    }

    async fn rendered(&self, path: &str) -> Result<Option<String>, GithubError> {
        let url = self.repo_url(path);
        let body: RenderedBody = self.get_json(&url, HTML_MEDIA_TYPE).await?;
        Ok(body.body_html.filter(|html| !html.is_empty()))
    }

    /// Fetches every page of a list endpoint.
    async fn list_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, GithubError> {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let url = format!("{}?per_page={PAGE_SIZE}&page={page}", self.repo_url(path));
            let batch: Vec<T> = self.get_json(&url, RAW_MEDIA_TYPE).await?;
            let len = batch.len();
            items.extend(batch);
            if len < PAGE_SIZE {
                break;
            }
        }
        Ok(items)
    }

    /// Collects the body and conversation comments of an issue.
    ///
    /// Empty bodies are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`GithubError`] if any API call or decode fails.
    #[instrument(skip(self), fields(repo = %self.repo))]
    pub async fn collect_issue_sources(
        &self,
        issue_number: u64,
    ) -> Result<Vec<SourceText>, GithubError> {
        let mut sources = Vec::new();

        let issue: NumberedBody = self
            .get_json(&self.repo_url(&format!("issues/{issue_number}")), RAW_MEDIA_TYPE)
            .await?;
        if let Some(body) = non_empty(issue.body) {
            sources.push(SourceText::IssueBody { issue_number, body });
        }
        self.push_issue_comments(issue_number, &mut sources).await?;

        debug!(count = sources.len(), "collected issue source texts");
        Ok(sources)
    }

    /// Collects the body, conversation comments, reviews and review comments
    /// of a pull request.
    ///
    /// Empty bodies are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`GithubError`] if any API call or decode fails.
    #[instrument(skip(self), fields(repo = %self.repo))]
    pub async fn collect_pull_request_sources(
        &self,
        pull_number: u64,
    ) -> Result<Vec<SourceText>, GithubError> {
        let mut sources = Vec::new();

        let pull: NumberedBody = self
            .get_json(&self.repo_url(&format!("pulls/{pull_number}")), RAW_MEDIA_TYPE)
            .await?;
        if let Some(body) = non_empty(pull.body) {
            sources.push(SourceText::PullRequestBody { pull_number, body });
        }
        self.push_issue_comments(pull_number, &mut sources).await?;

        let reviews: Vec<IdentifiedBody> =
            self.list_all(&format!("pulls/{pull_number}/reviews")).await?;
        sources.extend(reviews.into_iter().filter_map(|review| {
            non_empty(review.body).map(|body| SourceText::Review {
                pull_number,
                review_id: review.id,
                body,
            })
        }));

        let review_comments: Vec<IdentifiedBody> =
            self.list_all(&format!("pulls/{pull_number}/comments")).await?;
        sources.extend(review_comments.into_iter().filter_map(|comment| {
            non_empty(comment.body).map(|body| SourceText::ReviewComment {
                comment_id: comment.id,
                body,
            })
        }));

        debug!(count = sources.len(), "collected pull request source texts");
        Ok(sources)
    }

    async fn push_issue_comments(
        &self,
        number: u64,
        sources: &mut Vec<SourceText>,
    ) -> Result<(), GithubError> {
        let comments: Vec<IdentifiedBody> =
            self.list_all(&format!("issues/{number}/comments")).await?;
        sources.extend(comments.into_iter().filter_map(|comment| {
            non_empty(comment.body).map(|body| SourceText::IssueComment {
                comment_id: comment.id,
                body,
            })
        }));
        Ok(())
    }
}

fn non_empty(body: Option<String>) -> Option<String> {
    body.filter(|b| !b.trim().is_empty())
}

fn lookup_error(target: String) -> impl FnOnce(GithubError) -> RenderedBodyError {
    move |error| RenderedBodyError::new(target, error)
}

#[async_trait]
impl RenderedBodySource for GithubClient {
    async fn issue_comment_html(
        &self,
        comment_id: u64,
    ) -> Result<Option<String>, RenderedBodyError> {
        self.rendered(&format!("issues/comments/{comment_id}"))
            .await
            .map_err(lookup_error(format!("issue_comment#{comment_id}")))
    }

    async fn review_comment_html(
        &self,
        comment_id: u64,
    ) -> Result<Option<String>, RenderedBodyError> {
        self.rendered(&format!("pulls/comments/{comment_id}"))
            .await
            .map_err(lookup_error(format!("review_comment#{comment_id}")))
    }

    async fn review_html(
        &self,
        pull_number: u64,
        review_id: u64,
    ) -> Result<Option<String>, RenderedBodyError> {
        self.rendered(&format!("pulls/{pull_number}/reviews/{review_id}"))
            .await
            .map_err(lookup_error(format!("review_body#{review_id}")))
    }

    async fn issue_html(&self, issue_number: u64) -> Result<Option<String>, RenderedBodyError> {
        self.rendered(&format!("issues/{issue_number}"))
            .await
            .map_err(lookup_error(format!("issue_body#{issue_number}")))
    }

    async fn pull_request_html(
        &self,
        pull_number: u64,
    ) -> Result<Option<String>, RenderedBodyError> {
        self.rendered(&format!("pulls/{pull_number}"))
            .await
            .map_err(lookup_error(format!("pr_body#{pull_number}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;

    fn client(api_base: &str) -> GithubClient {
        GithubClient::new(HttpClient::new().unwrap(), RepoRef::parse("octo/repo").unwrap())
            .with_api_base(api_base)
            .with_token(Some("secret".to_string()))
            .with_retry_policy(RetryPolicy::with_max_attempts(1).with_base_delay(Duration::ZERO))
    }

    #[tokio::test]
    async fn test_issue_comment_html_sends_headers_and_reads_body_html() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/repos/octo/repo/issues/comments/42"))
            .and(header("accept", HTML_MEDIA_TYPE))
            .and(header("authorization", "Bearer secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": 42, "body_html": "<p>hi</p>"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let html = client(&mock_server.uri()).issue_comment_html(42).await.unwrap();
        assert_eq!(html.as_deref(), Some("<p>hi</p>"));
    }

    #[tokio::test]
    async fn test_null_body_html_is_none() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/repos/octo/repo/pulls/7/reviews/9"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"body_html": null})),
            )
            .mount(&mock_server)
            .await;

        let html = client(&mock_server.uri()).review_html(7, 9).await.unwrap();
        assert_eq!(html, None);
    }

    #[tokio::test]
    async fn test_lookup_error_names_target() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&mock_server)
            .await;

        let error = client(&mock_server.uri()).issue_html(5).await.unwrap_err();
        assert_eq!(error.target, "issue_body#5");
    }

    #[tokio::test]
    async fn test_collect_issue_sources_skips_empty_bodies() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/repos/octo/repo/issues/3"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"number": 3, "body": "issue text"})),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/repo/issues/3/comments"))
            .and(query_param("per_page", "100"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 10, "body": "first"},
                {"id": 11, "body": ""},
                {"id": 12, "body": null}
            ])))
            .mount(&mock_server)
            .await;

        let sources = client(&mock_server.uri())
            .collect_issue_sources(3)
            .await
            .unwrap();
        assert_eq!(
            sources,
            vec![
                SourceText::IssueBody {
                    issue_number: 3,
                    body: "issue text".to_string()
                },
                SourceText::IssueComment {
                    comment_id: 10,
                    body: "first".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_list_all_follows_full_pages() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let full_page: Vec<_> = (0..PAGE_SIZE as u64)
            .map(|id| serde_json::json!({"id": id, "body": "x"}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/repos/octo/repo/issues/1/comments"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(full_page))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/repo/issues/1/comments"))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"id": 1000, "body": "last"}])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let items: Vec<IdentifiedBody> = client(&mock_server.uri())
            .list_all("issues/1/comments")
            .await
            .unwrap();
        assert_eq!(items.len(), PAGE_SIZE + 1);
        assert_eq!(items.last().unwrap().id, 1000);
    }

    #[tokio::test]
    async fn test_decode_error_on_unexpected_json() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let error = client(&mock_server.uri())
            .collect_issue_sources(1)
            .await
            .unwrap_err();
        assert!(matches!(error, GithubError::Decode { .. }), "got: {error:?}");
    }
}
