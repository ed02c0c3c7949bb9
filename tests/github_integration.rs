//! Integration tests for the GitHub REST collaborator feeding the pipeline.

use std::time::Duration;

use attachments_core::attachments::{
    AttachmentHosts, AttachmentOptions, AttachmentPipeline, RenderedBodySource, SourceText,
    substitute_local_paths,
};
use attachments_core::download::{HttpClient, RetryPolicy};
use attachments_core::github::{GithubClient, RepoRef};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

fn policy() -> RetryPolicy {
    RetryPolicy::new(
        2,
        Duration::from_millis(5),
        Duration::from_millis(20),
        Duration::from_secs(5),
    )
}

fn github(server: &MockServer, http: HttpClient) -> GithubClient {
    GithubClient::new(http, RepoRef::parse("octo/repo").unwrap())
        .with_api_base(server.uri())
        .with_retry_policy(policy())
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_pull_request_sources_cover_all_text_kinds() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_json(&server, "/repos/octo/repo/pulls/4", json!({"number": 4, "body": "pr text"})).await;
    mount_json(
        &server,
        "/repos/octo/repo/issues/4/comments",
        json!([{"id": 40, "body": "conversation"}]),
    )
    .await;
    mount_json(
        &server,
        "/repos/octo/repo/pulls/4/reviews",
        json!([{"id": 41, "body": "review summary"}, {"id": 42, "body": ""}]),
    )
    .await;
    mount_json(
        &server,
        "/repos/octo/repo/pulls/4/comments",
        json!([{"id": 43, "body": "inline note"}]),
    )
    .await;

    let sources = github(&server, HttpClient::new().unwrap())
        .collect_pull_request_sources(4)
        .await
        .unwrap();

    let kinds: Vec<String> = sources.iter().map(ToString::to_string).collect();
    assert_eq!(
        kinds,
        ["pr_body#4", "issue_comment#40", "review_body#41", "review_comment#43"]
    );
}

#[tokio::test]
async fn test_rendered_lookups_use_html_media_type() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/pulls/comments/8"))
        .and(header("accept", "application/vnd.github.html+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"body_html": "<p>x</p>"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/pulls/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"number": 3})))
        .mount(&server)
        .await;

    let client = github(&server, HttpClient::new().unwrap());
    assert_eq!(
        client.review_comment_html(8).await.unwrap().as_deref(),
        Some("<p>x</p>")
    );
    assert_eq!(client.pull_request_html(3).await.unwrap(), None);
}

#[tokio::test]
async fn test_issue_end_to_end_download_and_rewrite() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let uri = server.uri();
    let original = format!("{uri}/user-attachments/assets/0d1e");
    let file_link = format!("{uri}/user-attachments/files/5/trace.txt");
    let issue_body = format!("Crash on start\n\n![screen]({original})");
    let comment_body = format!("Full trace: [trace.txt]({file_link})");

    mount_json(
        &server,
        "/repos/octo/repo/issues/12",
        json!({"number": 12, "body": issue_body}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/issues/12/comments"))
        .and(query_param("per_page", "100"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": 120, "body": comment_body}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/issues/12"))
        .and(header("accept", "application/vnd.github.html+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "body_html": format!(
                r#"<p>Crash on start</p><p><a href="{uri}/private-user-images/9/1-0d1e.png?jwt=abc"><img src="{uri}/private-user-images/9/1-0d1e.png?jwt=abc"></a></p>"#
            )
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_json(
        &server,
        "/repos/octo/repo/issues/comments/120",
        json!({"body_html": format!(r#"<p>Full trace: <a href="{file_link}">trace.txt</a></p>"#)}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/private-user-images/9/1-0d1e.png"))
        .and(query_param("jwt", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user-attachments/files/5/trace.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("at main.rs:1"))
        .expect(1)
        .mount(&server)
        .await;

    let http = HttpClient::new().unwrap();
    let client = github(&server, http.clone());
    let sources = client.collect_issue_sources(12).await.unwrap();
    assert_eq!(sources.len(), 2);

    let dir = TempDir::new().unwrap();
    let options = AttachmentOptions::default()
        .with_downloads_dir(dir.path())
        .with_retry_policy(policy())
        .with_hosts(AttachmentHosts::new(
            uri.clone(),
            format!("{uri}/private-user-images"),
            format!("{uri}/user-images"),
        ));
    let pipeline = AttachmentPipeline::new(http, options).unwrap();
    let report = pipeline.run(&sources, &client).await;

    assert_eq!(report.url_map.len(), 2);
    let image = report.url_map.get(&original).unwrap();
    assert!(image.extension().is_some_and(|ext| ext == "png"));
    let trace = report.url_map.get(&file_link).unwrap();
    assert_eq!(std::fs::read_to_string(trace).unwrap(), "at main.rs:1");

    let SourceText::IssueBody { body, .. } = &sources[0] else {
        panic!("first source should be the issue body");
    };
    let rewritten = substitute_local_paths(body, &report.url_map);
    let image_name = image.file_name().unwrap().to_str().unwrap();
    assert!(rewritten.contains(&format!("![screen]({image_name})")), "got: {rewritten}");
    assert!(!rewritten.contains("user-attachments"));
}
