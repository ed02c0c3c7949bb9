//! End-to-end CLI tests for the attachments binary.

#![allow(deprecated)]

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

/// Binary isolated from the user's config file, token and log filter.
fn attachments(config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("attachments").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env_remove("GITHUB_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn write_sources(dir: &Path, sources: &Value) -> std::path::PathBuf {
    let path = dir.join("sources.json");
    std::fs::write(&path, serde_json::to_string(sources).unwrap()).unwrap();
    path
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    attachments(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Download the files attached"))
        .stdout(predicate::str::contains("--sources"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    attachments(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("attachments"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let home = TempDir::new().unwrap();
    attachments(home.path())
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_requires_an_input() {
    let home = TempDir::new().unwrap();
    attachments(home.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_issue_without_repo_is_rejected() {
    let home = TempDir::new().unwrap();
    attachments(home.path())
        .args(["--issue", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--repo"));
}

#[test]
fn test_sources_without_attachments_print_empty_map() {
    let home = TempDir::new().unwrap();
    let sources = write_sources(
        home.path(),
        &json!([{"type": "issue_body", "issue_number": 1, "body": "no links here"}]),
    );

    attachments(home.path())
        .arg("-q")
        .arg("--sources")
        .arg(&sources)
        .arg("--downloads-dir")
        .arg(home.path().join("out"))
        .assert()
        .success()
        .stdout(predicate::str::diff("{}\n"));
}

#[test]
fn test_sources_without_repo_leave_links_unresolved() {
    let home = TempDir::new().unwrap();
    let sources = write_sources(
        home.path(),
        &json!([{
            "type": "issue_comment",
            "comment_id": 9,
            "body": "![x](https://github.com/user-attachments/assets/abc)"
        }]),
    );

    attachments(home.path())
        .arg("--sources")
        .arg(&sources)
        .arg("--downloads-dir")
        .arg(home.path().join("out"))
        .assert()
        .success()
        .stdout(predicate::str::diff("{}\n"))
        .stderr(predicate::str::contains("cannot be resolved"));
}

#[test]
fn test_invalid_sources_file_fails() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("sources.json");
    std::fs::write(&path, "{not json").unwrap();

    attachments(home.path())
        .arg("--sources")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse sources file"));
}

#[test]
fn test_rewrite_echoes_sources_with_rewritten_bodies() {
    let home = TempDir::new().unwrap();
    let sources = write_sources(
        home.path(),
        &json!([{"type": "pr_body", "pull_number": 2, "body": "plain"}]),
    );

    let output = attachments(home.path())
        .args(["-q", "--rewrite", "--sources"])
        .arg(&sources)
        .arg("--downloads-dir")
        .arg(home.path().join("out"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        printed,
        json!([{
            "source": "pr_body#2",
            "type": "pr_body",
            "pull_number": 2,
            "body": "plain",
            "rewritten": "plain"
        }])
    );
}

#[test]
fn test_unknown_allowed_category_is_rejected() {
    let home = TempDir::new().unwrap();
    let sources = write_sources(home.path(), &json!([]));

    attachments(home.path())
        .args(["--allowed-category", "pictures", "--sources"])
        .arg(&sources)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown category 'pictures'"));
}

#[test]
fn test_invalid_config_value_fails() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bad.toml");
    std::fs::write(&config, "max_retries = 0\n").unwrap();
    let sources = write_sources(home.path(), &json!([]));

    attachments(home.path())
        .arg("--config")
        .arg(&config)
        .arg("--sources")
        .arg(&sources)
        .assert()
        .failure();
}

#[test]
fn test_issue_attachment_downloaded_through_api() {
    let Some(server) = tokio_test::block_on(start_mock_server_or_skip()) else {
        return;
    };
    let uri = server.uri();
    let link = format!("{uri}/user-attachments/files/77/notes.md");

    tokio_test::block_on(async {
        Mock::given(method("GET"))
            .and(path("/repos/octo/repo/issues/5"))
            .and(header("accept", "application/vnd.github.html+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"body_html": format!(r#"<a href="{link}">notes.md</a>"#)}),
            ))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/repo/issues/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"number": 5, "body": format!("See [notes.md]({link})")}),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/repo/issues/5/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user-attachments/files/77/notes.md"))
            .respond_with(ResponseTemplate::new(200).set_body_string("# notes"))
            .expect(1)
            .mount(&server)
            .await;
    });

    let home = TempDir::new().unwrap();
    let out_dir = home.path().join("out");
    let output = attachments(home.path())
        .args(["-q", "--repo", "octo/repo", "--issue", "5", "--api-url"])
        .arg(&uri)
        .arg("--server-url")
        .arg(&uri)
        .arg("--downloads-dir")
        .arg(&out_dir)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
    let local = printed[&link].as_str().unwrap();
    assert!(local.starts_with(out_dir.to_str().unwrap()));
    assert!(local.ends_with(".md"));
    assert_eq!(std::fs::read_to_string(local).unwrap(), "# notes");
}
