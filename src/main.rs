//! CLI entry point for the attachments tool.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use attachments_core::attachments::{
    AttachmentHosts, AttachmentOptions, AttachmentPipeline, RenderedBodyError,
    RenderedBodySource, SourceText, substitute_local_paths,
};
use attachments_core::download::constants::{
    DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_RETRY_DELAY, DEFAULT_RETRY_DELAY,
};
use attachments_core::download::{DEFAULT_MAX_RETRIES, HttpClient, RetryPolicy};
use attachments_core::github::{DEFAULT_API_URL, GithubClient, RepoRef};
use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::FileConfig;
use cli::Args;

/// Rendered-body source for runs without a repository: nothing resolves.
struct NoRenderedBodies;

#[async_trait]
impl RenderedBodySource for NoRenderedBodies {
    async fn issue_comment_html(&self, _: u64) -> Result<Option<String>, RenderedBodyError> {
        Ok(None)
    }
    async fn review_comment_html(&self, _: u64) -> Result<Option<String>, RenderedBodyError> {
        Ok(None)
    }
    async fn review_html(&self, _: u64, _: u64) -> Result<Option<String>, RenderedBodyError> {
        Ok(None)
    }
    async fn issue_html(&self, _: u64) -> Result<Option<String>, RenderedBodyError> {
        Ok(None)
    }
    async fn pull_request_html(&self, _: u64) -> Result<Option<String>, RenderedBodyError> {
        Ok(None)
    }
}

#[derive(Debug, Serialize)]
struct RewrittenSource<'a> {
    source: String,
    #[serde(flatten)]
    text: &'a SourceText,
    rewritten: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let loaded = app_config::load_file_config(args.config.as_deref())?;
    let file_config = loaded.config.unwrap_or_default();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => file_config
                .verbosity
                .map_or("info", app_config::VerbositySetting::default_log_level),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(
        repo = ?args.repo,
        issue = ?args.issue,
        pull = ?args.pull,
        sources = ?args.sources,
        config_path = ?loaded.path,
        config_verbosity = file_config.verbosity.map(app_config::VerbositySetting::as_str),
        "CLI arguments parsed"
    );
    info!("Attachments starting");

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling in-flight requests");
            signal_cancel.cancel();
        }
    });

    let http = HttpClient::new()?.with_cancellation(cancel);
    let policy = build_retry_policy(&args, &file_config);
    let options = build_options(&args, &file_config, policy.clone());

    let github = match args.repo.as_deref() {
        Some(repo) => {
            let repo = RepoRef::parse(repo)?;
            let api_url = args
                .api_url
                .clone()
                .or_else(|| file_config.api_url.clone())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string());
            Some(
                GithubClient::new(http.clone(), repo)
                    .with_api_base(api_url)
                    .with_token(args.token.clone())
                    .with_retry_policy(policy),
            )
        }
        None => None,
    };

    let sources = load_sources(&args, github.as_ref()).await?;
    info!(sources = sources.len(), "collected source texts");

    let bodies: &dyn RenderedBodySource = match &github {
        Some(client) => client,
        None => {
            warn!("no --repo given; attachment links cannot be resolved");
            &NoRenderedBodies
        }
    };

    let pipeline = AttachmentPipeline::new(http, options)?;
    let report = pipeline.run(&sources, bodies).await;

    info!(
        downloaded = report.url_map.len(),
        outcomes = report.outcomes.len(),
        cancelled = report.cancelled,
        "Attachment processing finished"
    );

    let output = if args.rewrite {
        let rewritten: Vec<RewrittenSource<'_>> = sources
            .iter()
            .map(|text| RewrittenSource {
                source: text.to_string(),
                text,
                rewritten: substitute_local_paths(text.body(), &report.url_map),
            })
            .collect();
        serde_json::to_string_pretty(&rewritten)?
    } else {
        serde_json::to_string_pretty(&report.url_map)?
    };
    println!("{output}");

    Ok(())
}

fn build_retry_policy(args: &Args, file_config: &FileConfig) -> RetryPolicy {
    let max_attempts = args
        .max_retries
        .or(file_config.max_retries)
        .map_or(DEFAULT_MAX_RETRIES, u32::from);
    let base_delay = args
        .retry_delay_ms
        .or(file_config.retry_delay_ms)
        .map_or(DEFAULT_RETRY_DELAY, Duration::from_millis);
    let attempt_timeout = args
        .timeout_ms
        .or(file_config.timeout_ms)
        .map_or(DEFAULT_ATTEMPT_TIMEOUT, Duration::from_millis);
    RetryPolicy::new(max_attempts, base_delay, DEFAULT_MAX_RETRY_DELAY, attempt_timeout)
}

fn build_options(args: &Args, file_config: &FileConfig, policy: RetryPolicy) -> AttachmentOptions {
    let mut options = AttachmentOptions::default().with_retry_policy(policy);

    if let Some(dir) = args
        .downloads_dir
        .clone()
        .or_else(|| file_config.downloads_dir.clone())
    {
        options = options.with_downloads_dir(dir);
    }
    if let Some(limit) = args.max_file_size.or(file_config.max_file_size_bytes) {
        options = options.with_max_file_size_bytes(limit);
    }
    if !args.allowed_extensions.is_empty() {
        options = options.with_allowed_extensions(args.allowed_extensions.clone());
    } else if let Some(extensions) = file_config.allowed_extensions.clone() {
        options = options.with_allowed_extensions(extensions);
    }
    if !args.allowed_categories.is_empty() {
        options = options.with_allowed_categories(args.allowed_categories.clone());
    } else if let Some(categories) = file_config.allowed_categories.clone() {
        options = options.with_allowed_categories(categories);
    }
    if let Some(server) = args.server_url.as_ref().or(file_config.server_url.as_ref()) {
        options = options.with_hosts(AttachmentHosts::for_server(server.clone()));
    }
    options
}

async fn load_sources(args: &Args, github: Option<&GithubClient>) -> Result<Vec<SourceText>> {
    if let Some(path) = &args.sources {
        return read_sources_file(path);
    }
    let Some(github) = github else {
        bail!("--issue and --pull require --repo");
    };
    if let Some(issue) = args.issue {
        return github
            .collect_issue_sources(issue)
            .await
            .with_context(|| format!("Failed to collect issue #{issue} from {}", github.repo()));
    }
    if let Some(pull) = args.pull {
        return github
            .collect_pull_request_sources(pull)
            .await
            .with_context(|| format!("Failed to collect pull request #{pull} from {}", github.repo()));
    }
    bail!("one of --issue, --pull or --sources is required")
}

fn read_sources_file(path: &Path) -> Result<Vec<SourceText>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sources file '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse sources file '{}'", path.display()))
}
