//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use attachments_core::attachments::FileCategory;
use clap::{ArgGroup, Parser};

/// Download the files attached to a GitHub issue or pull request.
///
/// Attachment links in issue, pull request, review and comment bodies are
/// resolved to their signed download URLs and fetched into a staging
/// directory. The resulting `original URL → local path` map is printed to
/// stdout as JSON.
#[derive(Parser, Debug)]
#[command(name = "attachments")]
#[command(author, version, about)]
#[command(group(ArgGroup::new("input").required(true).args(["issue", "pull", "sources"])))]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Repository as owner/name
    #[arg(long, value_name = "OWNER/NAME")]
    pub repo: Option<String>,

    /// Issue number whose body and comments are processed
    #[arg(long, requires = "repo")]
    pub issue: Option<u64>,

    /// Pull request number whose body, comments and reviews are processed
    #[arg(long, requires = "repo")]
    pub pull: Option<u64>,

    /// JSON file holding an array of source texts (instead of --issue/--pull)
    #[arg(long, value_name = "FILE")]
    pub sources: Option<PathBuf>,

    /// API token (falls back to GITHUB_TOKEN)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// REST API base URL [default: https://api.github.com]
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Web server hosting attachment links [default: https://github.com]
    #[arg(long, value_name = "URL")]
    pub server_url: Option<String>,

    /// Staging directory for downloaded files [default: <temp>/github-attachments]
    #[arg(long, value_name = "DIR")]
    pub downloads_dir: Option<PathBuf>,

    /// Largest accepted attachment in bytes [default: 52428800]
    #[arg(long, value_name = "BYTES", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_file_size: Option<u64>,

    /// Maximum attempts per request, including the first (1-10) [default: 3]
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: Option<u8>,

    /// Base backoff delay between attempts in milliseconds (max 60000) [default: 1000]
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub retry_delay_ms: Option<u64>,

    /// Hard timeout for one attempt in milliseconds (1-600000) [default: 30000]
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..=600_000))]
    pub timeout_ms: Option<u64>,

    /// Only download this extension (repeatable)
    #[arg(long = "allowed-extension", value_name = "EXT")]
    pub allowed_extensions: Vec<String>,

    /// Only download this category, e.g. images or documents (repeatable)
    #[arg(long = "allowed-category", value_name = "CATEGORY", value_parser = parse_category)]
    pub allowed_categories: Vec<FileCategory>,

    /// Print the source texts with attachment URLs replaced by local file names
    #[arg(long)]
    pub rewrite: bool,

    /// Config file path [default: $XDG_CONFIG_HOME/attachments/config.toml]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

fn parse_category(name: &str) -> Result<FileCategory, String> {
    FileCategory::parse(name).ok_or_else(|| {
        format!(
            "unknown category '{name}' (expected images, documents, spreadsheets, \
             presentations, text, code, data, archives or media)"
        )
    })
}
