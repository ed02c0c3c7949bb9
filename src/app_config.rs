//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use attachments_core::attachments::FileCategory;

/// File configuration for attachment fetching defaults.
///
/// The file is a flat `key = value` subset of TOML.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileConfig {
    /// Staging directory for downloaded attachments.
    pub downloads_dir: Option<PathBuf>,
    /// Largest accepted attachment in bytes.
    pub max_file_size_bytes: Option<u64>,
    /// Maximum attempts per request, including the first.
    pub max_retries: Option<u8>,
    /// Base backoff delay in milliseconds.
    pub retry_delay_ms: Option<u64>,
    /// Hard per-attempt timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Extensions allowed for download.
    pub allowed_extensions: Option<Vec<String>>,
    /// Categories allowed for download.
    pub allowed_categories: Option<Vec<FileCategory>>,
    /// REST API base URL.
    pub api_url: Option<String>,
    /// Web server URL that hosts attachment links.
    pub server_url: Option<String>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(size) = self.max_file_size_bytes
            && size == 0
        {
            bail!("Invalid config value for `max_file_size_bytes`: 0. Expected a positive size");
        }
        if let Some(retries) = self.max_retries
            && !(1..=10).contains(&retries)
        {
            bail!("Invalid config value for `max_retries`: {retries}. Expected range: 1..=10");
        }
        if let Some(delay) = self.retry_delay_ms
            && delay > 60_000
        {
            bail!("Invalid config value for `retry_delay_ms`: {delay}. Expected range: 0..=60000");
        }
        if let Some(timeout) = self.timeout_ms
            && !(1..=600_000).contains(&timeout)
        {
            bail!("Invalid config value for `timeout_ms`: {timeout}. Expected range: 1..=600000");
        }
        validate_http_url("api_url", self.api_url.as_deref())?;
        validate_http_url("server_url", self.server_url.as_deref())?;
        Ok(())
    }
}

fn validate_http_url(field: &str, value: Option<&str>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    let parsed = url::Url::parse(value)
        .with_context(|| format!("Invalid config value for `{field}`: '{value}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("Invalid config value for `{field}`: '{value}'. Expected an http(s) URL");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Returns the stable string label for display output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Verbose => "verbose",
            Self::Quiet => "quiet",
            Self::Debug => "debug",
        }
    }

    /// Log level used when neither `RUST_LOG` nor CLI flags choose one.
    #[must_use]
    pub fn default_log_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/attachments/config.toml`
/// 2. `$HOME/.config/attachments/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("attachments")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("attachments")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from an explicit path, or the default path if present.
///
/// An explicit path must exist; a missing default file is not an error.
pub fn load_file_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = read_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(read_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let line_number = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_number}");

        match key {
            "downloads_dir" => {
                cfg.downloads_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "max_file_size_bytes" => {
                cfg.max_file_size_bytes = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "max_retries" => {
                cfg.max_retries = Some(parse_integer_u8(value).with_context(invalid)?);
            }
            "retry_delay_ms" => {
                cfg.retry_delay_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "timeout_ms" => {
                cfg.timeout_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "allowed_extensions" => {
                cfg.allowed_extensions = Some(parse_string_array(value).with_context(invalid)?);
            }
            "allowed_categories" => {
                let names = parse_string_array(value).with_context(invalid)?;
                let categories = names
                    .iter()
                    .map(|name| {
                        FileCategory::parse(name)
                            .with_context(|| format!("Unknown category '{name}'"))
                    })
                    .collect::<Result<Vec<_>>>()
                    .with_context(invalid)?;
                cfg.allowed_categories = Some(categories);
            }
            "api_url" => {
                cfg.api_url = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "server_url" => {
                cfg.server_url = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_number}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    let raw_value = raw_value.trim();
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_string_array(raw_value: &str) -> Result<Vec<String>> {
    let raw_value = raw_value.trim();
    let Some(inner) = raw_value
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        bail!("Expected array of double-quoted strings");
    };
    inner
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(parse_string_literal)
        .collect()
}

fn parse_integer_u8(raw_value: &str) -> Result<u8> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<u16>()?;
    u8::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u8"))
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(
            r#"
max_retries = 5
verbosity = "verbose"
"#,
        )
        .expect("partial config should parse");
        assert_eq!(cfg.max_retries, Some(5));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
        assert!(cfg.downloads_dir.is_none());
    }

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            r#"
downloads_dir = "/var/tmp/attachments"
max_file_size_bytes = 1048576
max_retries = 4
retry_delay_ms = 250
timeout_ms = 10000
allowed_extensions = [".png", "pdf"]
allowed_categories = ["images", "documents"]
api_url = "https://ghe.example.com/api/v3"
server_url = "https://ghe.example.com"
verbosity = "debug"
"#,
        )
        .expect("full config should parse");
        assert_eq!(cfg.downloads_dir, Some(PathBuf::from("/var/tmp/attachments")));
        assert_eq!(cfg.max_file_size_bytes, Some(1_048_576));
        assert_eq!(cfg.retry_delay_ms, Some(250));
        assert_eq!(cfg.timeout_ms, Some(10_000));
        assert_eq!(
            cfg.allowed_extensions,
            Some(vec![".png".to_string(), "pdf".to_string()])
        );
        assert_eq!(
            cfg.allowed_categories,
            Some(vec![FileCategory::Images, FileCategory::Documents])
        );
        assert_eq!(cfg.server_url.as_deref(), Some("https://ghe.example.com"));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Debug));
    }

    #[test]
    fn test_parse_config_rejects_invalid_max_retries() {
        let err = parse_config_str("max_retries = 0").expect_err("invalid max_retries expected");
        assert!(err.to_string().contains("max_retries"));
    }

    #[test]
    fn test_parse_config_rejects_zero_file_size() {
        let err = parse_config_str("max_file_size_bytes = 0").expect_err("zero size rejected");
        assert!(err.to_string().contains("max_file_size_bytes"));
    }

    #[test]
    fn test_parse_config_rejects_numeric_values_with_trailing_tokens() {
        let err =
            parse_config_str("timeout_ms = 4 trailing").expect_err("expected trailing token error");
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[test]
    fn test_parse_config_rejects_non_http_server_url() {
        let err = parse_config_str(r#"server_url = "ftp://example.com""#)
            .expect_err("ftp server url rejected");
        assert!(err.to_string().contains("server_url"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_category() {
        let err = parse_config_str(r#"allowed_categories = ["pictures"]"#)
            .expect_err("unknown category rejected");
        assert!(format!("{err:#}").contains("pictures"));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_array_items() {
        let err = parse_config_str("allowed_extensions = [png]").expect_err("bare item rejected");
        assert!(err.to_string().contains("allowed_extensions"));
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r#"
max_retries = 2 # attempts
verbosity = "quiet" # preferred noise level
"#,
        )
        .expect("config with comments should parse");
        assert_eq!(cfg.max_retries, Some(2));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Quiet));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("unknown_key = 123").expect_err("unknown key error expected");
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("unknown_key"));
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(VerbositySetting::Default.as_str(), "default");
        assert_eq!(VerbositySetting::Quiet.default_log_level(), "error");
        assert_eq!(VerbositySetting::Verbose.default_log_level(), "debug");
    }

    #[test]
    fn test_load_file_config_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "max_retries = 7\n").unwrap();
        let loaded = load_file_config(Some(&path)).unwrap();
        assert_eq!(loaded.path.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.config.unwrap().max_retries, Some(7));
    }

    #[test]
    fn test_load_file_config_missing_explicit_path_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_file_config(Some(&dir.path().join("absent.toml")))
            .expect_err("missing explicit config must fail");
        assert!(err.to_string().contains("absent.toml"));
    }
}
