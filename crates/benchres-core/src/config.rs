//! Configuration types for benchres.
//!
//! [`Config::load`] layers, lowest priority first: the embedded defaults,
//! `~/.config/benchres/config.toml` (or an explicit path), and
//! `BENCHRES__SECTION__KEY` environment variables. [`Config::defaults`]
//! returns the embedded defaults without touching the filesystem.

use crate::partition::HeaderScope;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable holding the store password.
pub const PASSWORD_ENV: &str = "DATASTORE_PASSWORD";

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[store]
scheme            = "https"
host              = "localhost"
port              = 9200
index             = "benchmark-results-*"
username          = "admin"
page_size         = 10000
scroll_keep_alive = "5m"
timeout_secs      = 60

[download]
sample_size  = 1000
header_scope = "dataset"

[report]
max_attempts   = 5
retry_delay_ms = 30000
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// `[store]` section: where the metrics store lives and how to page it.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_scroll_keep_alive")]
    pub scroll_keep_alive: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_scheme() -> String { "https".to_string() }
fn default_host() -> String { "localhost".to_string() }
fn default_port() -> u16 { 9200 }
fn default_index() -> String { "benchmark-results-*".to_string() }
fn default_username() -> String { "admin".to_string() }
fn default_page_size() -> usize { 10_000 }
fn default_scroll_keep_alive() -> String { "5m".to_string() }
fn default_timeout_secs() -> u64 { 60 }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            host: default_host(),
            port: default_port(),
            index: default_index(),
            username: default_username(),
            page_size: default_page_size(),
            scroll_keep_alive: default_scroll_keep_alive(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// `[download]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    /// Documents sampled by field discovery.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default)]
    pub header_scope: HeaderScope,
}

fn default_sample_size() -> usize { 1000 }

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            header_scope: HeaderScope::default(),
        }
    }
}

/// `[report]` section: retry policy for the reporting sink.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_max_attempts() -> u32 { 5 }
fn default_retry_delay_ms() -> u64 { 30_000 }

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load defaults, then the config file, then the process environment.
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`Config::load`] but reads environment overrides from `env`
    /// instead of the process environment when it is `Some`.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::from(config_path().as_path()).required(false),
        };

        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("BENCHRES")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// Problems with user input, detected before any network call.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("missing credentials: set {0}")]
    MissingCredentials(&'static str),
    #[error("missing required {0} date")]
    MissingDate(&'static str),
    #[error("invalid date {input:?}: expected YYYY-MM-DD or an RFC 3339 timestamp with timezone")]
    InvalidDate { input: String },
    #[error("start date {start} is after end date {end}")]
    InvertedRange { start: String, end: String },
    #[error("missing required {0}")]
    MissingDirectory(&'static str),
    #[error("directory {} does not exist", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("--output-dir {} must differ from --input-dir", .0.display())]
    SameDirectory(PathBuf),
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("benchres")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
