//! Configuration loading and management
//!
//! Handles parsing of `.pinboard.toml` configuration files and the
//! environment overrides for the task store credentials.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = ".pinboard.toml";
pub const ENV_STORE_URL: &str = "PINBOARD_STORE_URL";
pub const ENV_STORE_KEY: &str = "PINBOARD_STORE_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Markdown documents
    #[serde(default)]
    pub documents: DocumentsConfig,

    /// Remote task store
    #[serde(default)]
    pub store: StoreConfig,

    /// Retry policy for remote calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,

    /// Terminal board
    #[serde(default)]
    pub board: BoardConfig,
}

/// Document loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// Root directory; one subdirectory per category
    #[serde(default = "default_documents_root")]
    pub root: PathBuf,
}

fn default_documents_root() -> PathBuf {
    PathBuf::from("documents")
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            root: default_documents_root(),
        }
    }
}

/// Remote task store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the hosted backend (e.g. `https://xyz.example.co`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Access key sent as `apikey` and bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Table holding the tasks
    #[serde(default = "default_table")]
    pub table: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_table() -> String {
    "tasks".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            table: default_table(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Resolved store endpoint and credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCredentials {
    pub url: String,
    pub api_key: String,
}

impl StoreConfig {
    /// Whether both endpoint and credential are present
    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    /// Endpoint and credential, or `NotConfigured` naming what is missing
    pub fn credentials(&self) -> Result<StoreCredentials> {
        let url = non_empty(self.url.as_deref());
        let api_key = non_empty(self.api_key.as_deref());
        match (url, api_key) {
            (Some(url), Some(api_key)) => Ok(StoreCredentials {
                url: url.trim_end_matches('/').to_string(),
                api_key: api_key.to_string(),
            }),
            (None, None) => Err(Error::NotConfigured(format!(
                "{ENV_STORE_URL} and {ENV_STORE_KEY}"
            ))),
            (None, Some(_)) => Err(Error::NotConfigured(ENV_STORE_URL.to_string())),
            (Some(_), None) => Err(Error::NotConfigured(ENV_STORE_KEY.to_string())),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(Error::InvalidConfig("store.table cannot be empty".to_string()));
        }
        if !self
            .table
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            return Err(Error::InvalidConfig(format!(
                "store.table '{}' must be alphanumeric",
                self.table
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "store.timeout_secs must be > 0".to_string(),
            ));
        }
        if let Some(url) = non_empty(self.url.as_deref()) {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::InvalidConfig(format!(
                    "store.url '{url}' must start with http:// or https://"
                )));
            }
        }
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles for each further retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    crate::retry::DEFAULT_MAX_ATTEMPTS
}

fn default_base_delay_ms() -> u64 {
    crate::retry::DEFAULT_BASE_DELAY_MS
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "retry.max_attempts must be >= 1".to_string(),
            ));
        }
        if self.max_attempts > 10 {
            return Err(Error::InvalidConfig(
                "retry.max_attempts must be <= 10".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Terminal board configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Tasks fetched per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Quiet period before a typed search is sent
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// Preferences file; defaults to the platform data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefs_path: Option<PathBuf>,
}

fn default_page_size() -> usize {
    crate::query::DEFAULT_PAGE_SIZE
}

fn default_search_debounce_ms() -> u64 {
    300
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            search_debounce_ms: default_search_debounce_ms(),
            prefs_path: None,
        }
    }
}

impl BoardConfig {
    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::InvalidConfig(
                "board.page_size must be > 0".to_string(),
            ));
        }
        if self.page_size > 1000 {
            return Err(Error::InvalidConfig(
                "board.page_size must be <= 1000".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a `.pinboard.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            match Self::load(&config_path) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                    Self::default()
                }
            }
        } else {
            Self::default()
        }
    }

    /// Resolve the effective configuration: an explicit file must load;
    /// otherwise the directory's file is used when valid. Environment
    /// credentials are applied last.
    pub fn resolve(dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::load_from_dir(dir),
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply store credentials from the environment
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_STORE_URL).filter(|value| !value.trim().is_empty()) {
            self.store.url = Some(url);
        }
        if let Some(key) = lookup(ENV_STORE_KEY).filter(|value| !value.trim().is_empty()) {
            self.store.api_key = Some(key);
        }
        self
    }

    /// Documents root, relative paths resolved against `base`
    pub fn documents_root(&self, base: &Path) -> PathBuf {
        if self.documents.root.is_absolute() {
            self.documents.root.clone()
        } else {
            base.join(&self.documents.root)
        }
    }

    fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.retry.validate()?;
        self.board.validate()?;
        if self.server.bind.trim().is_empty() {
            return Err(Error::InvalidConfig("server.bind cannot be empty".to_string()));
        }
        Ok(())
    }
}
