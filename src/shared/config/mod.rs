//! Application configuration module
//!
//! Provides the validated configuration for the catalog client and the
//! builder that layers its sources:
//!
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. `CARDKEEP_*` environment variables
//!
//! ```toml
//! server_url = "http://192.168.1.20"
//! request_timeout_secs = 10
//! max_concurrent_requests = 4
//! store_path = ":memory:"
//!
//! [retry]
//! max_retries = 2
//! base_delay_ms = 200
//!
//! [membership]
//! wishlist_duplicates = "allow"
//! collection_duplicates = "reject"
//! ```

use crate::shared::catalog::MembershipSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default server URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
/// Timeout applied to every remote call unless configured otherwise
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Width of batch card fetches
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

const ENV_SERVER_URL: &str = "CARDKEEP_SERVER_URL";
const ENV_TIMEOUT_SECS: &str = "CARDKEEP_TIMEOUT_SECS";
const ENV_MAX_CONCURRENCY: &str = "CARDKEEP_MAX_CONCURRENCY";
const ENV_MAX_RETRIES: &str = "CARDKEEP_MAX_RETRIES";
const ENV_STORE_PATH: &str = "CARDKEEP_STORE_PATH";

/// Whether a membership set rejects an insert for a card it already holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Re-validate against remote truth and fail with `AlreadyMember`
    Reject,
    /// Insert without a pre-check
    Allow,
}

/// Where the durable key-value store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// SQLite file on disk
    File(PathBuf),
    /// Process-local database, lost on exit
    InMemory,
}

impl StoreLocation {
    fn parse(raw: &str) -> Self {
        if raw.trim() == ":memory:" {
            Self::InMemory
        } else {
            Self::File(PathBuf::from(raw))
        }
    }

    /// `<data_dir>/cardkeep/local.db`
    pub fn default_file() -> Self {
        let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        path.push("cardkeep");
        path.push("local.db");
        Self::File(path)
    }
}

/// Retry settings for transport failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    /// Extra attempts after the first one
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fraction of the delay added as random jitter (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            jitter: 0.1,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server URL, without a trailing slash
    pub server_url: String,
    pub request_timeout: Duration,
    pub max_concurrent_requests: usize,
    pub retry: RetrySettings,
    pub wishlist_duplicates: DuplicatePolicy,
    pub collection_duplicates: DuplicatePolicy,
    pub store: StoreLocation,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENCY,
            retry: RetrySettings::default(),
            wishlist_duplicates: DuplicatePolicy::Allow,
            collection_duplicates: DuplicatePolicy::Reject,
            store: StoreLocation::default_file(),
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Duplicate policy of a membership set
    pub fn duplicate_policy(&self, set: MembershipSet) -> DuplicatePolicy {
        match set {
            MembershipSet::Wishlist => self.wishlist_duplicates,
            MembershipSet::Collection => self.collection_duplicates,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.server_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.server_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                self.server_url
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid("request_timeout_secs", "must be greater than zero"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::invalid("max_concurrent_requests", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(ConfigError::invalid("retry.jitter", "must be between 0.0 and 1.0"));
        }
        Ok(())
    }
}

/// On-disk representation; every field optional so a file may override
/// only what it names.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
    max_concurrent_requests: Option<usize>,
    store_path: Option<String>,
    #[serde(default)]
    retry: RetryFile,
    #[serde(default)]
    membership: MembershipFile,
}

#[derive(Debug, Default, Deserialize)]
struct RetryFile {
    max_retries: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    jitter: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct MembershipFile {
    wishlist_duplicates: Option<DuplicatePolicy>,
    collection_duplicates: Option<DuplicatePolicy>,
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn max_concurrent_requests(mut self, width: usize) -> Self {
        self.config.max_concurrent_requests = width;
        self
    }

    pub fn retry(mut self, retry: RetrySettings) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.retry.max_retries = max_retries;
        self
    }

    pub fn duplicate_policy(mut self, set: MembershipSet, policy: DuplicatePolicy) -> Self {
        match set {
            MembershipSet::Wishlist => self.config.wishlist_duplicates = policy,
            MembershipSet::Collection => self.config.collection_duplicates = policy,
        }
        self
    }

    pub fn store(mut self, store: StoreLocation) -> Self {
        self.config.store = store;
        self
    }

    /// Layer a TOML configuration string on top of the current values
    pub fn toml_str(mut self, source: &str, origin: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(source).map_err(|e| ConfigError::Parse {
            path: origin.display().to_string(),
            message: e.to_string(),
        })?;

        if let Some(url) = file.server_url {
            self = self.server_url(url);
        }
        if let Some(secs) = file.request_timeout_secs {
            self.config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(width) = file.max_concurrent_requests {
            self.config.max_concurrent_requests = width;
        }
        if let Some(path) = file.store_path {
            self.config.store = StoreLocation::parse(&path);
        }
        if let Some(n) = file.retry.max_retries {
            self.config.retry.max_retries = n;
        }
        if let Some(ms) = file.retry.base_delay_ms {
            self.config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = file.retry.max_delay_ms {
            self.config.retry.max_delay = Duration::from_millis(ms);
        }
        if let Some(jitter) = file.retry.jitter {
            self.config.retry.jitter = jitter;
        }
        if let Some(policy) = file.membership.wishlist_duplicates {
            self.config.wishlist_duplicates = policy;
        }
        if let Some(policy) = file.membership.collection_duplicates {
            self.config.collection_duplicates = policy;
        }
        Ok(self)
    }

    /// Layer a TOML file. A missing file is not an error.
    pub fn file(self, path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(source) => self.toml_str(&source, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("[Config] No config file at {}", path.display());
                Ok(self)
            }
            Err(e) => Err(ConfigError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Layer `CARDKEEP_*` environment variables
    pub fn env(mut self) -> Result<Self, ConfigError> {
        if let Ok(url) = std::env::var(ENV_SERVER_URL) {
            self = self.server_url(url);
        }
        if let Some(secs) = env_number::<u64>(ENV_TIMEOUT_SECS)? {
            self.config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(width) = env_number::<usize>(ENV_MAX_CONCURRENCY)? {
            self.config.max_concurrent_requests = width;
        }
        if let Some(n) = env_number::<u32>(ENV_MAX_RETRIES)? {
            self.config.retry.max_retries = n;
        }
        if let Ok(path) = std::env::var(ENV_STORE_PATH) {
            self.config.store = StoreLocation::parse(&path);
        }
        Ok(self)
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn env_number<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::invalid(key, e.to_string())),
        Err(_) => Ok(None),
    }
}

/// Default location of the configuration file
pub fn default_config_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(std::env::temp_dir);
    path.push("cardkeep");
    path.push("config.toml");
    path
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
    #[error("cannot parse {path}: {message}")]
    Parse { path: String, message: String },
}

impl ConfigError {
    fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            message: message.into(),
        }
    }
}
