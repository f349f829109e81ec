use crate::shared::config::{default_config_path, AppConfig, AppConfigBuilder, ConfigError};
use std::path::Path;
use std::sync::Arc;

/// Client configuration wrapper.
///
/// Cheap to clone; every API component holds one.
#[derive(Debug, Clone)]
pub struct Config {
    app: Arc<AppConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_app(AppConfig::default())
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_app(app: AppConfig) -> Self {
        Self { app: Arc::new(app) }
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self::from_app(builder.build()?))
    }

    /// Defaults, then the config file (explicit path or the default location),
    /// then environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let default_path = default_config_path();
        let path = path.unwrap_or(&default_path);
        let builder = AppConfig::builder().file(path)?.env()?;
        Self::with_builder(builder)
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url(), path)
    }

    pub fn server_url(&self) -> &str {
        &self.app.server_url
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }
}
