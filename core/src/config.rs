//! Configuration Management Module
//!
//! Probe configuration is layered: built-in defaults, then an optional TOML
//! file, then `STOREPROBE_*` environment variables. Command-line overrides are
//! applied on top by the caller.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use storeprobe_databases::ConnectionSettings;
use tracing::{debug, info};

/// Environment variable prefix (`STOREPROBE_DATABASE_URL`, ...)
pub const ENV_PREFIX: &str = "STOREPROBE";

/// Default config file name inside the user config directory
pub const CONFIG_FILE_NAME: &str = "probe.toml";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Connection parameters for one probe run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Database endpoint URL
    pub database_url: String,
    /// API key
    pub api_key: String,
    /// Project / namespace identifier
    pub project_id: String,
    /// Optional database auth token
    pub auth_token: Option<String>,
    /// Logical connection name
    pub app_name: String,
    /// Path read by the permission check
    pub permission_path: String,
    /// Path written and read back
    pub diagnostic_path: String,
    /// Transport request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            api_key: String::new(),
            project_id: String::new(),
            auth_token: None,
            app_name: "[DEFAULT]".to_string(),
            permission_path: String::new(),
            diagnostic_path: "diagnostics/connectivity".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl ProbeConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist; without one the default location is
    /// used if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                info!("Loading probe config from {}", path.display());
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    debug!("Looking for probe config at {}", default_path.display());
                    builder = builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no probe run could succeed with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// `<config_dir>/storeprobe/probe.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("storeprobe").join(CONFIG_FILE_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            database_url: self.database_url.clone(),
            api_key: self.api_key.clone(),
            project_id: self.project_id.clone(),
            auth_token: self.auth_token.clone(),
            app_name: self.app_name.clone(),
            request_timeout: self.request_timeout(),
        }
    }

    /// Copy with secrets masked, safe to log
    pub fn redacted(&self) -> Self {
        Self {
            api_key: mask(&self.api_key),
            auth_token: self.auth_token.as_deref().map(mask),
            ..self.clone()
        }
    }
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}
