//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/walletpulse/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/walletpulse/` (~/.config/walletpulse/)
//! - State/Logs: `$XDG_STATE_HOME/walletpulse/` (~/.local/state/walletpulse/)

use crate::error::{Error, Result};
use crate::record::ClientInfo;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Identity of the running wallet application
    #[serde(default)]
    pub app: AppConfig,

    /// Primary metrics endpoint
    #[serde(default)]
    pub metrics: SinkConfig,

    /// Secondary product analytics endpoint (optional)
    #[serde(default)]
    pub product: SinkConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The running application as seen by the translators.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The extension's own origin; transactions initiated from it are
    /// classified as "Extension" rather than "External Dapp".
    #[serde(default = "default_app_origin")]
    pub origin: String,

    #[serde(default = "default_client_name")]
    pub client_name: String,

    #[serde(default = "default_client_version")]
    pub client_version: String,

    #[serde(default = "default_platform")]
    pub platform: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_app_origin(),
            client_name: default_client_name(),
            client_version: default_client_version(),
            platform: default_platform(),
        }
    }
}

impl AppConfig {
    /// Client metadata stamped on every record.
    pub fn client_info(&self) -> ClientInfo {
        ClientInfo {
            client_name: self.client_name.clone(),
            client_version: self.client_version.clone(),
            platform: self.platform.clone(),
        }
    }
}

fn default_app_origin() -> String {
    "chrome-extension://walletpulse".to_string()
}

fn default_client_name() -> String {
    "wallet-extension".to_string()
}

fn default_client_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_platform() -> String {
    "extension".to_string()
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Endpoint configuration for a record sink
///
/// Used for both the primary metrics endpoint and the secondary
/// product analytics endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct SinkConfig {
    /// Enable/disable delivery to this endpoint
    #[serde(default)]
    pub enabled: bool,

    /// Endpoint base URL (e.g., `https://metrics.example.com`)
    pub endpoint: Option<String>,

    /// Bearer token sent with every request (optional)
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_sink_timeout")]
    pub timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_key: None,
            timeout_secs: default_sink_timeout(),
        }
    }
}

fn default_sink_timeout() -> u64 {
    10
}

impl SinkConfig {
    /// Check if the sink is enabled and has somewhere to send records
    pub fn is_ready(&self) -> bool {
        self.enabled && self.endpoint.is_some()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let Some(endpoint) = self.endpoint.as_deref() else {
            return Err(Error::Config(
                "endpoint is required when the sink is enabled".to_string(),
            ));
        };
        let parsed = url::Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("invalid endpoint {:?}: {}", endpoint, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "endpoint must be http or https, got {:?}",
                parsed.scheme()
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/walletpulse/config.toml` (~/.config/walletpulse/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("walletpulse").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/walletpulse/` (~/.local/state/walletpulse/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("walletpulse")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("walletpulse.log")
    }
}
