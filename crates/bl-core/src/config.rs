use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that overrides `api.base_url`.
pub const BASE_URL_ENV: &str = "BOOKLINE_API_BASE_URL";

/// Top-level configuration loaded from `~/.bookline/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl Config {
    /// Load config from `~/.bookline/config.toml`, falling back to defaults
    /// when the file does not exist. Environment overrides are applied last.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let mut cfg = if path.exists() {
            Self::parse_file(&path)?
        } else {
            Config::default()
        };
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a specific path. Environment overrides are applied.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let mut cfg = Self::parse_file(&path.into())?;
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    fn parse_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                self.api.base_url = url.to_string();
            }
        }
    }

    /// Semantic validation for settings that are not fully expressible via type checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.polling.validate()?;
        if self.notifications.max_notifications == 0 {
            return Err(ConfigError::Validation(
                "notifications.max_notifications must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".bookline")
            .join("config.toml")
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            path_prefix: default_path_prefix(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Validation("api.base_url must not be empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "api.base_url must start with http:// or https:// (got {url:?})"
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "api.timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    bl_client::DEFAULT_BASE_URL.into()
}
fn default_path_prefix() -> String {
    bl_client::DEFAULT_PATH_PREFIX.into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// Poll cadence and the optional retry cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Stop polling after this many fetches without a terminal status.
    /// `None` polls until the task finishes.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Drop responses older than the last one applied instead of replacing
    /// the snapshot unconditionally.
    #[serde(default)]
    pub discard_stale_responses: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: None,
            discard_stale_responses: false,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Validation(
                "polling.interval_ms must be greater than zero".into(),
            ));
        }
        if self.max_attempts == Some(0) {
            return Err(ConfigError::Validation(
                "polling.max_attempts must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }
}

fn default_interval_ms() -> u64 {
    2500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_max_notifications")]
    pub max_notifications: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_notifications: default_max_notifications(),
        }
    }
}

fn default_max_notifications() -> usize {
    50
}
