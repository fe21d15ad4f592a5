use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::retry::{DEFAULT_MAX_RETRIES, RetryPolicy};

/// Environment variable that overrides `[weather_api] base_url`.
pub const BASE_URL_ENV: &str = "WEATHER_API_BASE_URL";

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Upstream weather API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherApiConfig {
    /// Base address of the upstream API, e.g. "http://localhost:5000/".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Deadline for a whole fetch, retries included.
    pub timeout_secs: u64,

    pub max_retries: u32,

    /// Retry `n` waits `retry_base_delay_ms * 2^n`.
    pub retry_base_delay_ms: u64,
}

impl Default for WeatherApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: 1000,
        }
    }
}

impl WeatherApiConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: DEFAULT_BIND.to_string() }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// [weather_api]
/// base_url = "http://localhost:5000/"
/// timeout_secs = 30
///
/// [server]
/// bind = "127.0.0.1:8080"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub weather_api: WeatherApiConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Configured base URL, or an error telling the user how to set one.
    pub fn base_url(&self) -> Result<&str> {
        self.weather_api
            .base_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No weather API base URL configured.\n\
                     Hint: run `weather configure --base-url <URL>` or set {BASE_URL_ENV}."
                )
            })
    }

    pub fn set_base_url(&mut self, base_url: String) {
        self.weather_api.base_url = Some(base_url);
    }

    /// Load config from the default location, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-service", "weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply `WEATHER_API_BASE_URL` on top of whatever was loaded.
    pub fn with_env_overrides(self) -> Self {
        self.with_base_url_override(std::env::var(BASE_URL_ENV).ok())
    }

    fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            tracing::debug!(%url, "weather API base URL taken from environment");
            self.weather_api.base_url = Some(url);
        }
        self
    }
}
