use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::provider::ProviderId;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "public";

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// HTTP server settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
    pub static_dir: Option<PathBuf>,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Example TOML:
    /// [providers.weatherapi]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Whether a provider can be used with the current credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    NotRequired,
    Configured,
    Missing,
}

impl std::fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            KeyStatus::NotRequired => "no key required",
            KeyStatus::Configured => "configured",
            KeyStatus::Missing => "not configured (optional)",
        })
    }
}

impl Config {
    /// Load config from the platform config dir; a missing file means defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid configuration TOML")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Write the config, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-fusion", "weather-fusion")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set/replace a provider API key.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });
    }

    /// Returns the API key stored in the config file, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers
            .get(provider_id.as_str())
            .map(|cfg| cfg.api_key.as_str())
            .filter(|key| !key.trim().is_empty())
    }

    /// API key from the provider's environment variable, falling back to the
    /// config file.
    pub fn resolved_api_key(&self, provider_id: ProviderId) -> Option<String> {
        let from_env = provider_id.api_key_env().and_then(|name| std::env::var(name).ok());
        self.api_key_with_override(provider_id, from_env)
    }

    fn api_key_with_override(
        &self,
        provider_id: ProviderId,
        env_value: Option<String>,
    ) -> Option<String> {
        env_value
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.provider_api_key(provider_id).map(str::to_owned))
    }

    pub fn key_status(&self, provider_id: ProviderId) -> KeyStatus {
        if !provider_id.requires_api_key() {
            KeyStatus::NotRequired
        } else if self.resolved_api_key(provider_id).is_some() {
            KeyStatus::Configured
        } else {
            KeyStatus::Missing
        }
    }

    /// `PORT` from the environment, then the config file, then the default.
    pub fn server_port(&self) -> u16 {
        let from_env = std::env::var("PORT").ok().and_then(|p| p.trim().parse().ok());
        from_env.or(self.server.port).unwrap_or(DEFAULT_PORT)
    }

    pub fn static_dir(&self) -> PathBuf {
        self.server.static_dir.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR))
    }
}
