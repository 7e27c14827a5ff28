//! Configuration management for CineArc
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{CinearcError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for CineArc
///
/// Holds everything needed to reach the backend and to persist the
/// session between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Durable session storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend; endpoint paths are appended to it
    /// (e.g. `{url}/auth/login/`)
    #[serde(default = "default_api_url")]
    pub url: String,

    /// Timeout for a single HTTP request (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_api_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Which durable key/value backend mirrors the session tokens
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Plain-text JSON file in the user's data directory
    #[default]
    File,
    /// OS native credential store
    Keyring,
    /// Process memory only; nothing survives a restart
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = CinearcError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keyring" => Ok(Self::Keyring),
            "memory" => Ok(Self::Memory),
            other => Err(CinearcError::Config(format!(
                "Invalid storage backend: {}. Must be one of: file, keyring, memory",
                other
            ))),
        }
    }
}

/// Durable storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend used to persist `token` / `refresh_token`
    #[serde(default)]
    pub backend: StorageBackend,

    /// Override for the file backend location. Defaults to
    /// `session.json` in the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Service name used for keyring entries
    #[serde(default = "default_keyring_service")]
    pub keyring_service: String,
}

fn default_keyring_service() -> String {
    "cinearc".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: None,
            keyring_service: default_keyring_service(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CinearcError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| CinearcError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("CINEARC_API_URL") {
            tracing::debug!(url = %url, "Env override: CINEARC_API_URL");
            self.api.url = url;
        }

        if let Ok(timeout) = std::env::var("CINEARC_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid CINEARC_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(backend) = std::env::var("CINEARC_STORAGE_BACKEND") {
            match backend.parse::<StorageBackend>() {
                Ok(value) => {
                    self.storage.backend = value;
                    tracing::debug!(?value, "Env override: CINEARC_STORAGE_BACKEND");
                }
                Err(_) => {
                    tracing::warn!("Invalid storage backend: {}, using default", backend);
                }
            }
        }

        if let Ok(path) = std::env::var("CINEARC_STORAGE_PATH") {
            tracing::debug!(path = %path, "Env override: CINEARC_STORAGE_PATH");
            self.storage.path = Some(PathBuf::from(path));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(url) = &cli.api_url {
            self.api.url = url.clone();
        }

        if cli.ephemeral {
            self.storage.backend = StorageBackend::Memory;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the API URL does not parse as an absolute http(s)
    /// URL, the timeout is zero, or the keyring service name is empty while
    /// the keyring backend is selected.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api.url).map_err(|e| {
            CinearcError::Config(format!("Invalid api.url '{}': {}", self.api.url, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(CinearcError::Config(format!(
                "api.url must use http or https, got: {}",
                url.scheme()
            ))
            .into());
        }

        if self.api.timeout_seconds == 0 {
            return Err(CinearcError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.storage.backend == StorageBackend::Keyring
            && self.storage.keyring_service.trim().is_empty()
        {
            return Err(CinearcError::Config(
                "storage.keyring_service cannot be empty".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}
