//! Configuration management for AssetLens
//!
//! Layered configuration, loaded from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file (default: `config/assetlens.toml`, overridable
//!    via `ASSETLENS_CONFIG`)
//! 3. Environment variables from `.env` (via dotenvy)
//! 4. System environment variables (highest priority), using the pattern
//!    `ASSETLENS__<section>__<key>`, e.g.
//!    `ASSETLENS__SERVICE__ENDPOINT=https://identify.example.com`

use config::{Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::client::ClientConfig;

const CONFIG_ENV_VAR: &str = "ASSETLENS_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/assetlens.toml";
const ENV_PREFIX: &str = "ASSETLENS";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid service endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Timeout '{name}' must be greater than zero")]
    ZeroTimeout { name: &'static str },
}

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub http: HttpSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            http: HttpSettings::default(),
        }
    }
}

/// Identification service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Base URL of the service; the client appends `/identify`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            user_agent: default_user_agent(),
        }
    }
}

/// HTTP client timeouts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_user_agent() -> String {
    "AssetLens/0.1.0".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from all sources (file + environment)
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file doesn't exist)
        let _ = dotenvy::dotenv();

        let config_path = env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let config = load_from_sources(config_path)?;
        validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = load_from_sources(path)?;
        validate(&config)?;
        Ok(config)
    }

    /// Client settings derived from this configuration
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.service.endpoint.clone(),
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.http.request_timeout_secs),
            user_agent: self.service.user_agent.clone(),
        }
    }
}

fn load_from_sources(config_path: PathBuf) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::debug!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // ASSETLENS__SERVICE__ENDPOINT -> service.endpoint
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

fn validate(config: &Config) -> Result<(), ValidationError> {
    let endpoint = config.service.endpoint.trim();
    if endpoint.is_empty() {
        return Err(ValidationError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "endpoint is empty".to_string(),
        });
    }
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(ValidationError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "endpoint must be an http(s) URL".to_string(),
        });
    }

    if config.http.connect_timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            name: "connect_timeout_secs",
        });
    }
    if config.http.request_timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            name: "request_timeout_secs",
        });
    }

    Ok(())
}
