//! Configuration module
//!
//! Handles configuration loading from TOML files and environment variables,
//! and turns the confirmation settings into per-signature requests.

use serde::{Deserialize, Serialize};
use solana_sdk::signature::Signature;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::confirmation::{check_budget, ConfirmRequest, DurabilityLevel};

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnv { var: String, value: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Confirmation polling settings
    #[serde(default)]
    pub confirm: ConfirmSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmSettings {
    /// Durability level to wait for
    #[serde(default)]
    pub commitment: DurabilityLevel,

    /// Total wall-clock budget in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Delay between unsuccessful polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Also inspect signatures no longer in the recent status cache
    #[serde(default)]
    pub search_transaction_history: bool,
}

// Default value functions
fn default_rpc_url() -> String { "http://127.0.0.1:8899".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_timeout_ms() -> u64 { crate::confirmation::poller::DEFAULT_TIMEOUT_MS }
fn default_poll_interval_ms() -> u64 { crate::confirmation::poller::DEFAULT_POLL_INTERVAL_MS }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_secs: default_rpc_timeout(),
        }
    }
}

impl Default for ConfirmSettings {
    fn default() -> Self {
        Self {
            commitment: DurabilityLevel::default(),
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            search_transaction_history: false,
        }
    }
}

impl ConfirmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Build a request for `signature` from these settings
    pub fn to_request(&self, signature: Signature) -> ConfirmRequest {
        ConfirmRequest::new(signature)
            .with_desired_level(self.commitment)
            .with_timeout(self.timeout())
            .with_poll_interval(self.poll_interval())
            .with_search_history(self.search_transaction_history)
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration with `.env` and environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Defaults with `.env` and environment variable overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply `CONFIRM_*` overrides looked up through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CONFIRM_RPC_URL") {
            self.rpc.url = url;
        }
        if let Some(value) = lookup("CONFIRM_COMMITMENT") {
            self.confirm.commitment = parse_env("CONFIRM_COMMITMENT", value)?;
        }
        if let Some(value) = lookup("CONFIRM_TIMEOUT_MS") {
            self.confirm.timeout_ms = parse_env("CONFIRM_TIMEOUT_MS", value)?;
        }
        if let Some(value) = lookup("CONFIRM_POLL_INTERVAL_MS") {
            self.confirm.poll_interval_ms = parse_env("CONFIRM_POLL_INTERVAL_MS", value)?;
        }
        if let Some(value) = lookup("CONFIRM_SEARCH_HISTORY") {
            self.confirm.search_transaction_history = parse_env("CONFIRM_SEARCH_HISTORY", value)?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rpc.url.starts_with("http://") && !self.rpc.url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "Invalid URL format: {}",
                self.rpc.url
            )));
        }
        if self.rpc.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "rpc.timeout_secs must be > 0".to_string(),
            ));
        }
        check_budget(self.confirm.timeout(), self.confirm.poll_interval())
            .map_err(ConfigError::Validation)
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value,
    })
}
