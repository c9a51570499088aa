//! services/runner/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the quiz/results REST service, without a trailing slash.
    pub api_base_url: String,
    /// The logged-in user this session runs as.
    pub user_id: i64,
    /// Directory holding the cached profile and saved outcomes.
    pub state_path: PathBuf,
    pub log_level: Level,
    pub http_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let raw_base_url =
            std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
        let api_base_url = raw_base_url.trim_end_matches('/').to_string();

        let user_id_str = std::env::var("USER_ID")
            .map_err(|_| ConfigError::MissingVar("USER_ID".to_string()))?;
        let user_id = user_id_str.parse::<i64>().map_err(|e| {
            ConfigError::InvalidValue("USER_ID".to_string(), e.to_string())
        })?;

        let state_path = std::env::var("STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./state"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let http_timeout_str =
            std::env::var("HTTP_TIMEOUT_SECS").unwrap_or_else(|_| "10".to_string());
        let http_timeout_secs = http_timeout_str.parse::<u64>().map_err(|e| {
            ConfigError::InvalidValue("HTTP_TIMEOUT_SECS".to_string(), e.to_string())
        })?;

        Ok(Self {
            api_base_url,
            user_id,
            state_path,
            log_level,
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }
}
