//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
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

/// Settings for the process that executes code challenges.
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    pub interpreter: String,
    pub file_extension: String,
    pub temp_dir: PathBuf,
    pub timeout: Duration,
    pub max_output_bytes: usize,
    pub max_concurrent: usize,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub log_level: Level,
    pub cors_origin: String,
    pub session_ttl_days: i64,
    pub runner: RunnerConfig,
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
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;
        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5u32)?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        let session_ttl_days = parse_or(&lookup, "SESSION_TTL_DAYS", 30i64)?;
        if session_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_DAYS".to_string(),
                "must be positive".to_string(),
            ));
        }

        // --- Code Runner Settings ---
        let interpreter = lookup("RUNNER_INTERPRETER").unwrap_or_else(|| "php".to_string());
        let file_extension = lookup("RUNNER_FILE_EXTENSION").unwrap_or_else(|| "php".to_string());
        let temp_dir = lookup("RUNNER_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        let timeout_secs = parse_or(&lookup, "RUNNER_TIMEOUT_SECS", 5u64)?;
        let max_output_bytes = parse_or(&lookup, "RUNNER_MAX_OUTPUT_BYTES", 64 * 1024usize)?;
        let max_concurrent = parse_or(&lookup, "RUNNER_MAX_CONCURRENT", 4usize)?;
        if timeout_secs == 0 || max_concurrent == 0 {
            return Err(ConfigError::InvalidValue(
                "RUNNER_TIMEOUT_SECS/RUNNER_MAX_CONCURRENT".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            database_url,
            database_max_connections,
            log_level,
            cors_origin,
            session_ttl_days,
            runner: RunnerConfig {
                interpreter,
                file_extension,
                temp_dir,
                timeout: Duration::from_secs(timeout_secs),
                max_output_bytes,
                max_concurrent,
            },
        })
    }
}

/// Parses `key` when present, otherwise falls back to `default`.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
