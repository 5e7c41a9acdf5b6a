use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_CONTENT_SERVICE_URL: &str = "https://kids-learning-backend-eryf.onrender.com";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where learning content comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentProvider {
    /// The remote content-generation service.
    Remote,
    /// Built-in sample content; no network access.
    Sample,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub content_provider: ContentProvider,
    pub content_service_url: String,
    pub content_timeout: Duration,
    pub translation_locale: String,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider_str =
            std::env::var("CONTENT_PROVIDER").unwrap_or_else(|_| "remote".to_string());
        let content_provider = match provider_str.to_lowercase().as_str() {
            "remote" => ContentProvider::Remote,
            "sample" => ContentProvider::Sample,
            other => {
                return Err(ConfigError::InvalidValue(
                    "CONTENT_PROVIDER".to_string(),
                    format!("'{}' is not one of 'remote' or 'sample'", other),
                ));
            }
        };

        let content_service_url = std::env::var("CONTENT_SERVICE_URL")
            .unwrap_or_else(|_| DEFAULT_CONTENT_SERVICE_URL.to_string());
        if content_provider == ContentProvider::Remote && content_service_url.trim().is_empty() {
            return Err(ConfigError::MissingVar(
                "CONTENT_SERVICE_URL must be set for 'remote' provider".to_string(),
            ));
        }

        let timeout_str =
            std::env::var("CONTENT_TIMEOUT_SECS").unwrap_or_else(|_| "30".to_string());
        let content_timeout = match timeout_str.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                return Err(ConfigError::InvalidValue(
                    "CONTENT_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a positive number of seconds", timeout_str),
                ));
            }
        };

        let translation_locale =
            std::env::var("TRANSLATION_LOCALE").unwrap_or_else(|_| "te-IN".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            content_provider,
            content_service_url,
            content_timeout,
            translation_locale,
            log_level,
        })
    }
}
