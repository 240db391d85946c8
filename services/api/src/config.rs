//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

pub const DEFAULT_VISION_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_COMPLETION_API_BASE: &str = "https://api.groq.com/openai/v1";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Connection settings for one OpenAI-compatible provider.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: Level,
    pub vision: ProviderConfig,
    pub completion: ProviderConfig,
    pub upload_dir: PathBuf,
    pub keep_uploads: bool,
    pub cors_allowed_origin: String,
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

    /// Builds the configuration from any key lookup. Missing credentials are fatal.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Load Server and Database Settings ---
        let bind_address_str = or_default("BIND_ADDRESS", "0.0.0.0:8000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = required("DATABASE_URL")?;

        let max_connections_str = or_default("DB_MAX_CONNECTIONS", "5");
        let db_max_connections = max_connections_str.parse::<u32>().map_err(|e| {
            ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string(), e.to_string())
        })?;

        let log_level_str = or_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Provider Settings ---
        let vision = ProviderConfig {
            api_key: required("GEMINI_API_KEY")?,
            api_base: or_default("VISION_API_BASE", DEFAULT_VISION_API_BASE),
            model: or_default("VISION_MODEL", "gemini-2.0-flash"),
        };
        let completion = ProviderConfig {
            api_key: required("GROQ_API_KEY")?,
            api_base: or_default("COMPLETION_API_BASE", DEFAULT_COMPLETION_API_BASE),
            model: or_default("COMPLETION_MODEL", "llama-3.3-70b-versatile"),
        };

        // --- Load Upload and CORS Settings ---
        let upload_dir = PathBuf::from(or_default("UPLOAD_DIR", "uploads"));
        let keep_uploads_str = or_default("KEEP_UPLOADS", "false");
        let keep_uploads = match keep_uploads_str.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "KEEP_UPLOADS".to_string(),
                    format!("'{}' is not a boolean", keep_uploads_str),
                ))
            }
        };
        let cors_allowed_origin = or_default("CORS_ALLOWED_ORIGIN", "http://localhost:5173");

        Ok(Self {
            bind_address,
            database_url,
            db_max_connections,
            log_level,
            vision,
            completion,
            upload_dir,
            keep_uploads,
            cors_allowed_origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/math"),
        ("GEMINI_API_KEY", "g-key"),
        ("GROQ_API_KEY", "q-key"),
    ];

    #[test]
    fn applies_defaults_when_only_credentials_are_set() {
        let config = Config::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:8000");
        assert_eq!(config.vision.api_base, DEFAULT_VISION_API_BASE);
        assert_eq!(config.completion.model, "llama-3.3-70b-versatile");
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert!(!config.keep_uploads);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn missing_credentials_are_fatal() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(var) if var == "GROQ_API_KEY"));
    }

    #[test]
    fn rejects_invalid_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("BIND_ADDRESS", "not-an-address"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::InvalidValue(var, _)) if var == "BIND_ADDRESS"
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("KEEP_UPLOADS", "sometimes"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn provider_overrides_are_honoured() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("VISION_MODEL", "gemini-1.5-pro"));
        pairs.push(("COMPLETION_API_BASE", "http://localhost:11434/v1"));
        pairs.push(("KEEP_UPLOADS", "true"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.vision.model, "gemini-1.5-pro");
        assert_eq!(config.completion.api_base, "http://localhost:11434/v1");
        assert!(config.keep_uploads);
    }
}
