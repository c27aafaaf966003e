use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project configuration file, read from the working directory
pub const PROJECT_CONFIG_FILE: &str = "lexrag.yaml";

/// Optional local overrides, read after the project file
pub const LOCAL_CONFIG_FILE: &str = "lexrag.local.yaml";

/// Prefix of environment variable overrides
pub const ENV_PREFIX: &str = "LEXRAG_";

/// Environment variable used when no API key is configured
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("{0} cannot be empty")]
    EmptyPath(&'static str),

    #[error("Invalid port: 0")]
    InvalidPort,

    #[error("Invalid chunking configuration: {0}")]
    InvalidChunking(String),

    #[error("Invalid {field}: {value}. Must be at least 1")]
    ZeroValue { field: &'static str, value: u64 },

    #[error("Invalid top_k: {top_k}. Must be between 1 and max_top_k ({max_top_k})")]
    InvalidTopK { top_k: usize, max_top_k: usize },

    #[error("Invalid similarity_threshold: {0}. Must be between -1.0 and 1.0")]
    InvalidThreshold(f32),

    #[error("Invalid temperature: {0}. Must be between 0.0 and 2.0")]
    InvalidTemperature(f32),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. lexrag.yaml
    /// 3. lexrag.local.yaml (optional overrides)
    /// 4. Environment variables (LEXRAG_* prefix, `__` separates nested keys)
    pub fn load() -> Result<Config> {
        let mut config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(PROJECT_CONFIG_FILE))
            .merge(Yaml::file(LOCAL_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::apply_api_key_fallback(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file on top of the defaults
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.is_file() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let mut config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::apply_api_key_fallback(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Fill unset API keys from `OPENAI_API_KEY`.
    fn apply_api_key_fallback(config: &mut Config) {
        let Ok(key) = std::env::var(OPENAI_API_KEY_ENV) else {
            return;
        };
        if key.trim().is_empty() {
            return;
        }
        if config.embedding.api_key.is_none() {
            config.embedding.api_key = Some(key.clone());
        }
        if config.completion.api_key.is_none() {
            config.completion.api_key = Some(key);
        }
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.server.host.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "server.host cannot be empty".to_string(),
            ));
        }
        if config.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if config.server.max_upload_bytes == 0 {
            return Err(ConfigError::ZeroValue {
                field: "server.max_upload_bytes",
                value: 0,
            });
        }

        if config.storage.upload_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("storage.upload_dir"));
        }
        if config.storage.index_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("storage.index_path"));
        }

        config
            .chunking
            .validate()
            .map_err(ConfigError::InvalidChunking)?;

        for (field, value) in [
            ("embedding.dimension", config.embedding.dimension as u64),
            ("embedding.batch_size", config.embedding.batch_size as u64),
            ("embedding.timeout_secs", config.embedding.timeout_secs),
            ("completion.max_tokens", u64::from(config.completion.max_tokens)),
            ("completion.timeout_secs", config.completion.timeout_secs),
            (
                "ingestion.extraction_timeout_secs",
                config.ingestion.extraction_timeout_secs,
            ),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroValue { field, value });
            }
        }

        if !(0.0..=2.0).contains(&config.completion.temperature) {
            return Err(ConfigError::InvalidTemperature(config.completion.temperature));
        }

        let retrieval = &config.retrieval;
        if retrieval.top_k == 0 || retrieval.top_k > retrieval.max_top_k {
            return Err(ConfigError::InvalidTopK {
                top_k: retrieval.top_k,
                max_top_k: retrieval.max_top_k,
            });
        }
        if !(-1.0..=1.0).contains(&retrieval.similarity_threshold) {
            return Err(ConfigError::InvalidThreshold(retrieval.similarity_threshold));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}
