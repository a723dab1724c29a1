use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::{Config, QueueConfig};
use crate::domain::models::{ThesisError, MAX_DELAY_MS};
use crate::services::thesis_registry::ThesisRegistry;

/// Project directory holding configuration and the queue database
pub const CONFIG_DIR: &str = ".diligence";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Broker database_url cannot be empty")]
    EmptyDatabaseUrl,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Queue name cannot be empty")]
    EmptyQueueName,

    #[error("Evidence and report queues must have distinct names (both are '{0}')")]
    DuplicateQueueName(String),

    #[error("Invalid attempts for queue '{0}': must be at least 1")]
    InvalidAttempts(String),

    #[error("Invalid {field}: {value} ms exceeds the maximum of {max} ms")]
    DelayTooLarge { field: String, value: u64, max: u64 },

    #[error("Invalid channel_capacity: {0}. Must be at least 1")]
    InvalidChannelCapacity(usize),

    #[error("Invalid recency_window_days: {0}. Must be at least 1")]
    InvalidRecencyWindow(u32),

    #[error("Invalid thesis profile: {0}")]
    InvalidThesis(#[from] ThesisError),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the current directory.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .diligence/config.yaml (project config, created by init)
    /// 3. .diligence/local.yaml (local overrides, optional)
    /// 4. Environment variables (`DILIGENCE_*`, `__` separates nested keys)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Same as [`ConfigLoader::load`] with the project rooted at `root`.
    pub fn load_from_dir(root: impl AsRef<Path>) -> Result<Config> {
        let dir = root.as_ref().join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed("DILIGENCE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.broker.database_url.trim().is_empty() {
            return Err(ConfigError::EmptyDatabaseUrl);
        }
        if config.broker.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.broker.max_connections));
        }

        Self::validate_queue(&config.queues.evidence)?;
        Self::validate_queue(&config.queues.report)?;
        if config.queues.report_min_delay_ms > MAX_DELAY_MS {
            return Err(ConfigError::DelayTooLarge {
                field: "queues.report_min_delay_ms".to_string(),
                value: config.queues.report_min_delay_ms,
                max: MAX_DELAY_MS,
            });
        }
        if config.queues.evidence.name == config.queues.report.name {
            return Err(ConfigError::DuplicateQueueName(config.queues.evidence.name.clone()));
        }

        if config.events.channel_capacity == 0 {
            return Err(ConfigError::InvalidChannelCapacity(config.events.channel_capacity));
        }
        if config.scoring.recency_window_days == 0 {
            return Err(ConfigError::InvalidRecencyWindow(config.scoring.recency_window_days));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let mut seen = HashSet::new();
        for thesis in &config.theses {
            if !seen.insert(thesis.id.as_str()) {
                return Err(ThesisError::DuplicateProfile(thesis.id.clone()).into());
            }
        }
        ThesisRegistry::with_definitions(&config.theses)?;

        Ok(())
    }

    fn validate_queue(queue: &QueueConfig) -> Result<(), ConfigError> {
        if queue.name.trim().is_empty() {
            return Err(ConfigError::EmptyQueueName);
        }
        if queue.attempts == 0 {
            return Err(ConfigError::InvalidAttempts(queue.name.clone()));
        }
        let backoff = queue.backoff.base_delay_ms();
        if backoff > MAX_DELAY_MS {
            return Err(ConfigError::DelayTooLarge {
                field: format!("backoff delay of queue '{}'", queue.name),
                value: backoff,
                max: MAX_DELAY_MS,
            });
        }
        Ok(())
    }
}
