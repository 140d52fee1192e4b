//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid segment timeout: {0}s. Must be between 30 and 120")]
    InvalidSegmentTimeout(u64),

    #[error("Invalid max_segments: {0}. Must be at least 1")]
    InvalidMaxSegments(u32),

    #[error("Invalid max_retries: {0}. Must be between 0 and 2")]
    InvalidMaxRetries(u32),

    #[error("Invalid batch_size: {0}. Must be at least 1")]
    InvalidBatchSize(usize),

    #[error("Invalid interval: {0}s. Must be at least 1")]
    InvalidInterval(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Snapshot directory cannot be empty")]
    EmptySnapshotDir,
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .delphi/config.yaml (project config)
    /// 3. .delphi/local.yaml (project local overrides, optional)
    /// 4. Environment variables (DELPHI_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".delphi/config.yaml"))
            .merge(Yaml::file(".delphi/local.yaml"))
            .merge(Env::prefixed("DELPHI_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        for secs in [
            config.invoker.light_segment_secs,
            config.invoker.standard_segment_secs,
            config.invoker.heavy_segment_secs,
            config.invoker.debate_segment_secs,
        ] {
            if !(30..=120).contains(&secs) {
                return Err(ConfigError::InvalidSegmentTimeout(secs));
            }
        }
        if config.invoker.max_segments == 0 {
            return Err(ConfigError::InvalidMaxSegments(config.invoker.max_segments));
        }
        if config.invoker.max_retries > 2 {
            return Err(ConfigError::InvalidMaxRetries(config.invoker.max_retries));
        }

        if config.scheduler.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(config.scheduler.batch_size));
        }

        for interval in [
            config.continuity.poll_interval_secs,
            config.continuity.snapshot_interval_secs,
        ] {
            if interval == 0 {
                return Err(ConfigError::InvalidInterval(interval));
            }
        }
        if config.continuity.snapshot_dir.is_empty() {
            return Err(ConfigError::EmptySnapshotDir);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
