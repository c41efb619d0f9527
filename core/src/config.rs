//! Configuration for Stagehand
//!
//! Settings are layered, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`stagehand.toml` in the working directory, the path in
//!    `STAGEHAND_CONFIG_PATH`, or an explicit path from the builder)
//! 3. Environment variables such as `STAGEHAND__ENGINE__MAX_OPS_PER_SECOND`
//! 4. Explicit builder overrides (CLI flags)
//!
//! A `.env` file is read before the environment is consulted.
//!
//! # Example
//! ```no_run
//! use stagehand_core::config::Config;
//!
//! let config = Config::builder()
//!     .max_ops_per_second(Some(5_000))
//!     .build()?;
//! assert_eq!(config.engine.max_ops_per_second, 5_000);
//! # Ok::<(), stagehand_core::config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = "stagehand.toml";
const CONFIG_PATH_ENV: &str = "STAGEHAND_CONFIG_PATH";
const ENV_PREFIX: &str = "STAGEHAND";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("config file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub runner: RunnerConfig,
    pub storage: StorageConfig,
}

/// Scheduler policy knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Steps allowed in a rolling one-second window before the engine
    /// assumes a runaway loop and stops.
    pub max_ops_per_second: u64,

    /// Single-command steps performed per tick, across all threads
    pub max_steps_per_tick: u64,

    /// Upper bound on the time delta applied in one tick
    pub max_frame_delta_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_ops_per_second: 10_000,
            max_steps_per_tick: 400,
            max_frame_delta_ms: 50,
        }
    }
}

impl EngineConfig {
    pub fn max_frame_delta(&self) -> Duration {
        Duration::from_millis(self.max_frame_delta_ms)
    }
}

/// Host-side settings used by the session runner and CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Display refresh rate the runner ticks at
    pub frame_rate: u32,

    /// Log lines kept in the session log buffer
    pub log_capacity: usize,

    /// How long `run` plays when no duration is given
    pub default_duration_secs: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            log_capacity: 200,
            default_duration_secs: 10.0,
        }
    }
}

impl RunnerConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate.max(1)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// File the saved project lives in
    pub project_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            project_path: PathBuf::from(".stagehand/project.json"),
        }
    }
}

impl Config {
    /// Load configuration from the default sources
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_steps_per_tick == 0 {
            return Err(ConfigError::Invalid(
                "engine.max_steps_per_tick must be at least 1".to_string(),
            ));
        }
        if self.runner.frame_rate == 0 {
            return Err(ConfigError::Invalid(
                "runner.frame_rate must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for layered configuration with explicit overrides
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    skip_env: bool,
    max_ops_per_second: Option<u64>,
    max_steps_per_tick: Option<u64>,
    frame_rate: Option<u32>,
    project_path: Option<PathBuf>,
}

impl ConfigBuilder {
    /// Read this file instead of searching for one. The file must exist.
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Ignore `.env` and `STAGEHAND__*` variables
    pub fn skip_env(mut self, skip: bool) -> Self {
        self.skip_env = skip;
        self
    }

    pub fn max_ops_per_second(mut self, value: Option<u64>) -> Self {
        self.max_ops_per_second = value;
        self
    }

    pub fn max_steps_per_tick(mut self, value: Option<u64>) -> Self {
        self.max_steps_per_tick = value;
        self
    }

    pub fn frame_rate(mut self, value: Option<u32>) -> Self {
        self.frame_rate = value;
        self
    }

    pub fn project_path(mut self, value: Option<PathBuf>) -> Self {
        self.project_path = value;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        if !self.skip_env {
            // Missing .env is the normal case
            let _ = dotenvy::dotenv();
        }

        let mut builder = config::Config::builder();

        match self.resolve_path()? {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                builder = builder.add_source(
                    config::File::with_name(DEFAULT_CONFIG_FILE)
                        .format(config::FileFormat::Toml)
                        .required(false),
                );
            }
        }

        if !self.skip_env {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let mut config: Config = builder.build()?.try_deserialize()?;

        if let Some(v) = self.max_ops_per_second {
            config.engine.max_ops_per_second = v;
        }
        if let Some(v) = self.max_steps_per_tick {
            config.engine.max_steps_per_tick = v;
        }
        if let Some(v) = self.frame_rate {
            config.runner.frame_rate = v;
        }
        if let Some(v) = self.project_path {
            config.storage.project_path = v;
        }

        config.validate()?;
        Ok(config)
    }

    fn resolve_path(&self) -> Result<Option<PathBuf>, ConfigError> {
        let explicit = self.config_path.clone().or_else(|| {
            if self.skip_env {
                None
            } else {
                std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from)
            }
        });

        match explicit {
            Some(path) if !path.exists() => Err(ConfigError::MissingFile(path)),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.engine.max_ops_per_second, 10_000);
        assert_eq!(config.engine.max_steps_per_tick, 400);
        assert_eq!(config.engine.max_frame_delta(), Duration::from_millis(50));
        assert_eq!(config.runner.log_capacity, 200);
    }

    #[test]
    fn test_file_layer_and_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[engine]\nmax_ops_per_second = 1234\nmax_steps_per_tick = 50\n\n[runner]\nframe_rate = 30"
        )
        .unwrap();

        let config = Config::builder()
            .skip_env(true)
            .config_path(Some(file.path().to_path_buf()))
            .max_steps_per_tick(Some(99))
            .build()
            .unwrap();

        assert_eq!(config.engine.max_ops_per_second, 1234);
        assert_eq!(config.engine.max_steps_per_tick, 99);
        assert_eq!(config.engine.max_frame_delta_ms, 50);
        assert_eq!(config.runner.frame_rate, 30);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Config::builder()
            .skip_env(true)
            .config_path(Some(PathBuf::from("/definitely/not/here.toml")))
            .build();
        assert!(matches!(result, Err(ConfigError::MissingFile(_))));
    }

    #[test]
    fn test_zero_step_budget_rejected() {
        let result = Config::builder()
            .skip_env(true)
            .max_steps_per_tick(Some(0))
            .build();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_frame_interval() {
        let runner = RunnerConfig {
            frame_rate: 50,
            ..Default::default()
        };
        assert_eq!(runner.frame_interval(), Duration::from_millis(20));
    }
}
