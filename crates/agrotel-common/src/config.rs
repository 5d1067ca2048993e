//! ---
//! agrotel_section: "01-core-functionality"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Shared primitives and utilities for the telemetry runtime."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_tick_interval() -> Duration {
    Duration::from_millis(2000)
}

fn default_command_latency() -> Duration {
    Duration::from_millis(1000)
}

fn default_history_latency() -> Duration {
    Duration::from_millis(500)
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_storage_directory() -> PathBuf {
    PathBuf::from("target/agrotel")
}

/// Primary configuration object for Agrotel processes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "AGROTEL_CONFIG";

    /// Load configuration from disk, respecting the `AGROTEL_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// Unlike an installation manifest, a missing file is not an error: the
    /// simulator runs on built-in defaults and `source` is `None`.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path.to_path_buf()),
                });
            }
        }

        debug!("no configuration file found; using defaults");
        Ok(LoadedAppConfig {
            config: Self::default(),
            source: None,
        })
    }

    /// Read and validate a single configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("failed to load config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.simulator.validate()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Timing and randomness knobs for the telemetry simulator.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulatorConfig {
    #[serde(rename = "tick_interval_ms", default = "default_tick_interval")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub tick_interval: Duration,
    #[serde(rename = "command_latency_ms", default = "default_command_latency")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub command_latency: Duration,
    #[serde(rename = "history_latency_ms", default = "default_history_latency")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub history_latency: Duration,
    /// Seed for reproducible readings; entropy is used when absent.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            command_latency: default_command_latency(),
            history_latency: default_history_latency(),
            random_seed: None,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(anyhow!("simulator tick_interval_ms must be greater than zero"));
        }
        Ok(())
    }

    /// Zero-latency variant used by tests and scripted runs.
    pub fn instant() -> Self {
        Self {
            command_latency: Duration::ZERO,
            history_latency: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Directory for the rolling JSON log file; no file layer when absent.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            directory: None,
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_directory")]
    pub directory: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: default_storage_directory(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_simulator_constants() {
        let config = AppConfig::default();
        assert_eq!(config.simulator.tick_interval, Duration::from_millis(2000));
        assert_eq!(config.simulator.command_latency, Duration::from_secs(1));
        assert!(config.simulator.random_seed.is_none());
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn parses_partial_toml() {
        let config: AppConfig = r#"
            [simulator]
            tick_interval_ms = 250
            random_seed = 7

            [logging]
            format = "structured-json"
        "#
        .parse()
        .expect("config parses");
        assert_eq!(config.simulator.tick_interval, Duration::from_millis(250));
        assert_eq!(config.simulator.history_latency, Duration::from_millis(500));
        assert_eq!(config.simulator.random_seed, Some(7));
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
    }

    #[test]
    fn rejects_zero_tick_interval() {
        let err = "[simulator]\ntick_interval_ms = 0\n"
            .parse::<AppConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("tick_interval_ms"));
    }

    #[test]
    fn load_falls_back_to_defaults_without_candidates() {
        let loaded = AppConfig::load_with_source(&["/nonexistent/agrotel.toml"]).expect("load");
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config.simulator, SimulatorConfig::default());
    }

    #[test]
    fn load_reads_first_existing_candidate() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "[storage]\ndirectory = \"/var/lib/agrotel\"").expect("write");
        file.flush().expect("flush");
        let loaded = AppConfig::load_with_source(&[
            Path::new("/nonexistent/agrotel.toml"),
            file.path(),
        ])
        .expect("load");
        assert_eq!(loaded.source.as_deref(), Some(file.path()));
        assert_eq!(
            loaded.config.storage.directory,
            PathBuf::from("/var/lib/agrotel")
        );
    }
}
