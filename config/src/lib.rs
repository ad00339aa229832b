//! Configuration for the deferral runner.
//!
//! ```toml
//! [scheduler]
//! turn_limit = 10000
//!
//! [runner]
//! only = ["fifo_order", "self_resolution"]
//! fail_fast = false
//!
//! [log]
//! level = "deferral_core=trace,info"
//! file = "/tmp/deferral.log"
//! ```

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "DEFERRAL_CONFIG";

/// Turn limit used when `[scheduler] turn_limit` is absent.
pub const DEFAULT_TURN_LIMIT: usize = 10_000;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeferralConfig {
    pub scheduler: Option<SchedulerConfig>,
    pub runner: Option<RunnerConfig>,
    pub log: Option<LogConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Maximum tasks one flush may run. Default: 10000.
    pub turn_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Run only the named scenarios. Empty or absent runs all of them.
    #[serde(default)]
    pub only: Vec<String>,
    /// Stop after the first failing scenario.
    #[serde(default)]
    pub fail_fast: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: Option<String>,
    /// Log file path. Defaults to `~/.deferral/logs/deferral.log`.
    pub file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: TomlError,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

impl DeferralConfig {
    /// Load from the default location. `Ok(None)` when no config file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    /// Load from `path`. `Ok(None)` when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn turn_limit(&self) -> usize {
        self.scheduler
            .as_ref()
            .and_then(|scheduler| scheduler.turn_limit)
            .unwrap_or(DEFAULT_TURN_LIMIT)
    }

    #[must_use]
    pub fn only(&self) -> &[String] {
        self.runner
            .as_ref()
            .map_or(&[][..], |runner| runner.only.as_slice())
    }

    #[must_use]
    pub fn fail_fast(&self) -> bool {
        self.runner.as_ref().is_some_and(|runner| runner.fail_fast)
    }

    #[must_use]
    pub fn log_level(&self) -> Option<&str> {
        self.log.as_ref().and_then(|log| log.level.as_deref())
    }

    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        self.log.as_ref().and_then(|log| log.file.as_deref())
    }
}

pub fn config_path() -> Option<PathBuf> {
    resolve_config_path(env::var_os(CONFIG_PATH_ENV), dirs::home_dir())
}

fn resolve_config_path(override_path: Option<OsString>, home: Option<PathBuf>) -> Option<PathBuf> {
    match override_path {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => home.map(|home| home.join(".deferral").join("config.toml")),
    }
}
