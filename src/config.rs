use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DATA_DIR_ENV: &str = "WAYFINDER_DATA_DIR";
const TIME_SCALE_ENV: &str = "WAYFINDER_TIME_SCALE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Simulated latencies, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationTimings {
    pub acquisition_ms: u64,
    pub entry_scan_ms: u64,
    pub precision_scan_ms: u64,
    pub checkpoint_scan_ms: u64,
    pub path_calculation_ms: u64,
}

impl Default for SimulationTimings {
    fn default() -> Self {
        Self {
            acquisition_ms: 1_000,
            entry_scan_ms: 2_000,
            precision_scan_ms: 2_000,
            checkpoint_scan_ms: 2_000,
            path_calculation_ms: 2_500,
        }
    }
}

impl SimulationTimings {
    pub fn acquisition(&self) -> Duration {
        Duration::from_millis(self.acquisition_ms)
    }

    pub fn path_calculation(&self) -> Duration {
        Duration::from_millis(self.path_calculation_ms)
    }

    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |ms: u64| (ms as f64 * factor).round().max(0.0) as u64;
        Self {
            acquisition_ms: scale(self.acquisition_ms),
            entry_scan_ms: scale(self.entry_scan_ms),
            precision_scan_ms: scale(self.precision_scan_ms),
            checkpoint_scan_ms: scale(self.checkpoint_scan_ms),
            path_calculation_ms: scale(self.path_calculation_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavConfig {
    pub timings: SimulationTimings,
    /// Progress value set when the user confirms an intermediate checkpoint.
    pub checkpoint_progress: u8,
    /// Progress at or above which the session counts as arrived.
    pub completion_threshold: u8,
    pub data_dir: Option<PathBuf>,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            timings: SimulationTimings::default(),
            checkpoint_progress: 75,
            completion_threshold: 99,
            data_dir: None,
        }
    }
}

impl NavConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path` when given, then applies `WAYFINDER_*` overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.with_env_overrides(|name| env::var(name).ok())
    }

    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|value| !value.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(value) = lookup(TIME_SCALE_ENV) {
            let factor: f64 = value
                .trim()
                .parse()
                .ok()
                .filter(|factor: &f64| factor.is_finite() && *factor >= 0.0)
                .ok_or(ConfigError::InvalidEnv {
                    name: TIME_SCALE_ENV,
                    value: value.clone(),
                })?;
            self.timings = self.timings.scaled(factor);
        }
        Ok(self)
    }
}
