//! Election configuration with TOML file support.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ballot_utils::LogFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Settings for one election's data directory.
///
/// Loaded from a TOML file via [`ElectionConfig::from_toml_file`]; command
/// line flags and `BALLOT_*` variables override individual fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Maximum LMDB map size, in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Name stored by `init`.
    #[serde(default = "default_election_name")]
    pub election_name: String,

    /// Owner address stored by `init`.
    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Filter directive: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Deadline for each operation, in milliseconds. 0 disables it.
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./ballot_data")
}

fn default_map_size_mb() -> usize {
    256
}

fn default_election_name() -> String {
    "Election".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_op_timeout_ms() -> u64 {
    5_000
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ElectionConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn op_timeout(&self) -> Option<Duration> {
        (self.op_timeout_ms > 0).then(|| Duration::from_millis(self.op_timeout_ms))
    }
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            election_name: default_election_name(),
            owner: None,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}
