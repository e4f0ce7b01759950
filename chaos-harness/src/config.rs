//! Configuration loading for the cluster harness.
//!
//! Configuration is optionally loaded from a TOML file; every section and
//! field has a default, and the CLI overrides what the file sets.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration for the harness.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Cluster shape and filesystem layout.
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// How daemons are launched.
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Readiness barrier before the test command runs.
    #[serde(default)]
    pub readiness: ReadinessConfig,
}

/// Cluster configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    /// Number of daemons to launch (default: 1).
    #[serde(default = "default_replicants")]
    pub replicants: usize,
    /// Base directory for per-node state (default: fresh temp dir).
    pub base: Option<PathBuf>,
    /// Delete the base directory on cleanup (default: false).
    #[serde(default)]
    pub clean: bool,
    /// Directory added to the daemons' PATH and exposed as `{PATH}`
    /// (default: directory of the harness executable).
    pub exec_path: Option<PathBuf>,
}

/// Daemon launch configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Program to execute, looked up on the augmented PATH (default: `replicant`).
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before the daemon flags (default: `["daemon"]`).
    #[serde(default = "default_program_args")]
    pub args: Vec<String>,
    /// Host every node listens on (default: `localhost`).
    #[serde(default = "default_listen_host")]
    pub listen_host: String,
    /// Port of the seed; node `i` listens on `base_port + i` (default: 1982).
    #[serde(default = "default_base_port")]
    pub base_port: u16,
    /// Per-node log file name inside its working directory.
    #[serde(default = "default_log_file")]
    pub log_file: String,
    /// Extra environment variables for every daemon.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Readiness barrier configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadinessConfig {
    /// Poll each node's listen port before running the test (default: true).
    #[serde(default = "default_readiness_enabled")]
    pub enabled: bool,
    /// Give up after this many seconds (default: 10).
    #[serde(default = "default_readiness_timeout")]
    pub timeout_secs: u64,
    /// Delay between polling rounds in milliseconds (default: 100).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Run `<program> availability-check` once ports accept (default: false).
    #[serde(default)]
    pub availability_check: bool,
    /// Extra grace period after readiness in milliseconds (default: 1000).
    #[serde(default = "default_settle")]
    pub settle_ms: u64,
}

// Default value functions
fn default_replicants() -> usize {
    1
}

fn default_program() -> String {
    "replicant".to_string()
}

fn default_program_args() -> Vec<String> {
    vec!["daemon".to_string()]
}

fn default_listen_host() -> String {
    "localhost".to_string()
}

fn default_base_port() -> u16 {
    chaos_types::DEFAULT_PORT
}

fn default_log_file() -> String {
    "replicant-test-runner.log".to_string()
}

fn default_readiness_enabled() -> bool {
    true
}

fn default_readiness_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    100
}

fn default_settle() -> u64 {
    1000
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            replicants: default_replicants(),
            base: None,
            clean: false,
            exec_path: None,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_program_args(),
            listen_host: default_listen_host(),
            base_port: default_base_port(),
            log_file: default_log_file(),
            env: BTreeMap::new(),
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            enabled: default_readiness_enabled(),
            timeout_secs: default_readiness_timeout(),
            poll_interval_ms: default_poll_interval(),
            availability_check: false,
            settle_ms: default_settle(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
