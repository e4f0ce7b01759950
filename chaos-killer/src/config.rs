//! Configuration loading for the fault-injection controller.
//!
//! Configuration is optionally loaded from a TOML file (typically
//! `serial-killer.toml`); CLI flags override file values.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chaos_types::Endpoint;

/// Root configuration for the controller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Where the daemons run and how to reach them.
    #[serde(default)]
    pub targets: TargetsConfig,
    /// Fault schedule.
    #[serde(default)]
    pub faults: FaultConfig,
}

/// Remote target configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetsConfig {
    /// Daemon endpoints; the first one bootstraps, the rest join it.
    #[serde(default = "default_hosts")]
    pub hosts: Vec<Endpoint>,
    /// ssh user (default: local ssh configuration).
    pub user: Option<String>,
    /// Path to the daemon binary on every host.
    #[serde(default = "default_path")]
    pub path: String,
    /// Remote directory for daemon state and logs (default: unique per run).
    pub workdir: Option<String>,
    /// ssh connection timeout in seconds (default: 30).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Delay before confirming a launched pid is alive, in ms (default: 200).
    #[serde(default = "default_startup_grace")]
    pub startup_grace_ms: u64,
    /// Daemons already running, tracked instead of launched.
    #[serde(default)]
    pub attach: Vec<AttachSpec>,
}

/// An already running daemon, written `host:port=pid`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct AttachSpec {
    /// Target the daemon listens on.
    pub listen: Endpoint,
    /// Its process id on that host.
    pub pid: u32,
}

impl FromStr for AttachSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (listen, pid) = s
            .rsplit_once('=')
            .ok_or_else(|| format!("expected host:port=pid, got {:?}", s))?;
        let listen = listen.parse::<Endpoint>().map_err(|e| e.to_string())?;
        let pid = pid
            .parse::<u32>()
            .ok()
            .filter(|pid| *pid > 0)
            .ok_or_else(|| format!("invalid pid in {:?}", s))?;
        Ok(Self { listen, pid })
    }
}

impl TryFrom<String> for AttachSpec {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for AttachSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.listen, self.pid)
    }
}

/// Which fault a round applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// SIGSTOP, dwell, SIGCONT.
    Suspend,
    /// SIGKILL, dwell, relaunch.
    Kill,
}

impl FaultKind {
    /// Verb used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::Suspend => "pause",
            FaultKind::Kill => "kill",
        }
    }
}

/// Fault schedule configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FaultConfig {
    /// Seconds between fault rounds (default: 10).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Seconds a fault is held before it is reversed (default: 0).
    #[serde(default)]
    pub duration_secs: u64,
    /// Victims per round (default: 1).
    #[serde(default = "default_count")]
    pub count: usize,
    /// Kill and restart instead of suspend and resume (default: false).
    #[serde(default)]
    pub sigkill: bool,
    /// Stop after this many rounds (default: run until interrupted).
    pub rounds: Option<u64>,
    /// RNG seed for reproducible victim sequences (default: random).
    pub seed: Option<u64>,
}

impl FaultConfig {
    /// Fault applied each round.
    pub fn kind(&self) -> FaultKind {
        if self.sigkill {
            FaultKind::Kill
        } else {
            FaultKind::Suspend
        }
    }

    /// Time between rounds.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Dwell time of each fault.
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

// Default value functions
fn default_hosts() -> Vec<Endpoint> {
    vec![
        Endpoint::new("127.0.0.1", chaos_types::DEFAULT_PORT),
        Endpoint::new("127.0.0.2", chaos_types::DEFAULT_PORT),
    ]
}

fn default_path() -> String {
    "~/replicant/replicant-daemon".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_startup_grace() -> u64 {
    200
}

fn default_interval() -> u64 {
    10
}

fn default_count() -> usize {
    1
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            user: None,
            path: default_path(),
            workdir: None,
            connect_timeout_secs: default_connect_timeout(),
            startup_grace_ms: default_startup_grace(),
            attach: Vec::new(),
        }
    }
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            duration_secs: 0,
            count: default_count(),
            sigkill: false,
            rounds: None,
            seed: None,
        }
    }
}

impl TargetsConfig {
    /// Configured work directory, or a fresh `/tmp/replicant-chaos-<id>`.
    pub fn workdir_or_unique(&self) -> String {
        self.workdir.clone().unwrap_or_else(|| {
            let id = uuid::Uuid::new_v4().as_simple().to_string();
            format!("/tmp/replicant-chaos-{}", &id[..12])
        })
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

    /// Check the schedule against the target list.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.targets.hosts.is_empty() {
            return Err(crate::error::KillerError::InvalidConfig(
                "at least one host is required".into(),
            ));
        }
        if self.faults.count > self.targets.hosts.len() {
            return Err(crate::error::KillerError::InvalidConfig(format!(
                "count {} exceeds {} targets",
                self.faults.count,
                self.targets.hosts.len()
            )));
        }
        if let Some(spec) = self
            .targets
            .attach
            .iter()
            .find(|spec| !self.targets.hosts.contains(&spec.listen))
        {
            return Err(crate::error::KillerError::InvalidConfig(format!(
                "attach target {} is not in the host list",
                spec.listen
            )));
        }
        Ok(())
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
