//! Error types for the cluster harness.

use std::path::PathBuf;
use std::process::ExitStatus;

use chaos_types::Endpoint;

/// Errors that can occur while running a local cluster.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// A node working directory already exists (dirty or reused environment).
    #[error("environment already exists (at least partially): {path}")]
    Precondition {
        /// The colliding directory.
        path: PathBuf,
    },

    /// `setup()` was called on a harness that already has nodes.
    #[error("cluster already set up")]
    AlreadySetUp,

    /// A node's listen port would fall outside the u16 range.
    #[error("port for node {index} out of range (base port {base_port})")]
    PortRange {
        /// Node index.
        index: usize,
        /// Configured base port.
        base_port: u16,
    },

    /// A daemon process could not be spawned.
    #[error("failed to spawn daemon {index}: {source}")]
    Spawn {
        /// Node index.
        index: usize,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A node did not accept connections before the readiness timeout.
    #[error("node at {endpoint} not ready before timeout")]
    NotReady {
        /// First endpoint still not accepting connections.
        endpoint: Endpoint,
    },

    /// A daemon exited while the cluster was still starting.
    #[error("daemon {index} exited during startup: {status}")]
    Exited {
        /// Node index.
        index: usize,
        /// Exit status of the daemon.
        status: ExitStatus,
    },

    /// The daemon's availability check failed.
    #[error("availability check failed: {0}")]
    AvailabilityCheck(String),

    /// The test command template could not be rendered.
    #[error("invalid command template: {0}")]
    Template(String),

    /// The test command could not be started.
    #[error("failed to run test command {program}: {source}")]
    TestCommand {
        /// Program of the test command.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
