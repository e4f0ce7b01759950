//! Error types for the fault-injection controller.

use chaos_types::RemoteError;

/// Main error type for controller operations.
#[derive(Debug, thiserror::Error)]
pub enum KillerError {
    /// A remote session could not be established.
    #[error("unable to connect to host {host}: {source}")]
    Connection {
        /// Target host.
        host: String,
        /// Underlying remote error.
        source: RemoteError,
    },

    /// The daemon could not be launched or its pid not confirmed.
    #[error("daemon startup failed on {host}: {reason}")]
    Startup {
        /// Target host.
        host: String,
        /// What went wrong.
        reason: String,
    },

    /// A pause, resume or kill command failed on the remote end.
    #[error("{action} failed on {host}: {source}")]
    FaultCommand {
        /// Target host.
        host: String,
        /// Fault primitive that failed.
        action: &'static str,
        /// Underlying remote error.
        source: RemoteError,
    },

    /// The operation is not valid in the target's current state.
    #[error("cannot {action} {host} while {state}")]
    InvalidState {
        /// Target host.
        host: String,
        /// Attempted operation.
        action: &'static str,
        /// Current state of the target.
        state: String,
    },

    /// Unknown target index.
    #[error("no target with index {0}")]
    UnknownTarget(usize),

    /// Invalid controller configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Result type alias for controller operations.
pub type Result<T> = std::result::Result<T, KillerError>;
