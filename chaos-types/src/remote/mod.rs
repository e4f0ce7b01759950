//! Remote command execution.
//!
//! A [`Connector`] opens a [`RemoteSession`] per host; the session runs
//! single-line shell commands and reports their exit status.
//!
//! # Design
//!
//! - `connect()` verifies the host is reachable before anything is launched
//! - `exec()` returns the raw result, including non-zero exits
//! - `exec_ok()` turns a non-zero exit into [`RemoteError::CommandFailed`]
//!
//! # Example
//!
//! ```ignore
//! let connector = SshConnector::new(Some("replicant".into()));
//! let session = connector.connect("10.0.0.1").await?;
//! let result = session.exec_ok("uname -a").await?;
//! ```

mod mock;
mod ssh;

pub use mock::{MockConnector, MockSession};
pub use ssh::{SshConnector, SshSession};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from remote execution.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The local transport process could not be spawned.
    #[error("ssh spawn error: {0}")]
    Spawn(#[from] std::io::Error),

    /// The host could not be reached or authenticated.
    #[error("host {host} unreachable: {reason}")]
    Unreachable {
        /// Target host.
        host: String,
        /// Transport error output.
        reason: String,
    },

    /// The remote command returned a non-zero exit code.
    #[error("command failed on {host}: exit={exit_code}, stderr={stderr}")]
    CommandFailed {
        /// Target host.
        host: String,
        /// Exit code.
        exit_code: i32,
        /// Standard error output.
        stderr: String,
    },
}

/// Result of executing a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Exit code (0 = success).
    pub exit_code: i32,
}

impl ExecResult {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// An open session to one remote host.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Host this session executes on.
    fn host(&self) -> &str;

    /// Execute a command and return the raw result.
    ///
    /// Does NOT fail on non-zero exit; use `exec_ok` for that.
    async fn exec(&self, cmd: &str) -> Result<ExecResult, RemoteError>;

    /// Execute a command, failing on non-zero exit.
    async fn exec_ok(&self, cmd: &str) -> Result<ExecResult, RemoteError> {
        let result = self.exec(cmd).await?;
        if !result.success() {
            return Err(RemoteError::CommandFailed {
                host: self.host().to_string(),
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }
        Ok(result)
    }
}

/// Opens sessions to remote hosts.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Session type produced by this connector.
    type Session: RemoteSession + 'static;

    /// Open and verify a session to `host`.
    async fn connect(&self, host: &str) -> Result<Self::Session, RemoteError>;
}
