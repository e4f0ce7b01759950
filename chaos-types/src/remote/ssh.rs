//! ssh-backed sessions.
//!
//! Uses `tokio::process::Command` to shell out to `ssh`. Keys must be
//! pre-configured; unknown host keys are accepted automatically, which is
//! only acceptable on throwaway test machines.

use async_trait::async_trait;
use std::process::Stdio;

use super::{Connector, ExecResult, RemoteError, RemoteSession};

/// Exit code `ssh` reserves for its own connection errors.
const SSH_TRANSPORT_FAILURE: i32 = 255;

/// Default connection timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Opens [`SshSession`]s as a fixed user.
#[derive(Debug, Clone)]
pub struct SshConnector {
    user: Option<String>,
    connect_timeout_secs: u64,
}

impl SshConnector {
    /// Connector for `user` (`None` uses the local ssh configuration).
    pub fn new(user: Option<String>) -> Self {
        Self {
            user,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }

    /// Set the ssh `ConnectTimeout`.
    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }
}

#[async_trait]
impl Connector for SshConnector {
    type Session = SshSession;

    async fn connect(&self, host: &str) -> Result<SshSession, RemoteError> {
        let session = SshSession {
            host: host.to_string(),
            user: self.user.clone(),
            connect_timeout_secs: self.connect_timeout_secs,
        };

        let check = session.exec("true").await?;
        if !check.success() {
            return Err(RemoteError::Unreachable {
                host: host.to_string(),
                reason: check.stderr.trim().to_string(),
            });
        }

        tracing::debug!("ssh session to {} verified", session.destination());
        Ok(session)
    }
}

/// A verified ssh destination.
#[derive(Debug, Clone)]
pub struct SshSession {
    host: String,
    user: Option<String>,
    connect_timeout_secs: u64,
}

impl SshSession {
    /// `user@host`, or just `host` without a configured user.
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    fn host(&self) -> &str {
        &self.host
    }

    async fn exec(&self, cmd: &str) -> Result<ExecResult, RemoteError> {
        let output = tokio::process::Command::new("ssh")
            .args([
                "-o",
                "StrictHostKeyChecking=no",
                "-o",
                &format!("ConnectTimeout={}", self.connect_timeout_secs),
                "-o",
                "BatchMode=yes",
                &self.destination(),
                cmd,
            ])
            .stdin(Stdio::null())
            .output()
            .await?;

        let result = ExecResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        };

        if result.exit_code == SSH_TRANSPORT_FAILURE {
            return Err(RemoteError::Unreachable {
                host: self.host.clone(),
                reason: result.stderr.trim().to_string(),
            });
        }

        Ok(result)
    }
}
