//! One remote daemon under fault injection.

use std::fmt;

use chaos_types::{DaemonArgs, Endpoint, RemoteSession};

use crate::error::{KillerError, Result};

/// Lifecycle of a remote target.
///
/// ```text
/// Disconnected --connect--> Connected --start--> Running --pause--> Paused
///                               ^                  |  ^               |
///                               +------kill--------+  +----resume-----+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// No session yet.
    Disconnected,
    /// Session open, no daemon tracked.
    Connected,
    /// Daemon running with this pid.
    Running {
        /// Remote process id.
        pid: u32,
    },
    /// Daemon stopped by SIGSTOP.
    Paused {
        /// Remote process id.
        pid: u32,
    },
}

impl TargetState {
    /// Pid of the tracked daemon, if any.
    pub fn pid(&self) -> Option<u32> {
        match self {
            TargetState::Running { pid } | TargetState::Paused { pid } => Some(*pid),
            _ => None,
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetState::Disconnected => f.write_str("disconnected"),
            TargetState::Connected => f.write_str("connected"),
            TargetState::Running { pid } => write!(f, "running (pid {})", pid),
            TargetState::Paused { pid } => write!(f, "paused (pid {})", pid),
        }
    }
}

/// A daemon on a remote host, plus the session used to control it.
pub struct RemoteTarget<S> {
    listen: Endpoint,
    path: String,
    args: DaemonArgs,
    session: Option<S>,
    state: TargetState,
}

impl<S: RemoteSession> RemoteTarget<S> {
    pub(crate) fn new(listen: Endpoint, path: String, args: DaemonArgs) -> Self {
        Self {
            listen,
            path,
            args,
            session: None,
            state: TargetState::Disconnected,
        }
    }

    /// Address the daemon listens on; its host is the ssh destination.
    pub fn listen(&self) -> &Endpoint {
        &self.listen
    }

    /// Host name.
    pub fn host(&self) -> &str {
        &self.listen.host
    }

    /// Path to the daemon binary on the host.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Arguments the daemon is launched with.
    pub fn args(&self) -> &DaemonArgs {
        &self.args
    }

    /// Current state.
    pub fn state(&self) -> TargetState {
        self.state
    }

    /// Pid of the tracked daemon, if any.
    pub fn pid(&self) -> Option<u32> {
        self.state.pid()
    }

    pub(crate) fn attach_session(&mut self, session: S) {
        self.session = Some(session);
        self.state = TargetState::Connected;
    }

    pub(crate) fn set_state(&mut self, state: TargetState) {
        self.state = state;
    }

    pub(crate) fn session(&self, action: &'static str) -> Result<&S> {
        self.session.as_ref().ok_or_else(|| self.invalid(action))
    }

    pub(crate) fn invalid(&self, action: &'static str) -> KillerError {
        KillerError::InvalidState {
            host: self.listen.host.clone(),
            action,
            state: self.state.to_string(),
        }
    }
}

impl<S> fmt::Debug for RemoteTarget<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTarget")
            .field("listen", &self.listen)
            .field("path", &self.path)
            .field("connected", &self.session.is_some())
            .field("state", &self.state)
            .finish()
    }
}
