//! Mock sessions for testing.
//!
//! Simulates remote hosts running daemons: start commands allocate pids,
//! `kill` commands track which pids are live or stopped, and failures can be
//! injected per host. Every command is recorded for verification.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::{Connector, ExecResult, RemoteError, RemoteSession};
use crate::daemon::PID_SENTINEL;

/// Mock connector; all sessions it opens share one simulated world.
#[derive(Debug, Clone)]
pub struct MockConnector {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Debug)]
struct MockInner {
    commands: Vec<(String, String)>,
    unreachable: HashSet<String>,
    failing: HashMap<String, Vec<String>>,
    start_output: HashMap<String, String>,
    next_pid: u32,
    live: HashSet<u32>,
    stopped: HashSet<u32>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    /// Create a mock world with no hosts failing.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                commands: Vec::new(),
                unreachable: HashSet::new(),
                failing: HashMap::new(),
                start_output: HashMap::new(),
                next_pid: 1000,
                live: HashSet::new(),
                stopped: HashSet::new(),
            })),
        }
    }

    /// Make `connect(host)` fail.
    pub fn set_unreachable(&self, host: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.unreachable.insert(host.to_string());
    }

    /// Make every command on `host` containing `pattern` exit non-zero.
    pub fn fail_commands_containing(&self, host: &str, pattern: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .failing
            .entry(host.to_string())
            .or_default()
            .push(pattern.to_string());
    }

    /// Remove all injected command failures.
    pub fn clear_failures(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.failing.clear();
    }

    /// Replace the output of start commands on `host` (no pid is allocated).
    pub fn set_start_output(&self, host: &str, stdout: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .start_output
            .insert(host.to_string(), stdout.to_string());
    }

    /// All `(host, command)` pairs executed so far, in order.
    pub fn commands(&self) -> Vec<(String, String)> {
        let inner = self.inner.lock().unwrap();
        inner.commands.clone()
    }

    /// Commands executed on `host`, in order.
    pub fn commands_for(&self, host: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .commands
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Whether `pid` is a running (possibly stopped) simulated daemon.
    pub fn is_live(&self, pid: u32) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.live.contains(&pid)
    }

    /// Whether `pid` is currently stopped.
    pub fn is_stopped(&self, pid: u32) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.stopped.contains(&pid)
    }

    /// Number of stopped pids.
    pub fn stopped_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.stopped.len()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Session = MockSession;

    async fn connect(&self, host: &str) -> Result<MockSession, RemoteError> {
        let inner = self.inner.lock().unwrap();
        if inner.unreachable.contains(host) {
            return Err(RemoteError::Unreachable {
                host: host.to_string(),
                reason: "Connection refused".to_string(),
            });
        }

        Ok(MockSession {
            host: host.to_string(),
            inner: Arc::clone(&self.inner),
        })
    }
}

/// Session onto one simulated host.
#[derive(Debug, Clone)]
pub struct MockSession {
    host: String,
    inner: Arc<Mutex<MockInner>>,
}

impl MockInner {
    fn run(&mut self, host: &str, cmd: &str) -> ExecResult {
        self.commands.push((host.to_string(), cmd.to_string()));

        let injected = self
            .failing
            .get(host)
            .is_some_and(|patterns| patterns.iter().any(|p| cmd.contains(p.as_str())));
        if injected {
            return failure("injected failure");
        }

        if cmd.contains(PID_SENTINEL) {
            if let Some(stdout) = self.start_output.get(host) {
                return ExecResult {
                    stdout: stdout.clone(),
                    ..Default::default()
                };
            }
            let pid = self.next_pid;
            self.next_pid += 1;
            self.live.insert(pid);
            return ExecResult {
                stdout: format!("{}{}\n", PID_SENTINEL, pid),
                ..Default::default()
            };
        }

        if let Some(rest) = cmd.strip_prefix("kill ") {
            let mut parts = rest.split_whitespace();
            let flag = parts.next().unwrap_or_default();
            let Some(pid) = parts.next().and_then(|p| p.parse::<u32>().ok()) else {
                return failure("kill: usage");
            };
            if !self.live.contains(&pid) {
                return failure(&format!("kill: ({}) - No such process", pid));
            }
            match flag {
                "-STOP" => {
                    self.stopped.insert(pid);
                }
                "-CONT" => {
                    self.stopped.remove(&pid);
                }
                "-KILL" => {
                    self.live.remove(&pid);
                    self.stopped.remove(&pid);
                }
                _ => {}
            }
        }

        ExecResult::default()
    }
}

fn failure(stderr: &str) -> ExecResult {
    ExecResult {
        stdout: String::new(),
        stderr: stderr.to_string(),
        exit_code: 1,
    }
}

#[async_trait]
impl RemoteSession for MockSession {
    fn host(&self) -> &str {
        &self.host
    }

    async fn exec(&self, cmd: &str) -> Result<ExecResult, RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.run(&self.host, cmd))
    }
}
