//! One daemon of a local cluster.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use chaos_types::{DaemonArgs, Endpoint};
use tokio::process::Child;

use crate::config::DaemonConfig;

/// Whether a node bootstraps the cluster or joins it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// First member; owns the bootstrap address.
    Seed,
    /// Joins the seed via its connect address.
    Joiner,
}

impl Role {
    /// Role of the node with the given ordinal.
    pub fn for_index(index: usize) -> Self {
        if index == 0 {
            Role::Seed
        } else {
            Role::Joiner
        }
    }
}

/// A cluster member: its layout, launch arguments and process handle.
#[derive(Debug)]
pub struct ClusterNode {
    index: usize,
    role: Role,
    workdir: PathBuf,
    log_path: PathBuf,
    listen: Endpoint,
    connect: Option<Endpoint>,
    args: Vec<String>,
    pub(crate) child: Option<Child>,
    pub(crate) pid: Option<u32>,
    pub(crate) exit_status: Option<ExitStatus>,
}

impl ClusterNode {
    /// Lay out node `index` under `base`. Joiners connect to `seed`.
    pub(crate) fn plan(
        index: usize,
        base: &Path,
        daemon: &DaemonConfig,
        listen: Endpoint,
        seed: Option<&Endpoint>,
    ) -> Self {
        let workdir = node_dir(base, index);
        let log_path = workdir.join(&daemon.log_file);
        let role = Role::for_index(index);

        let daemon_args = match (role, seed) {
            (Role::Joiner, Some(seed)) => DaemonArgs::joiner(listen.clone(), seed.clone()),
            _ => DaemonArgs::seed(listen.clone()),
        };
        let connect = daemon_args.connect.clone();

        let mut args = daemon.args.clone();
        args.extend(daemon_args.to_args());

        Self {
            index,
            role,
            workdir,
            log_path,
            listen,
            connect,
            args,
            child: None,
            pid: None,
            exit_status: None,
        }
    }

    /// Ordinal of this node.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Seed or joiner.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Working directory of the daemon.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// File receiving the daemon's stdout and stderr.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Address the daemon listens on.
    pub fn listen(&self) -> &Endpoint {
        &self.listen
    }

    /// Address the daemon joins through (`None` for the seed).
    pub fn connect(&self) -> Option<&Endpoint> {
        self.connect.as_ref()
    }

    /// Arguments passed after the program name.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// OS pid of the spawned daemon.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether a process handle is still held (spawned and not torn down).
    pub fn has_process(&self) -> bool {
        self.child.is_some()
    }

    /// Exit status reaped during cleanup or readiness polling.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Return the exit status if the daemon has already exited.
    pub(crate) fn try_exited(&mut self) -> std::io::Result<Option<ExitStatus>> {
        let Some(child) = self.child.as_mut() else {
            return Ok(self.exit_status);
        };
        let status = child.try_wait()?;
        if status.is_some() {
            self.exit_status = status;
        }
        Ok(status)
    }
}

/// Working directory of node `index`: `base/daemon{index}`.
pub fn node_dir(base: &Path, index: usize) -> PathBuf {
    base.join(format!("daemon{}", index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_index_zero_is_seed() {
        assert_eq!(Role::for_index(0), Role::Seed);
        assert_eq!(Role::for_index(1), Role::Joiner);
        assert_eq!(Role::for_index(7), Role::Joiner);
    }

    #[test]
    fn joiner_plan_connects_to_seed() {
        let seed = Endpoint::new("localhost", 1982);
        let node = ClusterNode::plan(
            2,
            Path::new("/tmp/base"),
            &DaemonConfig::default(),
            Endpoint::new("localhost", 1984),
            Some(&seed),
        );

        assert_eq!(node.role(), Role::Joiner);
        assert_eq!(node.workdir(), Path::new("/tmp/base/daemon2"));
        assert_eq!(
            node.log_path(),
            Path::new("/tmp/base/daemon2/replicant-test-runner.log")
        );
        assert_eq!(node.connect(), Some(&seed));
        assert_eq!(
            node.args().join(" "),
            "daemon --foreground --listen localhost --listen-port 1984 --connect localhost --connect-port 1982"
        );
    }

    #[test]
    fn seed_plan_has_no_connect() {
        let node = ClusterNode::plan(
            0,
            Path::new("/tmp/base"),
            &DaemonConfig::default(),
            Endpoint::new("localhost", 1982),
            None,
        );
        assert_eq!(node.role(), Role::Seed);
        assert!(node.connect().is_none());
        assert!(!node.args().iter().any(|a| a == "--connect"));
        assert!(!node.has_process());
    }
}
