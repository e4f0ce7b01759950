//! Local cluster lifecycle.
//!
//! [`ClusterHarness`] lays out one working directory per node, launches the
//! daemons with seed/joiner topology, waits until they accept connections,
//! and tears everything down again. Teardown is unconditional and
//! best-effort: it runs after partial setups and never fails.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use chaos_types::Endpoint;
use tokio::process::Command;

use crate::config::Config;
use crate::error::{HarnessError, Result};
use crate::node::{node_dir, ClusterNode, Role};
use crate::readiness;
use crate::template::TemplateContext;

/// A local multi-node cluster owned by one test run.
///
/// The base directory is exclusively owned by this harness; two harnesses
/// must never share one.
#[derive(Debug)]
pub struct ClusterHarness {
    config: Config,
    base: Option<PathBuf>,
    exec_path: PathBuf,
    nodes: Vec<ClusterNode>,
    /// Set once the collision check passed; only then may cleanup delete `base`.
    laid_out: bool,
}

impl ClusterHarness {
    /// Create a harness; nothing touches the filesystem until `setup()`.
    pub fn new(config: Config) -> Self {
        let base = config.cluster.base.clone();
        let exec_path = config
            .cluster
            .exec_path
            .clone()
            .unwrap_or_else(default_exec_path);

        Self {
            config,
            base,
            exec_path,
            nodes: Vec::new(),
            laid_out: false,
        }
    }

    /// Base directory (generated by `setup()` if none was configured).
    pub fn base(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    /// Directory exposed to daemons and test commands as the harness location.
    pub fn exec_path(&self) -> &Path {
        &self.exec_path
    }

    /// Nodes spawned so far, in index order.
    pub fn nodes(&self) -> &[ClusterNode] {
        &self.nodes
    }

    /// The seed node, once spawned.
    pub fn seed(&self) -> Option<&ClusterNode> {
        self.nodes.iter().find(|n| n.role() == Role::Seed)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Lay out working directories and spawn every daemon.
    ///
    /// All node directories are checked before anything is spawned, so a
    /// collision with a previous run fails with [`HarnessError::Precondition`]
    /// and zero processes. Each spawned child is tracked immediately, so a
    /// failure later in the loop still leaves earlier daemons to `cleanup()`.
    /// Does not wait for the daemons to become ready.
    pub async fn setup(&mut self) -> Result<()> {
        if !self.nodes.is_empty() {
            return Err(HarnessError::AlreadySetUp);
        }

        let base = match &self.base {
            Some(base) => base.clone(),
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("replicant-test-")
                    .tempdir()?
                    .keep();
                self.base = Some(dir.clone());
                dir
            }
        };
        tokio::fs::create_dir_all(&base).await?;

        let replicants = self.config.cluster.replicants;
        for index in 0..replicants {
            let dir = node_dir(&base, index);
            if tokio::fs::try_exists(&dir).await? {
                return Err(HarnessError::Precondition { path: dir });
            }
        }
        self.laid_out = true;

        let path_env = augmented_path(&self.exec_path)?;
        let daemon = self.config.daemon.clone();
        let mut seed: Option<Endpoint> = None;

        for index in 0..replicants {
            let port = u16::try_from(index)
                .ok()
                .and_then(|offset| daemon.base_port.checked_add(offset))
                .ok_or(HarnessError::PortRange {
                    index,
                    base_port: daemon.base_port,
                })?;
            let listen = Endpoint::new(daemon.listen_host.clone(), port);
            let mut node = ClusterNode::plan(index, &base, &daemon, listen, seed.as_ref());

            tokio::fs::create_dir(node.workdir()).await?;
            let log = std::fs::File::create(node.log_path())?;
            let log_err = log.try_clone()?;

            let mut cmd = Command::new(&daemon.program);
            cmd.args(node.args())
                .current_dir(node.workdir())
                .stdin(Stdio::null())
                .stdout(log)
                .stderr(log_err)
                .kill_on_drop(true);
            self.apply_env(&mut cmd, &path_env);

            let child = cmd
                .spawn()
                .map_err(|source| HarnessError::Spawn { index, source })?;
            node.pid = child.id();
            node.child = Some(child);

            tracing::info!(
                "Started daemon {} ({:?}) on {} pid={:?}",
                index,
                node.role(),
                node.listen(),
                node.pid()
            );

            if node.role() == Role::Seed {
                seed = Some(node.listen().clone());
            }
            self.nodes.push(node);
        }

        Ok(())
    }

    /// Block until every node accepts connections, then settle.
    ///
    /// With readiness disabled only the settle delay remains, which is a
    /// coarse approximation: a joiner may still be mid-join afterwards.
    pub async fn wait_ready(&mut self) -> Result<()> {
        let readiness = self.config.readiness.clone();

        if readiness.enabled {
            readiness::wait_for_listeners(&mut self.nodes, &readiness).await?;
            if readiness.availability_check {
                self.availability_check().await?;
            }
        }

        if readiness.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(readiness.settle_ms)).await;
        }

        Ok(())
    }

    /// Run the daemon's own availability check against the seed.
    ///
    /// `<program> availability-check --servers N --timeout S --host H --port P`
    pub async fn availability_check(&self) -> Result<()> {
        let seed = self
            .seed()
            .ok_or_else(|| HarnessError::AvailabilityCheck("no seed node".into()))?;
        let path_env = augmented_path(&self.exec_path)?;

        let mut cmd = Command::new(&self.config.daemon.program);
        cmd.args([
            "availability-check",
            "--servers",
            &self.nodes.len().to_string(),
            "--timeout",
            &self.config.readiness.timeout_secs.to_string(),
            "--host",
            &seed.listen().host,
            "--port",
            &seed.listen().port.to_string(),
        ])
        .stdin(Stdio::null());
        self.apply_env(&mut cmd, &path_env);

        let output = cmd.output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HarnessError::AvailabilityCheck(format!(
                "{}: {}",
                output.status,
                stderr.trim()
            )));
        }

        tracing::info!("Availability check passed for {} servers", self.nodes.len());
        Ok(())
    }

    /// Force-kill and reap every tracked daemon; optionally delete the base.
    ///
    /// Idempotent and infallible: kill, wait and remove errors are logged
    /// and swallowed so nothing is left behind holding ports or locks. The
    /// base is only deleted when this harness laid out its node directories,
    /// so a `Precondition` failure leaves the earlier run's state intact.
    pub async fn cleanup(&mut self) {
        for node in &mut self.nodes {
            let Some(mut child) = node.child.take() else {
                continue;
            };

            if let Err(e) = child.start_kill() {
                tracing::debug!("kill daemon {}: {}", node.index(), e);
            }
            match child.wait().await {
                Ok(status) => {
                    tracing::debug!("Daemon {} exited: {}", node.index(), status);
                    node.exit_status = Some(status);
                }
                Err(e) => tracing::warn!("wait for daemon {} failed: {}", node.index(), e),
            }
        }

        if self.config.cluster.clean && self.laid_out {
            if let Some(base) = &self.base {
                match tokio::fs::remove_dir_all(base).await {
                    Ok(()) => tracing::info!("Removed {}", base.display()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => tracing::warn!("remove {} failed: {}", base.display(), e),
                }
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Substitutions for the test command: `{PATH}`, `{HOST}`, `{PORT}`.
    pub fn template_context(&self) -> Option<TemplateContext> {
        let seed = self.seed()?;
        Some(TemplateContext::new(
            self.exec_path.display().to_string(),
            seed.listen().host.clone(),
            seed.listen().port,
        ))
    }

    /// Environment shared by daemons and helper tools.
    fn apply_env(&self, cmd: &mut Command, path_env: &OsString) {
        cmd.env("GLOG_logtostderr", "")
            .env("GLOG_minloglevel", "0")
            .env("REPLICANT_EXEC_PATH", &self.exec_path)
            .env("PATH", path_env)
            .envs(&self.config.daemon.env);
    }
}

/// Directory containing the running executable.
fn default_exec_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// The inherited PATH with `exec_path` appended.
fn augmented_path(exec_path: &Path) -> Result<OsString> {
    let mut paths: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|p| {
            std::env::split_paths(&p)
                .filter(|dir| !dir.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default();
    paths.push(exec_path.to_path_buf());

    std::env::join_paths(paths)
        .map_err(|e| HarnessError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))
}
