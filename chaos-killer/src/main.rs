//! # replicant-serial-killer
//!
//! Launch Replicant daemons on remote hosts over ssh, then pause or kill
//! random daemons at a fixed interval until interrupted.
//!
//! ## Example
//!
//! ```bash
//! # Pause one of three daemons for 5s every 30s
//! replicant-serial-killer --hosts 10.0.0.1:1982 10.0.0.2:1982 10.0.0.3:1982 \
//!     --user replicant --interval 30 --duration 5
//!
//! # Kill and restart two at a time, reproducibly
//! replicant-serial-killer --hosts a:1982 b:1982 c:1982 --count 2 --sigkill --seed 7
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chaos_types::remote::SshConnector;
use chaos_types::Endpoint;
use replicant_chaos_killer::{AttachSpec, Config, FaultController};

/// Inject process faults into a remote Replicant cluster.
#[derive(Parser, Debug)]
#[command(name = "replicant-serial-killer")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Daemon endpoints (host:port); the first bootstraps the cluster
    #[arg(long, num_args = 1..)]
    hosts: Vec<Endpoint>,

    /// ssh user
    #[arg(long)]
    user: Option<String>,

    /// Path to the daemon binary on each host
    #[arg(long)]
    path: Option<String>,

    /// Track an already running daemon (host:port=pid) instead of launching one
    #[arg(long, value_name = "HOST:PORT=PID")]
    attach: Vec<AttachSpec>,

    /// Remote work directory (default: /tmp/replicant-chaos-<id>)
    #[arg(long)]
    workdir: Option<String>,

    /// Seconds between fault rounds
    #[arg(long)]
    interval: Option<u64>,

    /// Seconds each fault is held
    #[arg(long)]
    duration: Option<u64>,

    /// Daemons faulted per round
    #[arg(long)]
    count: Option<usize>,

    /// Kill and restart instead of pause and resume
    #[arg(long)]
    sigkill: bool,

    /// Stop after this many rounds
    #[arg(long)]
    rounds: Option<u64>,

    /// Seed for the victim RNG
    #[arg(long)]
    seed: Option<u64>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    /// Load the config file (if any) and apply command-line overrides.
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => Config::default(),
        };

        if !self.hosts.is_empty() {
            config.targets.hosts = self.hosts;
        }
        if self.user.is_some() {
            config.targets.user = self.user;
        }
        if let Some(path) = self.path {
            config.targets.path = path;
        }
        if !self.attach.is_empty() {
            config.targets.attach = self.attach;
        }
        if self.workdir.is_some() {
            config.targets.workdir = self.workdir;
        }
        if let Some(interval) = self.interval {
            config.faults.interval_secs = interval;
        }
        if let Some(duration) = self.duration {
            config.faults.duration_secs = duration;
        }
        if let Some(count) = self.count {
            config.faults.count = count;
        }
        if self.sigkill {
            config.faults.sigkill = true;
        }
        if self.rounds.is_some() {
            config.faults.rounds = self.rounds;
        }
        if self.seed.is_some() {
            config.faults.seed = self.seed;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.into_config()?;
    let connector = SshConnector::new(config.targets.user.clone())
        .connect_timeout_secs(config.targets.connect_timeout_secs);
    let mut controller = FaultController::from_config(connector, &config)?;
    info!(workdir = %controller.workdir(), "Remote work directory");

    controller
        .bring_up(&config.targets.attach)
        .await
        .context("Failed to bring up targets")?;

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, finishing current round");
                let _ = stop_tx.send(true);
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    let outcome = controller.run(stop_rx).await;
    controller.shutdown().await;

    let summary = outcome.context("Fault injection aborted")?;
    info!(rounds = summary.rounds, seed = controller.seed(), "Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use replicant_chaos_killer::FaultKind;

    #[test]
    fn defaults_match_documented_values() {
        let cli = Cli::parse_from(["replicant-serial-killer"]);
        let config = cli.into_config().unwrap();
        assert_eq!(
            config.targets.hosts,
            vec![
                Endpoint::new("127.0.0.1", 1982),
                Endpoint::new("127.0.0.2", 1982)
            ]
        );
        assert_eq!(config.targets.path, "~/replicant/replicant-daemon");
        assert_eq!(config.faults.interval_secs, 10);
        assert_eq!(config.faults.duration_secs, 0);
        assert_eq!(config.faults.count, 1);
        assert_eq!(config.faults.kind(), FaultKind::Suspend);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "replicant-serial-killer",
            "--hosts",
            "a:1982",
            "b:1983",
            "c",
            "--user",
            "roybatty",
            "--count",
            "2",
            "--sigkill",
            "--seed",
            "7",
            "--rounds",
            "5",
        ]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.targets.hosts.len(), 3);
        assert_eq!(config.targets.hosts[2], Endpoint::new("c", 1982));
        assert_eq!(config.targets.user.as_deref(), Some("roybatty"));
        assert_eq!(config.faults.count, 2);
        assert_eq!(config.faults.kind(), FaultKind::Kill);
        assert_eq!(config.faults.seed, Some(7));
        assert_eq!(config.faults.rounds, Some(5));
    }

    #[test]
    fn count_above_hosts_rejected() {
        let cli = Cli::parse_from(["replicant-serial-killer", "--count", "3"]);
        assert!(cli.into_config().is_err());
    }

    #[test]
    fn attach_flag_reaches_config() {
        let cli = Cli::parse_from([
            "replicant-serial-killer",
            "--attach",
            "127.0.0.2:1982=4242",
        ]);
        let config = cli.into_config().unwrap();
        assert_eq!(
            config.targets.attach,
            vec![AttachSpec {
                listen: Endpoint::new("127.0.0.2", 1982),
                pid: 4242
            }]
        );
    }

    #[test]
    fn attach_to_unlisted_host_rejected() {
        let cli = Cli::parse_from(["replicant-serial-killer", "--attach", "10.9.9.9:1982=1"]);
        assert!(cli.into_config().is_err());
    }

    #[test]
    fn bad_endpoint_rejected_by_parser() {
        let parsed = Cli::try_parse_from(["replicant-serial-killer", "--hosts", "a:port"]);
        assert!(parsed.is_err());
    }
}
