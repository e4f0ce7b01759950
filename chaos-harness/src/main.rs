//! # replicant-test-runner
//!
//! Boot a local Replicant cluster, run a test command against it, tear it
//! down, and exit with the test command's status.
//!
//! ## Example
//!
//! ```bash
//! # Three daemons on localhost:1982-1984, then run a client test
//! replicant-test-runner --replicants 3 --clean -- \
//!     {PATH}/test/replicant-lock-test --host {HOST} --port {PORT}
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use replicant_chaos_harness::{runner, Config};

/// Run a test command against a local Replicant cluster.
#[derive(Parser, Debug)]
#[command(name = "replicant-test-runner")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Number of daemons to launch
    #[arg(long)]
    replicants: Option<usize>,

    /// Delete the base directory on exit
    #[arg(long)]
    clean: bool,

    /// Base directory for per-node state (default: fresh temp dir)
    #[arg(long)]
    base: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip polling the daemons' ports; only the settle delay remains
    #[arg(long)]
    no_readiness: bool,

    /// Run the daemon's availability check before the test command
    #[arg(long)]
    availability_check: bool,

    /// Grace period after readiness, in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(long, short)]
    verbose: bool,

    /// Test command; `{PATH}`, `{HOST}` and `{PORT}` are substituted
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Cli {
    /// Load the config file (if any) and apply command-line overrides.
    fn into_config(self) -> Result<(Config, Vec<String>)> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(replicants) = self.replicants {
            config.cluster.replicants = replicants;
        }
        if self.clean {
            config.cluster.clean = true;
        }
        if let Some(base) = self.base {
            config.cluster.base = Some(base);
        }
        if self.no_readiness {
            config.readiness.enabled = false;
        }
        if self.availability_check {
            config.readiness.availability_check = true;
        }
        if let Some(settle_ms) = self.settle_ms {
            config.readiness.settle_ms = settle_ms;
        }

        if config.cluster.replicants == 0 {
            anyhow::bail!("--replicants must be at least 1");
        }

        Ok((config, self.args))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let (config, command) = cli.into_config()?;
    let code = runner::run(config, &command)
        .await
        .context("Cluster test run failed")?;

    std::process::exit(code);
}
