//! Top-level test driver.
//!
//! Boots a cluster, runs one test command against it, and always tears the
//! cluster down, whatever happened in between.

use std::future::Future;
use std::process::ExitStatus;

use tokio::process::Command;

use crate::cluster::ClusterHarness;
use crate::config::Config;
use crate::error::{HarnessError, Result};

/// Run `command` (a template) against a fresh cluster.
///
/// Returns the test command's exit code. Cleanup runs after every outcome,
/// including setup and readiness failures, and when the harness itself gets
/// SIGINT or SIGTERM (the run then reports `128 + signo`).
///
/// # Example
///
/// ```ignore
/// let code = run(
///     Config::default(),
///     &["{PATH}/test/replicant-test-lock".into(), "{HOST}".into(), "{PORT}".into()],
/// )
/// .await?;
/// std::process::exit(code);
/// ```
pub async fn run(config: Config, command: &[String]) -> Result<i32> {
    run_until(config, command, termination()).await
}

/// Like [`run`], but abandons the run when `interrupt` resolves to an exit
/// code. The cluster is torn down on both paths.
pub async fn run_until<F>(config: Config, command: &[String], interrupt: F) -> Result<i32>
where
    F: Future<Output = i32>,
{
    let mut harness = ClusterHarness::new(config);
    let result = tokio::select! {
        result = run_in(&mut harness, command) => result,
        code = interrupt => {
            tracing::warn!("Interrupted, tearing down cluster");
            Ok(code)
        }
    };
    harness.cleanup().await;
    result
}

/// Resolves on SIGINT or SIGTERM with the matching `128 + signo`.
async fn termination() -> i32 {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => tokio::select! {
                _ = interrupted() => 128 + 2,
                _ = term.recv() => 128 + 15,
            },
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                interrupted().await;
                128 + 2
            }
        }
    }

    #[cfg(not(unix))]
    {
        interrupted().await;
        128 + 2
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn run_in(harness: &mut ClusterHarness, command: &[String]) -> Result<i32> {
    harness.setup().await?;
    harness.wait_ready().await?;

    let context = harness
        .template_context()
        .ok_or_else(|| HarnessError::Template("cluster has no seed node".into()))?;
    let argv = context.render_all(command)?;
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| HarnessError::Template("empty test command".into()))?;

    tracing::info!("Running test command: {}", argv.join(" "));
    let mut child = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| HarnessError::TestCommand {
            program: program.clone(),
            source,
        })?;
    let status = child
        .wait()
        .await
        .map_err(|source| HarnessError::TestCommand {
            program: program.clone(),
            source,
        })?;

    let code = exit_code(status);
    tracing::info!("Test command finished: {}", status);
    Ok(code)
}

/// Exit code to propagate; signal deaths map to `128 + signo` like a shell.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
