//! Remote daemon launch command and pid handshake.
//!
//! The launch runs in the background on the remote host behind a small
//! `sh -c` wrapper that prints `REPLICANT_PID=<pid>` and then `exec`s the
//! daemon, so the reported pid is the daemon's own. The daemon's output goes
//! to a per-endpoint log file in the remote work directory and its stdin is
//! detached, which lets the ssh session close once the pid is printed.

use chaos_types::{shell, DaemonArgs, Endpoint, PID_SENTINEL};

/// Log file name for the daemon bound to `listen`.
pub fn log_file(listen: &Endpoint) -> String {
    format!("replicant-daemon-{}-{}.log", listen.host, listen.port)
}

/// Data directory, relative to the work directory, for the daemon bound to
/// `listen`. Several targets may share one machine and one work directory.
pub fn data_dir(listen: &Endpoint) -> String {
    format!("data-{}-{}", listen.host, listen.port)
}

/// Single-line remote command that launches `path` with `args` in `workdir`.
pub fn start_command(path: &str, args: &DaemonArgs, workdir: &str) -> String {
    let workdir = shell::quote_path(workdir);
    format!(
        "mkdir -p {wd} && cd {wd} || exit 1; \
         REPLICANT_LOG={log} sh -c 'echo \"{sentinel}$$\"; \
         exec \"$0\" \"$@\" >>\"$REPLICANT_LOG\" 2>&1 </dev/null' {daemon} {args} &",
        wd = workdir,
        log = shell::quote(&log_file(&args.listen)),
        sentinel = PID_SENTINEL,
        daemon = shell::quote_path(path),
        args = shell::join(args.to_args()),
    )
}

/// Extract the daemon pid from launch output.
///
/// Returns `None` unless some line is exactly the sentinel followed by a
/// positive integer.
pub fn parse_pid(stdout: &str) -> Option<u32> {
    stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix(PID_SENTINEL))
        .find_map(|pid| pid.parse::<u32>().ok())
        .filter(|pid| *pid > 0)
}
