//! Command-line contract of the daemon under test.
//!
//! The daemon is an external binary; the flag spellings here must match its
//! argument parser (`--foreground`, `--listen`, `--listen-port`, `--connect`,
//! `--connect-port`, `--data`).

use crate::endpoint::Endpoint;

/// Port the daemon listens on (and connects to) when none is given.
pub const DEFAULT_PORT: u16 = 1982;

/// Prefix of the line a remote launch prints to report the daemon's pid.
pub const PID_SENTINEL: &str = "REPLICANT_PID=";

/// Arguments for one daemon launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonArgs {
    /// Keep the daemon attached to its parent instead of daemonizing.
    pub foreground: bool,
    /// Address to bind.
    pub listen: Endpoint,
    /// Existing cluster member to join. `None` bootstraps a new cluster.
    pub connect: Option<Endpoint>,
    /// Data directory (daemon default: current directory).
    pub data_dir: Option<String>,
}

impl DaemonArgs {
    /// Arguments for a seed: bootstraps a fresh cluster on `listen`.
    pub fn seed(listen: Endpoint) -> Self {
        Self {
            foreground: true,
            listen,
            connect: None,
            data_dir: None,
        }
    }

    /// Arguments for a joiner: binds `listen` and joins via `connect`.
    pub fn joiner(listen: Endpoint, connect: Endpoint) -> Self {
        Self {
            connect: Some(connect),
            ..Self::seed(listen)
        }
    }

    /// Set the data directory.
    pub fn data_dir(mut self, dir: impl Into<String>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Render the flags in the order the daemon documents them.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.foreground {
            args.push("--foreground".to_string());
        }

        args.push("--listen".into());
        args.push(self.listen.host.clone());
        args.push("--listen-port".into());
        args.push(self.listen.port.to_string());

        if let Some(connect) = &self.connect {
            args.push("--connect".into());
            args.push(connect.host.clone());
            args.push("--connect-port".into());
            args.push(connect.port.to_string());
        }

        if let Some(dir) = &self.data_dir {
            args.push("--data".into());
            args.push(dir.clone());
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_args() {
        let args = DaemonArgs::seed(Endpoint::new("localhost", 1982)).to_args();
        assert_eq!(
            args,
            vec!["--foreground", "--listen", "localhost", "--listen-port", "1982"]
        );
    }

    #[test]
    fn joiner_args_append_connect() {
        let args = DaemonArgs::joiner(
            Endpoint::new("localhost", 1983),
            Endpoint::new("localhost", 1982),
        )
        .to_args()
        .join(" ");
        assert_eq!(
            args,
            "--foreground --listen localhost --listen-port 1983 --connect localhost --connect-port 1982"
        );
    }

    #[test]
    fn data_dir_is_last() {
        let args = DaemonArgs::seed(Endpoint::new("h", 1))
            .data_dir("/var/lib/replicant")
            .to_args();
        assert_eq!(&args[args.len() - 2..], ["--data", "/var/lib/replicant"]);
    }
}
