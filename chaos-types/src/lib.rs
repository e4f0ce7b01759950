//! # chaos-types
//!
//! Shared process and remote-execution types for the Replicant chaos tooling.
//!
//! This crate provides the pieces used by both the local cluster harness and
//! the remote fault-injection controller:
//! - [`Endpoint`] - `host:port` addresses of daemons
//! - [`DaemonArgs`] - the command-line contract of the daemon under test
//! - [`Signal`] - POSIX signals used as fault primitives
//! - [`RemoteSession`] / [`Connector`] - remote command execution, with an
//!   ssh implementation and a mock for tests

#![warn(missing_docs)]
#![warn(clippy::all)]

mod daemon;
mod endpoint;
pub mod remote;
pub mod shell;
mod signal;

pub use daemon::{DaemonArgs, DEFAULT_PORT, PID_SENTINEL};
pub use endpoint::{Endpoint, ParseEndpointError};
pub use remote::{Connector, ExecResult, RemoteError, RemoteSession};
pub use signal::Signal;
