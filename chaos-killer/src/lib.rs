//! # chaos-killer
//!
//! Randomized process faults against remote Replicant daemons.
//!
//! The controller reaches each host over ssh, launches a daemon there and
//! tracks its pid, then repeatedly picks random victims and either suspends
//! them (SIGSTOP, then SIGCONT) or kills and relaunches them.
//!
//! ## Example
//!
//! ```ignore
//! let connector = SshConnector::new(Some("replicant".into()));
//! let mut controller = FaultController::from_config(connector, &Config::default())?;
//! controller.bring_up(&[]).await?;
//!
//! let (_stop_tx, stop_rx) = tokio::sync::watch::channel(false);
//! controller.run(stop_rx).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod controller;
pub mod error;
pub mod launch;
pub mod target;
pub mod victims;

pub use config::{AttachSpec, Config, FaultConfig, FaultKind};
pub use controller::{FaultController, Round, RunSummary};
pub use error::KillerError;
pub use target::{RemoteTarget, TargetState};
pub use victims::select_victims;
