//! # chaos-harness
//!
//! Local multi-node cluster harness for Replicant integration tests.
//!
//! The harness:
//! - Creates an isolated working directory per daemon under a base directory
//! - Launches node 0 as the seed and every other node as a joiner of it
//! - Waits until every node accepts connections
//! - Runs a test command against the live cluster
//! - Always kills and reaps every daemon afterwards
//!
//! ## Example
//!
//! ```ignore
//! let mut config = Config::default();
//! config.cluster.replicants = 3;
//! let code = runner::run(config, &["{PATH}/test/lock-test".into(), "{HOST}".into(), "{PORT}".into()]).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cluster;
pub mod config;
pub mod error;
pub mod node;
mod readiness;
pub mod runner;
pub mod template;

pub use cluster::ClusterHarness;
pub use config::Config;
pub use error::HarnessError;
pub use node::{ClusterNode, Role};
pub use template::TemplateContext;
