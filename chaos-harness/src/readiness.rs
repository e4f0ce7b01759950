//! Readiness barrier: wait until every node accepts TCP connections.

use std::time::Duration;

use chaos_types::Endpoint;
use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::config::ReadinessConfig;
use crate::error::{HarnessError, Result};
use crate::node::ClusterNode;

/// Poll each node's listen endpoint until all accept or the timeout expires.
///
/// Fails early if a daemon exits while we wait.
pub(crate) async fn wait_for_listeners(
    nodes: &mut [ClusterNode],
    config: &ReadinessConfig,
) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(config.timeout_secs);
    let poll = Duration::from_millis(config.poll_interval_ms.max(1));
    let mut pending: Vec<usize> = (0..nodes.len()).collect();

    loop {
        let mut still_pending = Vec::new();

        for &i in &pending {
            let node = &mut nodes[i];
            if let Some(status) = node.try_exited()? {
                return Err(HarnessError::Exited {
                    index: node.index(),
                    status,
                });
            }

            if accepts(node.listen(), poll).await {
                tracing::debug!("Daemon {} accepting on {}", node.index(), node.listen());
            } else {
                still_pending.push(i);
            }
        }

        pending = still_pending;
        if pending.is_empty() {
            tracing::info!("All {} daemons accepting connections", nodes.len());
            return Ok(());
        }

        if Instant::now() >= deadline {
            return Err(HarnessError::NotReady {
                endpoint: nodes[pending[0]].listen().clone(),
            });
        }

        tokio::time::sleep(poll).await;
    }
}

/// One connect attempt, bounded by `timeout`.
async fn accepts(endpoint: &Endpoint, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(
            timeout,
            TcpStream::connect((endpoint.host.as_str(), endpoint.port))
        )
        .await,
        Ok(Ok(_))
    )
}
