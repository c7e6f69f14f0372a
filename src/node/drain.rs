use crate::node::hostname;
use crate::swarm::{self, NodeAvailability};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Drains and removes a node the maintenance feed has doomed. The sequence is
/// strictly forward: translate the resource name, mark the node as draining,
/// wait out the grace period, remove it. Every instance runs detached and
/// independent of other drains in flight.
#[derive(Clone)]
pub struct NodeDrainer {
    swarm: Arc<swarm::Client>,
    grace_period: Duration,
}

impl NodeDrainer {
    pub fn new(swarm: Arc<swarm::Client>, grace_period: Duration) -> Self {
        Self {
            swarm,
            grace_period,
        }
    }

    #[tracing::instrument(name = "NodeDrainer::drain", skip(self))]
    pub async fn drain(&self, resource_name: &str) -> anyhow::Result<()> {
        let hostname = hostname::encode(resource_name)?;

        let node = match self.swarm.inspect_node(&hostname).await? {
            Some(node) => node,
            None => {
                warn!(
                    hostname = hostname.as_str(),
                    "Node to drain is not part of the cluster, nothing to do"
                );
                return Ok(());
            }
        };

        let mut spec = node.spec.clone();
        spec.availability = NodeAvailability::Drain;

        self.swarm
            .update_node(&node.id, node.version.index, &spec)
            .await
            .with_context(|| format!("Failed to mark node {} as draining", hostname))?;

        info!(
            hostname = hostname.as_str(),
            "Node marked as draining, waiting out the grace period"
        );

        tokio::time::delay_for(self.grace_period).await;

        self.swarm
            .remove_node(&node.id, true)
            .await
            .with_context(|| format!("Failed to remove node {}", hostname))?;

        info!(hostname = hostname.as_str(), "Node drained and removed");

        Ok(())
    }
}
