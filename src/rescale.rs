use crate::config::{self, ServiceMultipliers};
use crate::swarm::{self, ReplicatedService};
use anyhow::{anyhow, Context};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Target replica count for a service: its configured per node multiplier
/// times the nodes that can actually take work. Saturates on overflow.
pub fn desired_replicas(multiplier: u64, eligible_nodes: u64) -> u64 {
    multiplier.saturating_mul(eligible_nodes)
}

/// Recomputes every configured service against a fresh snapshot of the
/// cluster. Invocations are self-contained and safe to overlap; whichever
/// update the control plane accepts last wins.
#[derive(Clone)]
pub struct ServiceRescaler {
    swarm: Arc<swarm::Client>,
    services_file: PathBuf,
}

impl ServiceRescaler {
    pub fn new(swarm: Arc<swarm::Client>, services_file: PathBuf) -> Self {
        Self {
            swarm,
            services_file,
        }
    }

    #[tracing::instrument(name = "ServiceRescaler::rescale", skip(self))]
    pub async fn rescale(&self) -> anyhow::Result<()> {
        let multipliers = self.load_multipliers();

        let nodes = self
            .swarm
            .list_nodes()
            .await
            .context("Failed to list cluster nodes")?;

        let eligible_nodes = nodes.iter().filter(|node| node.is_eligible()).count() as u64;

        info!(
            eligible_nodes = eligible_nodes,
            services = multipliers.len(),
            "Rescaling services"
        );

        for (name, multiplier) in &multipliers {
            if let Err(e) = self
                .rescale_service(name, *multiplier, eligible_nodes)
                .await
            {
                warn!(
                    service = name.as_str(),
                    "Failed to rescale service: {:?}", e
                );
            }
        }

        Ok(())
    }

    fn load_multipliers(&self) -> ServiceMultipliers {
        match config::load_service_multipliers(&self.services_file) {
            Ok(multipliers) => multipliers,
            Err(e) => {
                warn!(
                    "Failed to load service multipliers, continuing with an empty mapping: {:?}",
                    e
                );
                Default::default()
            }
        }
    }

    async fn rescale_service(
        &self,
        name: &str,
        multiplier: u64,
        eligible_nodes: u64,
    ) -> anyhow::Result<()> {
        let service = self
            .swarm
            .inspect_service(name)
            .await?
            .ok_or_else(|| anyhow!("Service {} from the services file does not exist", name))?;

        let mut spec = service.spec.clone();
        if spec.mode.replicated.is_none() {
            warn!(
                service = name,
                "Service does not run in replicated mode, skipping"
            );
            return Ok(());
        }

        let replicas = desired_replicas(multiplier, eligible_nodes);
        spec.mode.replicated = Some(ReplicatedService {
            replicas: Some(replicas),
        });

        self.swarm
            .update_service(&service.id, service.version.index, &spec)
            .await
            .with_context(|| format!("Failed to submit replica count {}", replicas))?;

        info!(
            service = name,
            replicas = replicas,
            "Service got replicated"
        );

        Ok(())
    }
}
