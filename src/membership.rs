use crate::actor::{self, spawn_logged, Error};
use crate::rescale::ServiceRescaler;
use crate::swarm;
use crate::AppConfig;
use act_zero::{send, Actor, ActorError, ActorResult, Addr, Produces, WeakAddr};
use anyhow::anyhow;
use async_trait::async_trait;
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Follows the cluster's node creation events for the process lifetime and
/// nudges the rescaler after each one. Losing the subscription is fatal;
/// there is no reconnect.
pub struct MembershipListener {
    swarm: Arc<swarm::Client>,
    rescaler: ServiceRescaler,
    config: AppConfig,
    addr: WeakAddr<Self>,
}

impl MembershipListener {
    pub fn new(swarm: Arc<swarm::Client>, rescaler: ServiceRescaler, config: AppConfig) -> Self {
        Self {
            swarm,
            rescaler,
            config,
            addr: Default::default(),
        }
    }
}

impl fmt::Display for MembershipListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MembershipListener")
    }
}

#[async_trait]
impl Actor for MembershipListener {
    #[tracing::instrument(name = "MembershipListener::started", skip(self, addr))]
    async fn started(&mut self, addr: Addr<Self>) -> ActorResult<()>
    where
        Self: Sized,
    {
        info!("Started {}", self);

        self.addr = addr.downgrade();

        send!(self.addr.listen());

        Produces::ok(())
    }

    async fn error(&mut self, error: ActorError) -> bool {
        actor::handle_error(error)
    }
}

impl MembershipListener {
    #[tracing::instrument(name = "MembershipListener::listen", skip(self))]
    async fn listen(&mut self) -> ActorResult<()> {
        let mut events = self
            .swarm
            .node_created_events()
            .await
            .map_err(Error::fatal)?;

        while let Some(event) = events.next().await {
            let event = event.map_err(Error::fatal)?;

            info!(
                node_id = event.actor.as_ref().map(|a| a.id.as_str()).unwrap_or(""),
                "Node joined the cluster, letting it settle before rescaling"
            );

            tokio::time::delay_for(self.config.membership.settle_delay).await;

            let rescaler = self.rescaler.clone();
            spawn_logged("rescale-on-membership-change", async move {
                rescaler.rescale().await
            });
        }

        Err(Error::fatal(anyhow!("Membership event stream ended")).into())
    }
}
