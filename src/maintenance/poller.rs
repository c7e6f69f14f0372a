use crate::actor::{self, spawn_logged};
use crate::maintenance::{Client, ScheduledEvent};
use crate::node::NodeDrainer;
use crate::rescale::ServiceRescaler;
use crate::AppConfig;
use act_zero::runtimes::tokio::Timer;
use act_zero::timer::Tick;
use act_zero::{send, Actor, ActorError, ActorResult, Addr, Produces, WeakAddr};
use async_trait::async_trait;
use std::fmt;
use tracing::{info, warn};

/// Polls the scheduled-events feed and fans every qualifying event out into
/// detached per node drains plus a delayed acknowledgement. Nothing is
/// remembered between ticks; an event stays actionable until the feed drops
/// it.
pub struct MaintenancePoller {
    client: Client,
    drainer: NodeDrainer,
    rescaler: ServiceRescaler,
    config: AppConfig,
    timer: Timer,
    addr: WeakAddr<Self>,
}

impl MaintenancePoller {
    pub fn new(
        client: Client,
        drainer: NodeDrainer,
        rescaler: ServiceRescaler,
        config: AppConfig,
    ) -> Self {
        Self {
            client,
            drainer,
            rescaler,
            config,
            timer: Default::default(),
            addr: Default::default(),
        }
    }
}

impl fmt::Display for MaintenancePoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MaintenancePoller")
    }
}

#[async_trait]
impl Actor for MaintenancePoller {
    #[tracing::instrument(name = "MaintenancePoller::started", skip(self, addr))]
    async fn started(&mut self, addr: Addr<Self>) -> ActorResult<()>
    where
        Self: Sized,
    {
        info!("Started {}", self);

        self.addr = addr.downgrade();

        self.timer
            .set_interval_weak(self.addr.clone(), self.config.maintenance.poll_interval);

        Produces::ok(())
    }

    async fn error(&mut self, error: ActorError) -> bool {
        actor::handle_error(error)
    }
}

#[async_trait]
impl Tick for MaintenancePoller {
    async fn tick(&mut self) -> ActorResult<()> {
        if self.timer.tick() {
            send!(self.addr.poll());
        }

        Produces::ok(())
    }
}

impl MaintenancePoller {
    #[tracing::instrument(name = "MaintenancePoller::poll", skip(self))]
    async fn poll(&mut self) {
        let document = match self.client.scheduled_events().await {
            Ok(document) => document,
            Err(e) => {
                warn!("Failed to fetch scheduled events, skipping tick: {:?}", e);
                return;
            }
        };

        for event in document.events {
            if !event.is_drain_trigger(&self.config.maintenance.drain_event_types) {
                continue;
            }

            self.handle_termination(event, document.document_incarnation);
        }
    }

    fn handle_termination(&self, event: ScheduledEvent, document_incarnation: i64) {
        info!(
            event_id = event.event_id.as_deref().unwrap_or(""),
            event_type = %event.event_type.map(|t| t.to_string()).unwrap_or_default(),
            not_before = %event
                .not_before
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            document_incarnation = document_incarnation,
            resources = event.resources.len(),
            "Handling termination event"
        );

        for resource_name in &event.resources {
            let drainer = self.drainer.clone();
            let resource_name = resource_name.clone();

            spawn_logged("node-drain", async move {
                drainer.drain(&resource_name).await
            });
        }

        match event.event_id {
            Some(event_id) => self.schedule_acknowledgement(event_id),
            None => warn!("Termination event carries no EventId, cannot acknowledge"),
        }
    }

    /// The delay keeps the acknowledgement comfortably inside the feed's ack
    /// window while the drains get a head start.
    fn schedule_acknowledgement(&self, event_id: String) {
        let client = self.client.clone();
        let rescaler = self.rescaler.clone();
        let ack_delay = self.config.maintenance.ack_delay;

        spawn_logged("acknowledge-maintenance-event", async move {
            tokio::time::delay_for(ack_delay).await;

            spawn_logged("rescale-on-maintenance-event", async move {
                rescaler.rescale().await
            });

            client.acknowledge(&event_id).await?;

            info!(
                event_id = event_id.as_str(),
                "Acknowledged maintenance event"
            );

            Ok(())
        });
    }
}
