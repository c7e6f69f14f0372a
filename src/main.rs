use act_zero::runtimes::tokio::spawn_actor;
use act_zero::AddrLike;
use futures::future;
use futures::pin_mut;
use std::sync::Arc;
use swarm_spot_scaler::config::load_config;
use swarm_spot_scaler::maintenance::{self, MaintenancePoller};
use swarm_spot_scaler::membership::MembershipListener;
use swarm_spot_scaler::node::NodeDrainer;
use swarm_spot_scaler::rescale::ServiceRescaler;
use swarm_spot_scaler::swarm;
use tracing::error;
use tracing::subscriber::set_global_default;
use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

    let subscriber = Registry::default()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer);

    set_global_default(subscriber).expect("Failed to set subscriber");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = load_config()?;

    let swarm = Arc::new(
        swarm::Client::builder()
            .address(config.swarm.address.clone())
            .build()?,
    );
    let maintenance_client = maintenance::Client::new(&config.maintenance.address)?;

    let rescaler = ServiceRescaler::new(Arc::clone(&swarm), config.services_file.clone());
    let drainer = NodeDrainer::new(Arc::clone(&swarm), config.drain.grace_period);

    let membership_listener = spawn_actor(MembershipListener::new(
        Arc::clone(&swarm),
        rescaler.clone(),
        Arc::clone(&config),
    ));

    let maintenance_poller = spawn_actor(MaintenancePoller::new(
        maintenance_client,
        drainer,
        rescaler,
        Arc::clone(&config),
    ));

    let listener_termination = membership_listener.termination();
    let poller_termination = maintenance_poller.termination();
    pin_mut!(listener_termination, poller_termination);

    future::select(listener_termination, poller_termination).await;

    error!("A reconciliation loop terminated, shutting down");
    std::process::exit(1);
}
