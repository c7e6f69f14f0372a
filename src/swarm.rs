pub mod error;
mod events;
mod nodes;
mod request;
mod services;

use reqwest::ClientBuilder;
use serde::Deserialize;

pub use events::EventMessage;
pub use nodes::{Node, NodeAvailability, NodeDescription, NodeRole, NodeSpec, NodeState, NodeStatus};
pub use services::{ReplicatedService, Service, ServiceMode, ServiceSpec};

pub type Result<T> = std::result::Result<T, error::Error>;

const DEFAULT_API_VERSION: &str = "v1.40";

#[derive(Debug)]
pub struct Client {
    config: Config,
    http_client: reqwest::Client,
}

#[derive(Debug, Clone)]
pub struct Config {
    address: String,
    api_version: String,
}

impl Client {
    pub fn builder() -> Builder {
        Builder::default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Builder {
    address: Option<String>,
    api_version: Option<String>,
}

impl Builder {
    pub fn address(mut self, address: String) -> Self {
        self.address = Some(address);
        self
    }

    pub fn api_version(mut self, api_version: String) -> Self {
        self.api_version = Some(api_version);
        self
    }

    pub fn build(self) -> Result<Client> {
        use error::Error::*;

        Ok(Client {
            config: Config {
                address: self.address.ok_or(MissingConfig("address"))?,
                api_version: self
                    .api_version
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_owned()),
            },
            http_client: ClientBuilder::new().build()?,
        })
    }
}

/// Version token for optimistic concurrency on node and service updates. An
/// update submitted with a stale index is rejected by the control plane.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Version {
    pub index: u64,
}
