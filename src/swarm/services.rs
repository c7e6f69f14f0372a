use crate::swarm::{error::Error, request, Client, Result, Version};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Service {
    #[serde(rename = "ID")]
    pub id: String,
    pub version: Version,
    pub spec: ServiceSpec,
}

/// Only the name and mode are modeled; everything else the control plane put
/// into the spec is carried through the flattened map, since an update
/// submits the whole spec back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceSpec {
    pub name: String,
    #[serde(default)]
    pub mode: ServiceMode,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceMode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicated: Option<ReplicatedService>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicatedService {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u64>,
}

impl Client {
    /// Inspects a service by id or name; a service unknown to the cluster is
    /// `None`, not an error.
    pub async fn inspect_service(&self, name: &str) -> Result<Option<Service>> {
        let path = format!("/services/{}", name);

        match request::get(&self.http_client, &self.config, &path, HashMap::new()).await {
            Ok(service) => Ok(Some(service)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn update_service(&self, id: &str, version: u64, spec: &ServiceSpec) -> Result<()> {
        let path = format!("/services/{}/update", id);
        let mut params = HashMap::new();
        params.insert("version".to_owned(), version.to_string());

        request::post(&self.http_client, &self.config, &path, spec, params).await
    }
}
