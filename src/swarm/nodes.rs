use crate::swarm::{error::Error, request, Client, Result, Version};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Node {
    #[serde(rename = "ID")]
    pub id: String,
    pub version: Version,
    pub spec: NodeSpec,
    pub status: NodeStatus,
    pub description: NodeDescription,
}

impl Node {
    /// Healthy and schedulable; mid-drain nodes drop out here because their
    /// availability is already non-active by the time they are counted.
    pub fn is_eligible(&self) -> bool {
        self.status.state == NodeState::Ready
            && self.spec.availability == NodeAvailability::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub role: NodeRole,
    pub availability: NodeAvailability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeRole {
    Worker,
    Manager,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeAvailability {
    Active,
    Pause,
    Drain,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeStatus {
    pub state: NodeState,
    #[serde(default)]
    pub addr: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum NodeState {
    Ready,
    Down,
    Disconnected,
    Unknown,
}

impl FromStr for NodeState {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "ready" => NodeState::Ready,
            "down" => NodeState::Down,
            "disconnected" => NodeState::Disconnected,
            _ => NodeState::Unknown,
        })
    }
}

impl<'de> Deserialize<'de> for NodeState {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;

        Ok(raw.parse().unwrap_or(NodeState::Unknown))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeDescription {
    #[serde(default)]
    pub hostname: String,
}

impl Client {
    pub async fn list_nodes(&self) -> Result<Vec<Node>> {
        request::get(&self.http_client, &self.config, "/nodes", HashMap::new()).await
    }

    /// Inspects a node by id or hostname; a node unknown to the cluster is
    /// `None`, not an error.
    pub async fn inspect_node(&self, name: &str) -> Result<Option<Node>> {
        let path = format!("/nodes/{}", name);

        match request::get(&self.http_client, &self.config, &path, HashMap::new()).await {
            Ok(node) => Ok(Some(node)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn update_node(&self, id: &str, version: u64, spec: &NodeSpec) -> Result<()> {
        let path = format!("/nodes/{}/update", id);
        let mut params = HashMap::new();
        params.insert("version".to_owned(), version.to_string());

        request::post(&self.http_client, &self.config, &path, spec, params).await
    }

    pub async fn remove_node(&self, id: &str, force: bool) -> Result<()> {
        let path = format!("/nodes/{}", id);
        let mut params = HashMap::new();
        params.insert("force".to_owned(), force.to_string());

        request::delete(&self.http_client, &self.config, &path, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE_JSON: &str = r#"{
        "ID": "24ifsmvkjbyhk",
        "Version": { "Index": 8 },
        "Spec": {
            "Labels": { "availability-zone": "1" },
            "Role": "worker",
            "Availability": "active"
        },
        "Status": { "State": "ready", "Addr": "172.17.0.2" },
        "Description": { "Hostname": "node000014" }
    }"#;

    #[test]
    fn deserializes_node() -> std::result::Result<(), serde_json::Error> {
        let node: Node = serde_json::from_str(NODE_JSON)?;

        assert_eq!(node.id, "24ifsmvkjbyhk");
        assert_eq!(node.version.index, 8);
        assert_eq!(node.spec.availability, NodeAvailability::Active);
        assert_eq!(node.status.state, NodeState::Ready);
        assert_eq!(node.description.hostname, "node000014");

        Ok(())
    }

    #[test]
    fn unknown_node_state_does_not_fail_decoding() -> std::result::Result<(), serde_json::Error> {
        let state: NodeState = serde_json::from_str(r#""provisioning""#)?;

        assert_eq!(state, NodeState::Unknown);

        Ok(())
    }

    #[test]
    fn node_spec_round_trips_availability() -> std::result::Result<(), serde_json::Error> {
        let node: Node = serde_json::from_str(NODE_JSON)?;
        let mut spec = node.spec;
        spec.availability = NodeAvailability::Drain;

        let json = serde_json::to_value(&spec)?;

        assert_eq!(json["Availability"], "drain");
        assert_eq!(json["Role"], "worker");
        assert_eq!(json["Labels"]["availability-zone"], "1");

        Ok(())
    }

    #[test]
    fn eligibility_requires_ready_and_active() -> std::result::Result<(), serde_json::Error> {
        let ready_active: Node = serde_json::from_str(NODE_JSON)?;
        assert!(ready_active.is_eligible());

        let mut draining = ready_active.clone();
        draining.spec.availability = NodeAvailability::Drain;
        assert!(!draining.is_eligible());

        let mut down = ready_active;
        down.status.state = NodeState::Down;
        assert!(!down.is_eligible());

        Ok(())
    }
}
