mod poller;

use chrono::{DateTime, Utc};
use http::StatusCode;
use reqwest::{ClientBuilder, Url};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;
use tracing::warn;

pub use poller::MaintenancePoller;

/// Nonroutable scheduled-events endpoint of the Azure instance metadata
/// service.
pub const AZURE_SCHEDULED_EVENTS_URL: &str =
    "http://169.254.169.254/metadata/scheduledevents?api-version=2019-08-01";

const METADATA_HEADER: &str = "Metadata";

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to parse feed address {address} caused by {source:?}")]
    InvalidAddress {
        address: String,
        source: url::ParseError,
    },
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error("Received bad response with status {status:?} and body {body:?}")]
    BadResponse { status: StatusCode, body: String },
}

#[derive(Debug, Clone)]
pub struct Client {
    address: Url,
    http_client: reqwest::Client,
}

impl Client {
    pub fn new(address: &str) -> Result<Self> {
        let address = Url::parse(address).map_err(|e| Error::InvalidAddress {
            address: address.to_owned(),
            source: e,
        })?;

        Ok(Self {
            address,
            http_client: ClientBuilder::new().build()?,
        })
    }

    pub async fn scheduled_events(&self) -> Result<ScheduledEvents> {
        let response = self
            .http_client
            .get(self.address.clone())
            .header(METADATA_HEADER, "true")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::BadResponse {
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }

    /// Tells the feed to start the event early; the feed drops the event from
    /// subsequent documents once the acknowledgement is processed.
    pub async fn acknowledge(&self, event_id: &str) -> Result<()> {
        let body = StartRequests {
            start_requests: vec![StartRequest { event_id }],
        };

        let response = self
            .http_client
            .post(self.address.clone())
            .header(METADATA_HEADER, "true")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::BadResponse {
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }

        // Best effort body drain
        let _ = response.bytes().await;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduledEvents {
    #[serde(default)]
    pub document_incarnation: i64,
    #[serde(default)]
    pub events: Vec<ScheduledEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduledEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub event_type: Option<ScheduledEventType>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub event_status: Option<String>,
    #[serde(default, deserialize_with = "parse_not_before")]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub event_source: Option<String>,
}

impl ScheduledEvent {
    pub fn is_drain_trigger(&self, drain_event_types: &[ScheduledEventType]) -> bool {
        match self.event_type {
            None | Some(ScheduledEventType::Unknown) => false,
            Some(event_type) => drain_event_types.contains(&event_type),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ScheduledEventType {
    Freeze,
    Reboot,
    Redeploy,
    Preempt,
    Terminate,
    Unknown,
}

impl FromStr for ScheduledEventType {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "Freeze" => ScheduledEventType::Freeze,
            "Reboot" => ScheduledEventType::Reboot,
            "Redeploy" => ScheduledEventType::Redeploy,
            "Preempt" => ScheduledEventType::Preempt,
            "Terminate" => ScheduledEventType::Terminate,
            _ => ScheduledEventType::Unknown,
        })
    }
}

impl<'de> Deserialize<'de> for ScheduledEventType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;

        Ok(raw.parse().unwrap_or(ScheduledEventType::Unknown))
    }
}

#[derive(Debug, Serialize)]
struct StartRequests<'a> {
    #[serde(rename = "StartRequests")]
    start_requests: Vec<StartRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct StartRequest<'a> {
    #[serde(rename = "EventId")]
    event_id: &'a str,
}

/// The feed renders NotBefore in RFC 1123 form, e.g.
/// `Mon, 19 Sep 2016 18:29:47 GMT`. An unparsable timestamp must not poison
/// the whole document, the affected event just loses its deadline.
fn parse_not_before<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;

    Ok(match value.as_deref() {
        None | Some("") => None,
        Some(raw) => match DateTime::parse_from_rfc2822(raw) {
            Ok(not_before) => Some(not_before.with_timezone(&Utc)),
            Err(e) => {
                warn!(
                    not_before = raw,
                    "Failed to parse NotBefore timestamp: {:?}", e
                );
                None
            }
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DOCUMENT: &str = r#"{
        "DocumentIncarnation": 3,
        "Events": [
            {
                "EventId": "602d9444-d2cd-49c7-8624-8643e7171297",
                "EventType": "Terminate",
                "ResourceType": "VirtualMachine",
                "Resources": ["node_40"],
                "EventStatus": "Scheduled",
                "NotBefore": "Mon, 19 Sep 2016 18:29:47 GMT",
                "Description": "",
                "EventSource": "Platform"
            }
        ]
    }"#;

    #[test]
    fn deserializes_scheduled_events() -> std::result::Result<(), serde_json::Error> {
        let document: ScheduledEvents = serde_json::from_str(DOCUMENT)?;

        assert_eq!(document.document_incarnation, 3);
        assert_eq!(document.events.len(), 1);

        let event = &document.events[0];
        assert_eq!(
            event.event_id.as_deref(),
            Some("602d9444-d2cd-49c7-8624-8643e7171297")
        );
        assert_eq!(event.event_type, Some(ScheduledEventType::Terminate));
        assert_eq!(event.resources, vec!["node_40".to_owned()]);
        assert_eq!(
            event.not_before,
            Some(Utc.ymd(2016, 9, 19).and_hms(18, 29, 47))
        );

        Ok(())
    }

    #[test]
    fn unknown_event_type_does_not_fail_decoding() -> std::result::Result<(), serde_json::Error> {
        let event: ScheduledEvent =
            serde_json::from_str(r#"{"EventType": "LiveMigration", "Resources": []}"#)?;

        assert_eq!(event.event_type, Some(ScheduledEventType::Unknown));

        Ok(())
    }

    #[test]
    fn unparsable_not_before_becomes_none() -> std::result::Result<(), serde_json::Error> {
        let event: ScheduledEvent =
            serde_json::from_str(r#"{"NotBefore": "sometime soon", "Resources": []}"#)?;

        assert_eq!(event.not_before, None);

        Ok(())
    }

    #[test]
    fn terminate_qualifies_with_default_types() {
        let event = ScheduledEvent {
            event_id: Some("id".to_owned()),
            event_type: Some(ScheduledEventType::Terminate),
            resource_type: None,
            resources: vec!["node_40".to_owned()],
            event_status: None,
            not_before: None,
            description: None,
            event_source: None,
        };

        assert!(event.is_drain_trigger(&[ScheduledEventType::Terminate]));
        assert!(!event.is_drain_trigger(&[ScheduledEventType::Preempt]));
    }

    #[test]
    fn preempt_qualifies_only_when_configured() {
        let event = ScheduledEvent {
            event_id: None,
            event_type: Some(ScheduledEventType::Preempt),
            resource_type: None,
            resources: vec![],
            event_status: None,
            not_before: None,
            description: None,
            event_source: None,
        };

        assert!(!event.is_drain_trigger(&[ScheduledEventType::Terminate]));
        assert!(event.is_drain_trigger(&[
            ScheduledEventType::Terminate,
            ScheduledEventType::Preempt
        ]));
    }

    #[test]
    fn unknown_event_type_never_qualifies_even_when_listed() {
        let event = ScheduledEvent {
            event_id: None,
            event_type: Some(ScheduledEventType::Unknown),
            resource_type: None,
            resources: vec![],
            event_status: None,
            not_before: None,
            description: None,
            event_source: None,
        };

        assert!(!event.is_drain_trigger(&[ScheduledEventType::Unknown]));
    }

    #[test]
    fn missing_event_type_never_qualifies() {
        let event = ScheduledEvent {
            event_id: None,
            event_type: None,
            resource_type: None,
            resources: vec![],
            event_status: None,
            not_before: None,
            description: None,
            event_source: None,
        };

        assert!(!event.is_drain_trigger(&[ScheduledEventType::Terminate]));
    }

    #[test]
    fn serializes_acknowledgement_body() -> std::result::Result<(), serde_json::Error> {
        let body = StartRequests {
            start_requests: vec![StartRequest {
                event_id: "602d9444",
            }],
        };

        let json = serde_json::to_value(&body)?;

        assert_eq!(json["StartRequests"][0]["EventId"], "602d9444");

        Ok(())
    }
}
