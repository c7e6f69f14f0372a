use crate::swarm::{error::Error, request, Client, Result};
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::pin::Pin;

#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Action")]
    pub action: String,
    #[serde(rename = "Actor", default)]
    pub actor: Option<EventActor>,
    #[serde(rename = "scope", default)]
    pub scope: Option<String>,
    #[serde(rename = "timeNano", default)]
    pub time_nano: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventActor {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Attributes", default)]
    pub attributes: HashMap<String, String>,
}

impl Client {
    /// Long-lived subscription to node creation events. The stream ends only
    /// when the control plane closes the connection.
    pub async fn node_created_events(
        &self,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<EventMessage>> + Send>>> {
        let filters = serde_json::json!({
            "type": ["node"],
            "event": ["create"],
        })
        .to_string();

        let mut params = HashMap::new();
        params.insert("filters".to_owned(), filters);

        let url = request::gen_url(&self.config, "/events", &params)?;
        let response = self.http_client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::BadResponse {
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }

        let events = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(Error::from))
            .scan(Framer::default(), |framer, chunk| {
                let out = match chunk {
                    Ok(bytes) => framer.push(&bytes),
                    Err(e) => vec![Err(e)],
                };

                future::ready(Some(stream::iter(out)))
            })
            .flatten();

        Ok(Box::pin(events))
    }
}

/// Events arrive as one JSON document per line, split across arbitrary
/// transport chunks.
#[derive(Default)]
struct Framer {
    buffer: Vec<u8>,
}

impl Framer {
    fn push(&mut self, chunk: &[u8]) -> Vec<Result<EventMessage>> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = &line[..line.len() - 1];

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            events.push(serde_json::from_slice(line).map_err(|e| Error::Deserialization {
                content: String::from_utf8_lossy(line).into_owned(),
                source: e,
            }));
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT_LINE: &str = r#"{"Type":"node","Action":"create","Actor":{"ID":"24ifsmvkjbyhk","Attributes":{"name":"node000014"}},"scope":"swarm","timeNano":1602255049388490867}"#;

    #[test]
    fn frames_a_complete_line() {
        let mut framer = Framer::default();

        let events = framer.push(format!("{}\n", EVENT_LINE).as_bytes());

        assert_eq!(events.len(), 1);
        let event = events[0].as_ref().unwrap();
        assert_eq!(event.kind, "node");
        assert_eq!(event.action, "create");
        assert_eq!(event.actor.as_ref().unwrap().id, "24ifsmvkjbyhk");
    }

    #[test]
    fn frames_across_chunk_boundaries() {
        let mut framer = Framer::default();
        let line = format!("{}\n", EVENT_LINE);
        let (head, tail) = line.as_bytes().split_at(40);

        assert!(framer.push(head).is_empty());

        let events = framer.push(tail);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_ok());
    }

    #[test]
    fn frames_multiple_lines_in_one_chunk() {
        let mut framer = Framer::default();
        let chunk = format!("{}\n{}\n", EVENT_LINE, EVENT_LINE);

        let events = framer.push(chunk.as_bytes());

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.is_ok()));
    }

    #[test]
    fn skips_blank_lines_and_reports_garbage() {
        let mut framer = Framer::default();

        let events = framer.push(b"\n{not json}\n");

        assert_eq!(events.len(), 1);
        assert!(events[0].is_err());
    }
}
