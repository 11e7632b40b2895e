use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use super::check_status;
use crate::error::GatewayError;
use crate::services::gateway::{Listener, RealtimeStore, SnapshotResult};

/// Realtime Database over its REST API; listening uses the event-stream variant of the same URL.
#[derive(Clone)]
pub struct RealtimeClient {
    http: Client,
    base_url: String,
}

impl RealtimeClient {
    pub fn new(http: Client, database_url: &str) -> Self {
        Self {
            http,
            base_url: database_url.trim_end_matches('/').to_string(),
        }
    }

    fn path_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }
}

#[async_trait]
impl RealtimeStore for RealtimeClient {
    async fn get(&self, path: &str) -> Result<Option<Value>, GatewayError> {
        let url = self.path_url(path);
        log::debug!("GET {}", url);

        let response = check_status(self.http.get(&url).send().await?).await?;
        let value: Value = response.json().await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn listen(&self, path: &str) -> Result<Listener, GatewayError> {
        let url = self.path_url(path);
        log::info!("Opening realtime stream on {}", url);

        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = check_status(response).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(pump_events(response, tx, url));
        Ok(Listener::new(path, rx, Some(worker)))
    }
}

/// Reads the event stream until it ends, the listener goes away, or the server cancels it.
async fn pump_events(
    mut response: reqwest::Response,
    tx: mpsc::UnboundedSender<SnapshotResult>,
    url: String,
) {
    let mut parser = EventStreamParser::default();
    let mut snapshot = Value::Null;

    loop {
        let chunk = match response.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => {
                let _ = tx.send(Err(GatewayError::Closed(format!("stream {} ended", url))));
                return;
            }
            Err(e) => {
                log::error!("Realtime stream {} failed: {}", url, e);
                let _ = tx.send(Err(GatewayError::Http(e)));
                return;
            }
        };

        for event in parser.feed(&chunk) {
            match apply_event(&mut snapshot, &event) {
                Ok(EventEffect::Changed) => {
                    let current = if snapshot.is_null() { None } else { Some(snapshot.clone()) };
                    if tx.send(Ok(current)).is_err() {
                        return;
                    }
                }
                Ok(EventEffect::Ignored) => {}
                Ok(EventEffect::Closed(reason)) => {
                    log::warn!("Realtime stream {} closed by server: {}", url, reason);
                    let _ = tx.send(Err(GatewayError::Closed(reason)));
                    return;
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    return;
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` parser. Chunks may split lines anywhere, including inside UTF-8 sequences.
#[derive(Default)]
pub struct EventStreamParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl EventStreamParser {
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                events.extend(self.dispatch());
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }

        events
    }

    fn dispatch(&mut self) -> Option<StreamEvent> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }
        let event = StreamEvent {
            event: self.event.take().unwrap_or_else(|| "message".to_string()),
            data: self.data.join("\n"),
        };
        self.data.clear();
        Some(event)
    }
}

#[derive(Debug, PartialEq)]
pub enum EventEffect {
    Changed,
    Ignored,
    Closed(String),
}

#[derive(Deserialize)]
struct PathData {
    path: String,
    data: Value,
}

/// Folds one server event into the locally held snapshot of the listened path.
pub fn apply_event(snapshot: &mut Value, event: &StreamEvent) -> Result<EventEffect, GatewayError> {
    match event.event.as_str() {
        "put" | "patch" => {
            let payload: PathData = serde_json::from_str(&event.data)
                .map_err(|e| GatewayError::Decode(format!("{} event: {}", event.event, e)))?;
            let base = segments(&payload.path);

            if event.event == "put" {
                set_at(snapshot, &base, payload.data);
            } else if let Value::Object(children) = payload.data {
                for (key, value) in children {
                    let mut path = base.clone();
                    path.push(key);
                    set_at(snapshot, &path, value);
                }
            }
            Ok(EventEffect::Changed)
        }
        "cancel" | "auth_revoked" => Ok(EventEffect::Closed(format!("{}: {}", event.event, event.data))),
        _ => Ok(EventEffect::Ignored),
    }
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Writes `value` at `path`; a null value deletes the key, and emptied parents collapse to null.
fn set_at(root: &mut Value, path: &[String], value: Value) {
    let (first, rest) = match path.split_first() {
        Some(split) => split,
        None => {
            *root = value;
            return;
        }
    };

    // The store renders integer keys as an array; children are addressed by index.
    if let Value::Array(items) = root {
        let children: Map<String, Value> = items
            .drain(..)
            .enumerate()
            .filter(|(_, item)| !item.is_null())
            .map(|(index, item)| (index.to_string(), item))
            .collect();
        *root = Value::Object(children);
    }

    if !root.is_object() {
        if value.is_null() {
            return;
        }
        *root = Value::Object(Map::new());
    }

    let emptied = match root {
        Value::Object(children) => {
            if rest.is_empty() {
                if value.is_null() {
                    children.shift_remove(first);
                } else {
                    children.insert(first.clone(), value);
                }
            } else {
                let child = children.entry(first.clone()).or_insert(Value::Null);
                set_at(child, rest, value);
                if child.is_null() {
                    children.shift_remove(first);
                }
            }
            children.is_empty()
        }
        _ => false,
    };

    if emptied {
        *root = Value::Null;
    }
}
