//! In-process backend used for `memory://` deployments and in tests.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::models::common::{Direction, Document};
use crate::services::gateway::{DocumentStore, Listener, RealtimeStore, SnapshotResult};

#[derive(Default)]
struct RealtimeState {
    root: Map<String, Value>,
    watchers: Vec<(String, mpsc::UnboundedSender<SnapshotResult>)>,
}

#[derive(Clone, Default)]
pub struct MemoryRealtime {
    state: Arc<Mutex<RealtimeState>>,
}

impl MemoryRealtime {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, RealtimeState>, GatewayError> {
        self.state
            .lock()
            .map_err(|_| GatewayError::Closed("realtime state poisoned".to_string()))
    }

    /// Replaces the value at `path` (`None` deletes it) and pushes the change to every listener.
    pub fn set(&self, path: &str, value: Option<Value>) -> Result<(), GatewayError> {
        let mut state = self.lock()?;
        write_path(&mut state.root, &segments(path), value);

        let RealtimeState { root, watchers } = &mut *state;
        let root: &Map<String, Value> = root;
        watchers.retain(|(watched, tx)| {
            let snapshot = read_path(root, &segments(watched));
            tx.send(Ok(snapshot)).is_ok()
        });
        Ok(())
    }

    /// Pushes a backend failure to every listener on `path`.
    #[cfg(test)]
    pub fn fail(&self, path: &str, message: &str) -> Result<(), GatewayError> {
        let mut state = self.lock()?;
        state.watchers.retain(|(watched, tx)| {
            if watched == path.trim_matches('/') {
                tx.send(Err(GatewayError::Closed(message.to_string()))).is_ok()
            } else {
                true
            }
        });
        Ok(())
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.lock()
            .map(|mut state| {
                state.watchers.retain(|(_, tx)| !tx.is_closed());
                state.watchers.len()
            })
            .unwrap_or(0)
    }
}

#[async_trait]
impl RealtimeStore for MemoryRealtime {
    async fn get(&self, path: &str) -> Result<Option<Value>, GatewayError> {
        let state = self.lock()?;
        Ok(read_path(&state.root, &segments(path)))
    }

    async fn listen(&self, path: &str) -> Result<Listener, GatewayError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock()?;
        let current = read_path(&state.root, &segments(path));
        // The receiver is still in scope, so the first send cannot fail.
        let _ = tx.send(Ok(current));
        state.watchers.push((path.trim_matches('/').to_string(), tx));
        Ok(Listener::new(path, rx, None))
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn read_path(root: &Map<String, Value>, path: &[&str]) -> Option<Value> {
    let (first, rest) = match path.split_first() {
        Some(split) => split,
        None => {
            return if root.is_empty() {
                None
            } else {
                Some(Value::Object(root.clone()))
            }
        }
    };

    let mut current = root.get(*first)?;
    for key in rest {
        current = current.as_object()?.get(*key)?;
    }
    Some(current.clone())
}

fn write_path(root: &mut Map<String, Value>, path: &[&str], value: Option<Value>) {
    let (last, parents) = match path.split_last() {
        Some(split) => split,
        None => {
            *root = match value {
                Some(Value::Object(map)) => map,
                _ => Map::new(),
            };
            return;
        }
    };

    let mut current = root;
    for key in parents {
        let entry = current
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry.as_object_mut() {
            Some(map) => map,
            None => return,
        };
    }

    match value {
        Some(Value::Null) | None => {
            current.shift_remove(*last);
        }
        Some(value) => {
            current.insert(last.to_string(), value);
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryDocuments {
    collections: Arc<Mutex<HashMap<String, Vec<Document>>>>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<Document>>>, GatewayError> {
        self.collections
            .lock()
            .map_err(|_| GatewayError::Closed("document state poisoned".to_string()))
    }

    /// Seeds a document, as the external ingestion process would.
    pub fn put(&self, collection: &str, document: Document) -> Result<(), GatewayError> {
        let mut collections = self.lock()?;
        let docs = collections.entry(collection.to_string()).or_default();
        docs.retain(|d| d.id != document.id);
        docs.push(document);
        Ok(())
    }

    pub fn all(&self, collection: &str) -> Vec<Document> {
        self.lock()
            .ok()
            .and_then(|c| c.get(collection).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn query_ordered(
        &self,
        collection: &str,
        field: &str,
        direction: Direction,
    ) -> Result<Vec<Document>, GatewayError> {
        let mut docs: Vec<Document> = self
            .all(collection)
            .into_iter()
            .filter(|d| d.get(field).is_some())
            .collect();

        // Stable sort: ties keep insertion order, so repeated queries return the same sequence.
        docs.sort_by(|a, b| {
            let ordering = compare_values(a.get(field), b.get(field));
            match direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            }
        });
        Ok(docs)
    }

    async fn find_equal(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        limit: usize,
    ) -> Result<Vec<Document>, GatewayError> {
        Ok(self
            .all(collection)
            .into_iter()
            .filter(|d| d.get(field).and_then(Value::as_str) == Some(value))
            .take(limit)
            .collect())
    }

    async fn insert_with_server_time(
        &self,
        collection: &str,
        mut fields: Map<String, Value>,
        time_field: &str,
    ) -> Result<String, GatewayError> {
        let id = Uuid::new_v4().simple().to_string();
        fields.insert(time_field.to_string(), Value::String(Utc::now().to_rfc3339()));
        self.put(collection, Document::new(id.clone(), fields))?;
        Ok(id)
    }
}

/// Sample data for `memory://` deployments so the pages have something to show.
pub fn seed_demo(realtime: &MemoryRealtime, documents: &MemoryDocuments) -> Result<(), GatewayError> {
    realtime.set(
        "sensors",
        Some(serde_json::json!({"ph": "7.2", "tds": "350", "temp": "25"})),
    )?;

    let now = Utc::now();
    for hours_ago in 1..=3 {
        let timestamp = now - chrono::Duration::hours(hours_ago);
        let fields = serde_json::json!({
            "timestamp": timestamp.to_rfc3339(),
            "ph": [7.0, 7.1 + 0.1 * hours_ago as f64, 6.9],
            "tds": [340, 352, 347],
            "temp": [24.5, 25.0, 25.4]
        });
        if let Value::Object(fields) = fields {
            documents.put("hourly_logs", Document::new(format!("demo-hourly-{}", hours_ago), fields))?;
        }
    }

    let fields = serde_json::json!({
        "timestamp": (now - chrono::Duration::minutes(40)).to_rfc3339(),
        "ph": 8.9,
        "tds": 610,
        "temp": 25.1,
        "errorParameters": ["ph", "tds"]
    });
    if let Value::Object(fields) = fields {
        documents.put("error_logs", Document::new("demo-error-1", fields))?;
    }

    log::info!("Seeded in-memory backend with demo sensors and logs");
    Ok(())
}

/// Orders timestamps chronologically, numbers numerically and everything else as text.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (x.parse::<DateTime<Utc>>(), y.parse::<DateTime<Utc>>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
