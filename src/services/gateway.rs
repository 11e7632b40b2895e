use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::FirebaseConfig;
use crate::error::GatewayError;
use crate::models::common::{Direction, Document};
use crate::services::firebase::{FirestoreClient, RealtimeClient};
use crate::services::memory::{seed_demo, MemoryDocuments, MemoryRealtime};

pub type SnapshotResult = Result<Option<Value>, GatewayError>;

/// Key-path reads and push subscriptions against the realtime store.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>, GatewayError>;

    /// Starts a push subscription. The current value is delivered first.
    async fn listen(&self, path: &str) -> Result<Listener, GatewayError>;
}

/// Collection queries and inserts against the document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents missing `field` are left out, as the hosted store does.
    async fn query_ordered(
        &self,
        collection: &str,
        field: &str,
        direction: Direction,
    ) -> Result<Vec<Document>, GatewayError>;

    async fn find_equal(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        limit: usize,
    ) -> Result<Vec<Document>, GatewayError>;

    /// Inserts a new document and stamps `time_field` with the store's own clock. Returns the new id.
    async fn insert_with_server_time(
        &self,
        collection: &str,
        fields: Map<String, Value>,
        time_field: &str,
    ) -> Result<String, GatewayError>;
}

/// A live subscription to one key path. Dropping it (or calling `stop`) releases the connection.
pub struct Listener {
    path: String,
    updates: mpsc::UnboundedReceiver<SnapshotResult>,
    worker: Option<JoinHandle<()>>,
}

impl Listener {
    pub fn new(
        path: impl Into<String>,
        updates: mpsc::UnboundedReceiver<SnapshotResult>,
        worker: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            path: path.into(),
            updates,
            worker,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Next snapshot in server order, `None` once the subscription has ended.
    pub async fn next(&mut self) -> Option<SnapshotResult> {
        self.updates.recv().await
    }

    pub fn stop(self) {}

    fn release(&mut self) {
        self.updates.close();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        log::debug!("Released realtime listener on {}", self.path);
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.release();
    }
}

/// The two long-lived backend handles, built once at startup and shared by every handler.
#[derive(Clone)]
pub struct RemoteGateway {
    pub realtime: Arc<dyn RealtimeStore>,
    pub documents: Arc<dyn DocumentStore>,
}

impl RemoteGateway {
    pub fn new(realtime: Arc<dyn RealtimeStore>, documents: Arc<dyn DocumentStore>) -> Self {
        Self { realtime, documents }
    }

    pub fn connect(config: &FirebaseConfig) -> Result<Self, GatewayError> {
        if config.uses_memory_backend() {
            log::warn!("DATABASE_URL is {}, using the in-memory backend", config.database_url);
            let realtime = MemoryRealtime::new();
            let documents = MemoryDocuments::new();
            if config.database_url.trim_end_matches('/') == "memory://demo" {
                seed_demo(&realtime, &documents)?;
            }
            return Ok(Self::new(Arc::new(realtime), Arc::new(documents)));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        log::info!(
            "Connecting to project {} (realtime store at {})",
            config.project_id,
            config.database_url
        );

        Ok(Self::new(
            Arc::new(RealtimeClient::new(http.clone(), &config.database_url)),
            Arc::new(FirestoreClient::new(
                http,
                &config.firestore_base_url,
                &config.project_id,
                &config.api_key,
            )),
        ))
    }
}
