use std::sync::Arc;

use crate::error::GatewayError;
use crate::models::common::Direction;
use crate::models::log_record::{LogCollection, LogRecord, TIMESTAMP_FIELD};
use crate::services::gateway::DocumentStore;

/// One-shot, newest-first reads of the log collections. Every call goes to the store.
#[derive(Clone)]
pub struct LogQueryAdapter {
    documents: Arc<dyn DocumentStore>,
}

impl LogQueryAdapter {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    /// Records that fail to decode are logged and left out; the rest are returned in store order.
    pub async fn fetch_records(&self, collection: LogCollection) -> Result<Vec<LogRecord>, GatewayError> {
        let documents = self
            .documents
            .query_ordered(collection.as_str(), TIMESTAMP_FIELD, Direction::Descending)
            .await?;

        log::debug!("Fetched {} documents from {}", documents.len(), collection);
        Ok(documents
            .into_iter()
            .filter_map(|document| match LogRecord::from_document(document) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Skipping record in {}: {}", collection, e);
                    None
                }
            })
            .collect())
    }
}
