use serde_json::{Map, Value};
use std::sync::Arc;
use validator::Validate;

use crate::error::SubscribeError;
use crate::models::subscriber::{
    NewSubscriber, SubscribeOutcome, EMAIL_FIELD, SUBSCRIBED_AT_FIELD, SUBSCRIBERS_COLLECTION,
};
use crate::services::gateway::DocumentStore;

/// Adds newsletter subscribers, one record per normalized email.
///
/// Uniqueness is a read-then-write check, not a store constraint: two concurrent
/// calls for the same address can both pass the check and both insert.
#[derive(Clone)]
pub struct SubscriptionWriter {
    documents: Arc<dyn DocumentStore>,
}

impl SubscriptionWriter {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    pub async fn subscribe(&self, raw_email: &str) -> Result<SubscribeOutcome, SubscribeError> {
        let subscriber = NewSubscriber::new(raw_email);
        if subscriber.validate().is_err() {
            return Err(SubscribeError::InvalidEmail(raw_email.trim().to_string()));
        }

        let existing = self
            .documents
            .find_equal(SUBSCRIBERS_COLLECTION, EMAIL_FIELD, &subscriber.email, 1)
            .await?;
        if !existing.is_empty() {
            log::info!("{} is already subscribed", subscriber.email);
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }

        let mut fields = Map::new();
        fields.insert(EMAIL_FIELD.to_string(), Value::String(subscriber.email.clone()));
        let id = self
            .documents
            .insert_with_server_time(SUBSCRIBERS_COLLECTION, fields, SUBSCRIBED_AT_FIELD)
            .await?;

        log::info!("Subscribed {} as {}", subscriber.email, id);
        Ok(SubscribeOutcome::Subscribed { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::models::common::{Direction, Document};
    use crate::services::memory::MemoryDocuments;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn test_fresh_email_is_written_normalized() {
        let docs = MemoryDocuments::new();
        let writer = SubscriptionWriter::new(Arc::new(docs.clone()));

        let outcome = writer.subscribe("  Fish.Keeper@Example.COM ").await.unwrap();
        assert!(matches!(outcome, SubscribeOutcome::Subscribed { .. }));

        let stored = docs.all("subscribers");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].get("email"), Some(&Value::String("fish.keeper@example.com".to_string())));
        assert!(stored[0].get("subscribedAt").is_some());
    }

    #[tokio::test]
    async fn test_normalized_duplicate_is_detected() {
        let docs = MemoryDocuments::new();
        let writer = SubscriptionWriter::new(Arc::new(docs.clone()));

        writer.subscribe("  User@Example.COM ").await.unwrap();
        let second = writer.subscribe("user@example.com").await.unwrap();

        assert_eq!(second, SubscribeOutcome::AlreadySubscribed);
        assert_eq!(docs.all("subscribers").len(), 1);
    }

    /// Counts every call and fails the ones marked as broken.
    struct FlakyStore {
        inner: MemoryDocuments,
        fail_lookups: bool,
        fail_inserts: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn query_ordered(&self, c: &str, f: &str, d: Direction) -> Result<Vec<Document>, GatewayError> {
            self.inner.query_ordered(c, f, d).await
        }

        async fn find_equal(&self, c: &str, f: &str, v: &str, l: usize) -> Result<Vec<Document>, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_lookups {
                return Err(GatewayError::Status { status: 503, body: "unavailable".to_string() });
            }
            self.inner.find_equal(c, f, v, l).await
        }

        async fn insert_with_server_time(
            &self,
            c: &str,
            fields: Map<String, Value>,
            t: &str,
        ) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_inserts {
                return Err(GatewayError::Status { status: 403, body: "PERMISSION_DENIED".to_string() });
            }
            self.inner.insert_with_server_time(c, fields, t).await
        }
    }

    fn flaky(fail_lookups: bool, fail_inserts: bool) -> Arc<FlakyStore> {
        Arc::new(FlakyStore {
            inner: MemoryDocuments::new(),
            fail_lookups,
            fail_inserts,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_invalid_email_makes_no_backend_call() {
        let store = flaky(false, false);
        let writer = SubscriptionWriter::new(store.clone());

        let err = writer.subscribe("definitely not an email").await.unwrap_err();
        assert!(matches!(err, SubscribeError::InvalidEmail(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_failures_propagate() {
        let writer = SubscriptionWriter::new(flaky(true, false));
        assert!(matches!(writer.subscribe("a@b.co").await, Err(SubscribeError::Gateway(_))));

        let store = flaky(false, true);
        let writer = SubscriptionWriter::new(store.clone());
        assert!(matches!(writer.subscribe("a@b.co").await, Err(SubscribeError::Gateway(_))));
        assert!(store.inner.all("subscribers").is_empty());
    }

    /// Holds every lookup until two callers have finished theirs, forcing the check-then-write interleaving.
    struct RacingStore {
        inner: MemoryDocuments,
        lookups_done: Barrier,
    }

    #[async_trait]
    impl DocumentStore for RacingStore {
        async fn query_ordered(&self, c: &str, f: &str, d: Direction) -> Result<Vec<Document>, GatewayError> {
            self.inner.query_ordered(c, f, d).await
        }

        async fn find_equal(&self, c: &str, f: &str, v: &str, l: usize) -> Result<Vec<Document>, GatewayError> {
            let found = self.inner.find_equal(c, f, v, l).await;
            self.lookups_done.wait().await;
            found
        }

        async fn insert_with_server_time(
            &self,
            c: &str,
            fields: Map<String, Value>,
            t: &str,
        ) -> Result<String, GatewayError> {
            self.inner.insert_with_server_time(c, fields, t).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_are_possible() {
        let store = Arc::new(RacingStore {
            inner: MemoryDocuments::new(),
            lookups_done: Barrier::new(2),
        });
        let writer = SubscriptionWriter::new(store.clone());

        let (first, second) = tokio::join!(
            writer.subscribe("race@example.com"),
            writer.subscribe(" RACE@example.com"),
        );

        // Both pass the existence check before either writes: the known weak invariant.
        assert!(matches!(first.unwrap(), SubscribeOutcome::Subscribed { .. }));
        assert!(matches!(second.unwrap(), SubscribeOutcome::Subscribed { .. }));
        assert_eq!(store.inner.all("subscribers").len(), 2);
    }
}
