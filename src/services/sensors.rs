use std::sync::Arc;

use crate::error::GatewayError;
use crate::models::sensor::{reduce_snapshot, SensorReading, SENSORS_PATH};
use crate::services::gateway::{Listener, RealtimeStore};

/// A dashboard's live view of the `sensors` path.
///
/// Acquired when a page becomes active and released on `stop` or drop; after that
/// no further readings are produced, whatever the store pushes.
pub struct SensorFeed {
    listener: Option<Listener>,
}

impl SensorFeed {
    pub async fn start(realtime: &Arc<dyn RealtimeStore>) -> Result<Self, GatewayError> {
        let listener = realtime.listen(SENSORS_PATH).await?;
        log::debug!("Sensor feed started on {}", listener.path());
        Ok(Self {
            listener: Some(listener),
        })
    }

    /// Readings for the next snapshot, or `None` once the feed is stopped or the store closed it.
    pub async fn next(&mut self) -> Option<Result<Vec<SensorReading>, GatewayError>> {
        let listener = self.listener.as_mut()?;
        match listener.next().await {
            Some(Ok(snapshot)) => Some(Ok(reduce_snapshot(snapshot.as_ref()))),
            Some(Err(e)) => {
                log::warn!("Sensor feed interrupted: {}", e);
                self.stop();
                Some(Err(e))
            }
            None => {
                self.stop();
                None
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.stop();
        }
    }

    pub fn is_active(&self) -> bool {
        self.listener.is_some()
    }
}

/// Current readings without subscribing.
pub async fn current_readings(realtime: &Arc<dyn RealtimeStore>) -> Result<Vec<SensorReading>, GatewayError> {
    let snapshot = realtime.get(SENSORS_PATH).await?;
    Ok(reduce_snapshot(snapshot.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::MemoryRealtime;
    use serde_json::json;

    fn store() -> (MemoryRealtime, Arc<dyn RealtimeStore>) {
        let memory = MemoryRealtime::new();
        let shared: Arc<dyn RealtimeStore> = Arc::new(memory.clone());
        (memory, shared)
    }

    #[tokio::test]
    async fn test_feed_reduces_each_push() {
        let (memory, realtime) = store();
        memory.set("sensors", Some(json!({"ph": "7.2", "tds": "350", "temp": "25"}))).unwrap();

        let mut feed = SensorFeed::start(&realtime).await.unwrap();
        let first = feed.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first[0], SensorReading { sensor_id: "ph".to_string(), value: 7.2 });

        memory.set("sensors/ph", Some(json!("6.5"))).unwrap();
        let second = feed.next().await.unwrap().unwrap();
        assert_eq!(second[0].value, 6.5);
    }

    #[tokio::test]
    async fn test_empty_path_gives_no_readings() {
        let (_, realtime) = store();
        let mut feed = SensorFeed::start(&realtime).await.unwrap();
        assert!(feed.next().await.unwrap().unwrap().is_empty());
        assert!(current_readings(&realtime).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_updates_after_stop() {
        let (memory, realtime) = store();
        let mut feed = SensorFeed::start(&realtime).await.unwrap();
        feed.next().await.unwrap().unwrap();

        feed.stop();
        memory.set("sensors/ph", Some(json!(7))).unwrap();

        assert!(!feed.is_active());
        assert!(feed.next().await.is_none());
        assert_eq!(memory.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_dropping_feed_releases_listener() {
        let (memory, realtime) = store();
        let feed = SensorFeed::start(&realtime).await.unwrap();
        assert_eq!(memory.listener_count(), 1);

        drop(feed);
        assert_eq!(memory.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_backend_error_surfaces_then_ends_feed() {
        let (memory, realtime) = store();
        let mut feed = SensorFeed::start(&realtime).await.unwrap();
        feed.next().await.unwrap().unwrap();

        memory.fail("sensors", "permission denied").unwrap();
        assert!(feed.next().await.unwrap().is_err());
        assert!(feed.next().await.is_none());
    }
}
