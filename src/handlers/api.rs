use actix_web::web::{Bytes, Data, Json, Path};
use actix_web::{get, post, HttpResponse, Result};
use futures::stream::{self, Stream};
use std::convert::Infallible;

use crate::error::{GatewayError, SubscribeError};
use crate::models::common::ApiResponse;
use crate::models::log_record::LogCollection;
use crate::models::subscriber::{SubscribeOutcome, SubscribeRequest};
use crate::services::gateway::RemoteGateway;
use crate::services::logs::LogQueryAdapter;
use crate::services::sensors::{current_readings, SensorFeed};
use crate::services::subscription::SubscriptionWriter;

#[get("/sensors")]
pub async fn sensors(gateway: Data<RemoteGateway>) -> Result<HttpResponse, GatewayError> {
    match current_readings(&gateway.realtime).await {
        Ok(readings) => Ok(HttpResponse::Ok().json(ApiResponse::success(readings))),
        Err(e) => {
            log::error!("Failed to read sensors: {}", e);
            Err(e)
        }
    }
}

/// Server-Sent Events: one `readings` event per realtime push.
///
/// The listener lives inside the response stream, so a client disconnect drops
/// the stream and releases the listener with it.
#[get("/sensors/stream")]
pub async fn sensor_stream(gateway: Data<RemoteGateway>) -> Result<HttpResponse, GatewayError> {
    let feed = match SensorFeed::start(&gateway.realtime).await {
        Ok(feed) => feed,
        Err(e) => {
            log::error!("Failed to start sensor stream: {}", e);
            return Err(e);
        }
    };

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(reading_events(feed)))
}

/// Frames each snapshot as an event. A backend failure is sent as `gateway-error` and ends the stream.
pub fn reading_events(feed: SensorFeed) -> impl Stream<Item = Result<Bytes, Infallible>> {
    stream::unfold(Some(feed), |feed| async move {
        let mut feed = feed?;
        match feed.next().await? {
            Ok(readings) => {
                let data = serde_json::to_string(&readings).unwrap_or_else(|e| {
                    log::warn!("Could not encode readings: {}", e);
                    "[]".to_string()
                });
                Some((Ok::<_, Infallible>(event_frame("readings", &data)), Some(feed)))
            }
            Err(e) => {
                let data = serde_json::json!({ "error": e.to_string() }).to_string();
                Some((Ok(event_frame("gateway-error", &data)), None))
            }
        }
    })
}

fn event_frame(event: &str, data: &str) -> Bytes {
    Bytes::from(format!("event: {}\ndata: {}\n\n", event, data))
}

#[get("/logs/{collection}")]
pub async fn log_records(adapter: Data<LogQueryAdapter>, path: Path<String>) -> Result<HttpResponse, GatewayError> {
    let collection = match path.parse::<LogCollection>() {
        Ok(collection) => collection,
        Err(e) => return Ok(HttpResponse::NotFound().json(ApiResponse::<()>::error(e))),
    };

    match adapter.fetch_records(collection).await {
        Ok(records) => Ok(HttpResponse::Ok().json(ApiResponse::success(records))),
        Err(e) => {
            log::error!("Failed to fetch {}: {}", collection, e);
            Err(e)
        }
    }
}

#[post("/subscribers")]
pub async fn create_subscriber(
    writer: Data<SubscriptionWriter>,
    payload: Json<SubscribeRequest>,
) -> Result<HttpResponse, SubscribeError> {
    match writer.subscribe(&payload.email).await {
        Ok(outcome @ SubscribeOutcome::Subscribed { .. }) => Ok(HttpResponse::Created()
            .json(ApiResponse::success_with_message(outcome, "Subscribed".to_string()))),
        Ok(outcome @ SubscribeOutcome::AlreadySubscribed) => Ok(HttpResponse::Ok().json(
            ApiResponse::success_with_message(outcome, "Email is already subscribed".to_string()),
        )),
        Err(SubscribeError::InvalidEmail(email)) => {
            log::warn!("Rejected subscription for {:?}", email);
            Err(SubscribeError::InvalidEmail(email))
        }
        Err(e) => {
            log::error!("Subscription failed: {}", e);
            Err(e)
        }
    }
}
