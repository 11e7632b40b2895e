use actix_web::web::{Data, Form, Query};
use actix_web::{get, post, HttpResponse, Result};

use crate::error::SubscribeError;
use crate::models::log_record::LogCollection;
use crate::models::sensor::SensorReading;
use crate::models::subscriber::SubscribeRequest;
use crate::services::gateway::RemoteGateway;
use crate::services::logs::LogQueryAdapter;
use crate::services::sensors::current_readings;
use crate::services::subscription::SubscriptionWriter;
use crate::views::about::render_about;
use crate::views::home::render_home;
use crate::views::logs::{render_logs, LogsPageState};
use crate::views::state::{PageQuery, PageSession, SubscribeForm};

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok().content_type("text/html; charset=utf-8").body(body)
}

/// First paint of the dashboard. Later readings arrive over the sensor stream.
async fn initial_readings(gateway: &RemoteGateway) -> Option<Vec<SensorReading>> {
    match current_readings(&gateway.realtime).await {
        Ok(readings) => Some(readings),
        Err(e) => {
            log::error!("Failed to read sensors for the dashboard: {}", e);
            None
        }
    }
}

#[get("/")]
pub async fn home(gateway: Data<RemoteGateway>, query: Query<PageQuery>) -> Result<HttpResponse> {
    let readings = initial_readings(&gateway).await;
    Ok(html(render_home(query.menu(), readings.as_deref(), &SubscribeForm::default())))
}

#[post("/subscribe")]
pub async fn subscribe(
    gateway: Data<RemoteGateway>,
    writer: Data<SubscriptionWriter>,
    query: Query<PageQuery>,
    payload: Form<SubscribeRequest>,
) -> Result<HttpResponse> {
    let mut form = SubscribeForm::with_email(&payload.email);
    let result = writer.subscribe(&payload.email).await;
    match &result {
        Err(SubscribeError::InvalidEmail(email)) => log::warn!("Rejected subscription for {:?}", email),
        Err(e) => log::error!("Subscription failed: {}", e),
        Ok(_) => {}
    }
    form.apply(&result);

    let readings = initial_readings(&gateway).await;
    Ok(html(render_home(query.menu(), readings.as_deref(), &form)))
}

/// Fetches both collections concurrently. Each result lands in `session` on its own,
/// and only while the page is still mounted.
async fn load_logs(adapter: &LogQueryAdapter, session: &PageSession<LogsPageState>) {
    let hourly = async {
        match adapter.fetch_records(LogCollection::HourlyLogs).await {
            Ok(records) => session.apply(|state| state.hourly = records),
            Err(e) => {
                log::error!("Failed to fetch {}: {}", LogCollection::HourlyLogs, e);
                session.apply(|state| state.hourly_failed = true)
            }
        }
    };
    let errors = async {
        match adapter.fetch_records(LogCollection::ErrorLogs).await {
            Ok(records) => session.apply(|state| state.errors = records),
            Err(e) => {
                log::error!("Failed to fetch {}: {}", LogCollection::ErrorLogs, e);
                session.apply(|state| state.errors_failed = true)
            }
        }
    };
    tokio::join!(hourly, errors);
}

#[get("/logs")]
pub async fn logs(adapter: Data<LogQueryAdapter>, query: Query<PageQuery>) -> Result<HttpResponse> {
    let filter = query.filter();
    let session = PageSession::mount(LogsPageState::default());

    // A client disconnect drops this future mid-fetch, and the session with it.
    load_logs(&adapter, &session).await;

    let state = session.snapshot().unwrap_or_default();
    session.unmount();

    Ok(html(render_logs(query.menu(), filter, &state)))
}

#[get("/about")]
pub async fn about(query: Query<PageQuery>) -> Result<HttpResponse> {
    Ok(html(render_about(query.menu())))
}
