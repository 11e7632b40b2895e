pub mod api;
pub mod health;
pub mod pages;

use actix_web::web;

/// Every route the site serves: the three pages and the `/api/v1` scope.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(pages::home)
        .service(pages::subscribe)
        .service(pages::logs)
        .service(pages::about)
        .service(
            web::scope("/api/v1")
                // Live readings
                .service(api::sensors)
                .service(api::sensor_stream)
                // Log collections
                .service(api::log_records)
                // Newsletter
                .service(api::create_subscriber)
                // Health check
                .route("/health", web::get().to(health::health_check)),
        );
}

#[cfg(test)]
pub(crate) mod testing {
    use actix_web::web::Data;

    use crate::services::gateway::RemoteGateway;
    use crate::services::logs::LogQueryAdapter;
    use crate::services::memory::{MemoryDocuments, MemoryRealtime};
    use crate::services::subscription::SubscriptionWriter;
    use std::sync::Arc;

    /// App data for handler tests, backed by the in-memory stores the test can still reach.
    pub struct TestBackend {
        pub realtime: MemoryRealtime,
        pub documents: MemoryDocuments,
        pub gateway: Data<RemoteGateway>,
        pub logs: Data<LogQueryAdapter>,
        pub writer: Data<SubscriptionWriter>,
    }

    impl TestBackend {
        pub fn new() -> Self {
            let realtime = MemoryRealtime::new();
            let documents = MemoryDocuments::new();
            let gateway = RemoteGateway::new(Arc::new(realtime.clone()), Arc::new(documents.clone()));
            Self::from_gateway(realtime, documents, gateway)
        }

        pub fn from_gateway(realtime: MemoryRealtime, documents: MemoryDocuments, gateway: RemoteGateway) -> Self {
            Self {
                logs: Data::new(LogQueryAdapter::new(gateway.documents.clone())),
                writer: Data::new(SubscriptionWriter::new(gateway.documents.clone())),
                gateway: Data::new(gateway),
                realtime,
                documents,
            }
        }
    }

    macro_rules! test_app {
        ($backend:expr) => {
            actix_web::test::init_service(
                actix_web::App::new()
                    .app_data($backend.gateway.clone())
                    .app_data($backend.logs.clone())
                    .app_data($backend.writer.clone())
                    .configure(crate::handlers::routes),
            )
            .await
        };
    }
    pub(crate) use test_app;
}
