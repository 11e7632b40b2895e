use actix_web::HttpResponse;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::common::ApiResponse;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    pub checked_at: String,
}

/// Liveness only. The hosted backend is not contacted.
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(HealthStatus {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checked_at: Utc::now().to_rfc3339(),
    }))
}
