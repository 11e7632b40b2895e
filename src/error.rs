use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::common::ApiResponse;

/// Failures talking to the hosted backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request to backend failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode backend data: {0}")]
    Decode(String),

    #[error("realtime listener closed: {0}")]
    Closed(String),
}

#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_GATEWAY
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::error(self.to_string()))
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscribeError::InvalidEmail(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SubscribeError::Gateway(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::error(self.to_string()))
    }
}
