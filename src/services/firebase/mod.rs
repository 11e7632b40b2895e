//! REST clients for the hosted Firebase project.
mod firestore;
mod realtime;

pub use firestore::FirestoreClient;
pub use realtime::RealtimeClient;

use crate::error::GatewayError;

/// Turns a non-2xx answer into a `GatewayError::Status` carrying the body for diagnostics.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Status { status, body })
}
