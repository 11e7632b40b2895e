use serde::{Deserialize, Serialize};
use validator::Validate;

pub const SUBSCRIBERS_COLLECTION: &str = "subscribers";
pub const EMAIL_FIELD: &str = "email";
pub const SUBSCRIBED_AT_FIELD: &str = "subscribedAt";

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

/// An email after normalization, ready for the uniqueness check.
#[derive(Debug, Validate)]
pub struct NewSubscriber {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

impl NewSubscriber {
    pub fn new(raw_email: &str) -> Self {
        Self {
            email: normalize_email(raw_email),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubscribeOutcome {
    Subscribed { id: String },
    AlreadySubscribed,
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
