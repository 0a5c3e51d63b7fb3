mod emails;
mod health;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

pub use emails::{count_emails, submit_email, CountError, SubmitError};
pub use health::check_health;

/// `{ success, message }` body shared by the write endpoint and every error.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

pub async fn api_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ApiMessage::failure("Not found")))
}

pub async fn api_method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ApiMessage::failure("Method not allowed")),
    )
}
