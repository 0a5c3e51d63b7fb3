use std::fmt::Debug;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::{EmailSubscription, EmailValidationError, SubscriberEmail};
use crate::error::{error_chain_fmt, unexpected_error_response};
use crate::routes::ApiMessage;
use crate::store::{SharedStore, StoreError};

#[derive(Debug, Deserialize)]
pub struct SubmitData {
    email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[tracing::instrument(
    name = "Adding a new email to the waitlist",
    skip(store, payload),
    fields(subscriber_email = tracing::field::Empty)
)]
pub async fn submit_email(
    State(store): State<SharedStore>,
    payload: Result<Json<SubmitData>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiMessage>), SubmitError> {
    let Json(data) = payload.map_err(|rejection| match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => SubmitError::PayloadTooLarge(rejection),
        _ => SubmitError::MalformedBody(rejection),
    })?;
    let email = SubscriberEmail::parse(data.email.unwrap_or_default())?;
    tracing::Span::current().record("subscriber_email", &tracing::field::display(&email));

    if store.find_by_email(&email).await?.is_some() {
        return Err(SubmitError::ConflictError(email.to_string()));
    }

    // The store's uniqueness constraint still catches a concurrent insert
    // that slipped past the lookup above.
    store.insert(&EmailSubscription::new(email)).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiMessage::success("Email saved successfully")),
    ))
}

#[tracing::instrument(name = "Counting waitlist emails", skip(store))]
pub async fn count_emails(
    State(store): State<SharedStore>,
) -> Result<Json<CountResponse>, CountError> {
    let count = store
        .count()
        .await
        .context("Failed to count stored emails")?;

    Ok(Json(CountResponse { count }))
}

#[derive(thiserror::Error)]
pub enum SubmitError {
    #[error("Invalid request body")]
    MalformedBody(#[source] JsonRejection),
    #[error("Request body too large")]
    PayloadTooLarge(#[source] JsonRejection),
    #[error(transparent)]
    ValidationError(#[from] EmailValidationError),
    #[error("Invalid email format")]
    RejectedByStore(String),
    #[error("Email already exists")]
    ConflictError(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl From<StoreError> for SubmitError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Duplicate(email) => SubmitError::ConflictError(email),
            StoreError::Rejected(reason) => SubmitError::RejectedByStore(reason),
            StoreError::Unexpected(error) => SubmitError::UnexpectedError(error),
        }
    }
}

impl Debug for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        let status = match &self {
            SubmitError::MalformedBody(_)
            | SubmitError::ValidationError(_)
            | SubmitError::RejectedByStore(_) => StatusCode::BAD_REQUEST,
            SubmitError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            SubmitError::ConflictError(_) => StatusCode::CONFLICT,
            SubmitError::UnexpectedError(error) => return unexpected_error_response(error),
        };
        tracing::info!(error = ?self, "Rejected a waitlist submission");

        (status, Json(ApiMessage::failure(self.to_string()))).into_response()
    }
}

#[derive(thiserror::Error)]
pub enum CountError {
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for CountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl IntoResponse for CountError {
    fn into_response(self) -> Response {
        match &self {
            CountError::UnexpectedError(error) => unexpected_error_response(error),
        }
    }
}
