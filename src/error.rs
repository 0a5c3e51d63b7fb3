use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::routes::ApiMessage;

/// Message sent to clients in place of the real cause of a 500.
pub const GENERIC_SERVER_ERROR: &str = "Server error";

/// Full description of an unexpected failure, carried in the response
/// extensions until `expose_error_detail` decides whether the client sees it.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

pub fn unexpected_error_response(error: &anyhow::Error) -> Response {
    tracing::error!(error.cause_chain = ?error, "Unexpected error while handling a request");

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiMessage::failure(GENERIC_SERVER_ERROR)),
    )
        .into_response();
    response
        .extensions_mut()
        .insert(ErrorDetail(format!("{:#}", error)));

    response
}

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
