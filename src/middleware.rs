use std::any::Any;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN, VARY,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::configuration::Environment;
use crate::error::{unexpected_error_response, ErrorDetail};
use crate::routes::ApiMessage;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "content-type, authorization";

/// Front-end origins permitted to call the API from a browser.
#[derive(Debug, Clone)]
pub struct AllowedOrigins(Arc<Vec<String>>);

impl AllowedOrigins {
    pub fn new(origins: Vec<String>) -> Self {
        Self(Arc::new(origins))
    }

    pub fn allows(&self, origin: &HeaderValue) -> bool {
        self.0.iter().any(|o| o.as_bytes() == origin.as_bytes())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Rejects browser requests from unknown origins and decorates the rest with
/// CORS headers. Requests without an `Origin` header are let through.
pub async fn cors(
    State(allowed_origins): State<AllowedOrigins>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request.headers().get(ORIGIN).cloned();
    let preflight = request.method() == Method::OPTIONS;

    let mut response = match &origin {
        Some(origin) if !allowed_origins.allows(origin) => {
            tracing::warn!(origin = ?origin, "CORS blocked origin");
            (
                StatusCode::FORBIDDEN,
                Json(ApiMessage::failure("Not allowed by CORS")),
            )
                .into_response()
        }
        _ => {
            let mut response = match preflight {
                true => StatusCode::NO_CONTENT.into_response(),
                false => next.run(request).await,
            };
            allow_origin(&mut response, origin, preflight);
            response
        }
    };

    // Responses differ per origin, whether or not one was sent.
    response
        .headers_mut()
        .append(VARY, HeaderValue::from_static("origin"));

    response
}

fn allow_origin(response: &mut Response, origin: Option<HeaderValue>, preflight: bool) {
    let headers = response.headers_mut();
    if let Some(origin) = origin {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }
    if preflight {
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
    }
}

/// Outside production, replaces the generic 500 body with the error detail
/// attached by the failing handler.
pub async fn expose_error_detail(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    match response.extensions_mut().remove::<ErrorDetail>() {
        Some(ErrorDetail(detail)) if environment != Environment::Production => {
            (response.status(), Json(ApiMessage::failure(detail))).into_response()
        }
        _ => response,
    }
}

/// Turns a handler panic into the same 500 an unexpected error produces.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic message".to_string()
    };

    unexpected_error_response(&anyhow::anyhow!("Handler panicked: {}", detail))
}
