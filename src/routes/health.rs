use axum::extract::State;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::configuration::Environment;
use crate::store::{SharedStore, StoreStatus};

#[derive(Debug, Serialize)]
pub struct HealthReport {
    status: &'static str,
    timestamp: String,
    store: StoreStatus,
    environment: &'static str,
}

/// Always 200: a broken store is reported, not treated as a failure.
pub async fn check_health(
    State(store): State<SharedStore>,
    State(environment): State<Environment>,
) -> Json<HealthReport> {
    Json(HealthReport {
        status: "OK",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        store: store.status().await,
        environment: environment.as_str(),
    })
}
