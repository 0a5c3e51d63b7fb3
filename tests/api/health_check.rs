use chrono::DateTime;
use reqwest::StatusCode;
use serde_json::Value;

use crate::helpers::App;

#[tokio::test]
async fn health_check_works() {
    let app = App::new().await;

    let response = app.get_health_check().await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "OK");
    assert_eq!(body["store"], "connected");
    assert_eq!(body["environment"], "development");
    assert!(DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn health_check_reports_a_disconnected_store() {
    let app = App::new().await;
    app.store.disconnect();

    let response = app.get_health_check().await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "OK");
    assert_eq!(body["store"], "disconnected");
}

#[tokio::test]
async fn health_check_reports_the_runtime_mode() {
    let app = App::in_production().await;

    let body: Value = app.get_health_check().await.json().await.unwrap();

    assert_eq!(body["environment"], "production");
}

#[tokio::test]
async fn health_check_has_no_side_effects() {
    let app = App::new().await;

    app.get_health_check().await;
    app.get_health_check().await;

    assert_eq!(app.stored_count().await, 0);
}
