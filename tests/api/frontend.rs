use reqwest::StatusCode;
use serde_json::Value;

use crate::helpers::App;

#[tokio::test]
async fn production_serves_the_entry_document_at_the_root() {
    let app = App::in_production().await;

    let response = app.get("/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("waitlist-form"));
}

#[tokio::test]
async fn production_serves_the_entry_document_for_client_side_routes() {
    let app = App::in_production().await;

    let response = app.get("/about/team").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("waitlist-form"));
}

#[tokio::test]
async fn production_keeps_unknown_api_paths_out_of_the_front_end() {
    let app = App::in_production().await;

    let response = app.get("/api/does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Not found");
}

#[tokio::test]
async fn development_does_not_serve_static_files() {
    let app = App::new().await;

    let response = app.get("/").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
