mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::*;
use country_rates::refresh::Multiplier;
use country_rates::server::create_router;
use country_rates::storage::SqliteStore;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

async fn send(router: &axum::Router, method: &str, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, bytes.to_vec())
}

async fn send_json(router: &axum::Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(router, method, uri).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

fn router_with_three_countries() -> (axum::Router, Harness) {
    let (countries, rates) = three_countries();
    let h = harness(countries, &rates);
    (create_router(h.service.clone()), h)
}

#[tokio::test]
async fn refresh_returns_message_and_report() {
    let (router, _h) = router_with_three_countries();
    let (status, body) = send_json(&router, "POST", "/countries/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Countries refreshed successfully");
    assert_eq!(body["upserted"], 3);
    assert_eq!(body["skipped"], 0);
    assert_eq!(body["failed"], 0);
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn refresh_upstream_failure_is_503_with_details() {
    let h = harness_with(
        json!([country("Nigeria", "Africa", 1, "NGN")]),
        Box::new(Unreachable),
        Arc::new(SqliteStore::open_in_memory().unwrap()),
        Multiplier::fixed(1500.0),
    );
    let router = create_router(h.service.clone());
    let (status, body) = send_json(&router, "POST", "/countries/refresh").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "External data source unavailable");
    assert!(body["details"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn list_filters_sorts_and_404s_when_empty() {
    let (router, _h) = router_with_three_countries();

    let (status, body) = send_json(&router, "GET", "/countries").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No Countries found");

    send_json(&router, "POST", "/countries/refresh").await;

    let (status, body) = send_json(&router, "GET", "/countries?region=africa&sort=gdp_desc").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Ghana", "Nigeria"]);

    let (status, body) = send_json(&router, "GET", "/countries?currency=tvd").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Tuvalu");
    assert_eq!(body[0]["estimated_gdp"], Value::Null);
    assert_eq!(body[0]["exchange_rate"], Value::Null);

    let (status, _) = send_json(&router, "GET", "/countries?region=Europe").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_and_delete_by_name() {
    let (router, _h) = router_with_three_countries();
    send_json(&router, "POST", "/countries/refresh").await;

    let (status, body) = send_json(&router, "GET", "/countries/nigeria").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Nigeria");
    assert_eq!(body["currency_code"], "NGN");
    assert_eq!(body["capital"], "Nigeria City");
    assert!(body["id"].is_i64());
    assert!(body["last_refreshed_at"].is_string());

    let (status, body) = send_json(&router, "DELETE", "/countries/NIGERIA").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Country deleted successfully");

    let (status, body) = send_json(&router, "GET", "/countries/Nigeria").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Country not found");

    let (status, body) = send_json(&router, "DELETE", "/countries/Nigeria").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Country not found");
}

#[tokio::test]
async fn status_reports_count_and_stamp() {
    let (router, _h) = router_with_three_countries();

    let (status, body) = send_json(&router, "GET", "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_countries"], 0);
    assert_eq!(body["last_refreshed_at"], Value::Null);

    send_json(&router, "POST", "/countries/refresh").await;
    let (_, body) = send_json(&router, "GET", "/status").await;
    assert_eq!(body["total_countries"], 3);
    assert!(body["last_refreshed_at"].is_string());
}

#[tokio::test]
async fn image_is_404_until_first_refresh_then_png() {
    let (router, _h) = router_with_three_countries();

    let (status, _, body) = send(&router, "GET", "/countries/image").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "Summary image not found");

    send_json(&router, "POST", "/countries/refresh").await;
    let (status, content_type, body) = send(&router, "GET", "/countries/image").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert_eq!(body, FAKE_PNG);
}
