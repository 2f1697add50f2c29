//! Health probes, request ids and error envelopes.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};

use bazaar_integration_tests::TestApp;
use bazaar_server::middleware::REQUEST_ID_HEADER;

#[tokio::test]
async fn test_health_probes() {
    let app = TestApp::new();

    assert_eq!(app.get("/health", None).await.status, StatusCode::OK);
    assert_eq!(app.get("/health/ready", None).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_every_response_carries_a_request_id() {
    let app = TestApp::new();

    let ok = app.get("/products", None).await;
    assert!(ok.headers.contains_key(REQUEST_ID_HEADER));

    let unauthorized = app.get("/users/cart", None).await;
    assert!(unauthorized.headers.contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn test_unknown_route_uses_error_envelope() {
    let app = TestApp::new();

    let response = app.get("/no/such/route", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "not_found");
}

#[tokio::test]
async fn test_success_envelope_shape() {
    let app = TestApp::new();

    let response = app.request(Method::GET, "/categories", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "categories fetched");
    assert!(response.body["data"].is_array());
}
