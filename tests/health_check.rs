//! Integration tests for the liveness endpoint and shared response headers

mod common;

use common::spawn_app;

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(&app.url("/health_check"))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn responses_carry_security_headers_and_request_id() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(&app.url("/health_check"))
        .send()
        .await
        .expect("Failed to execute request");

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["cache-control"], "no-store");
    assert!(headers.get("x-request-id").is_some());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(&app.url("/does-not-exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn rejected_requests_carry_security_headers_and_request_id() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(&app.url("/positions"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(401, response.status().as_u16());
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers.get("x-request-id").is_some());
}
