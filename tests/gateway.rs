//! Gateway surface tests: health, forwarding, CORS, metrics endpoint.

use axum::http::StatusCode;

mod common;

#[tokio::test]
async fn healthcheck_returns_liveness_payload() {
    let (openai, _) = common::start_mock_upstream(StatusCode::OK, "{}").await;
    let (cohere, _) = common::start_mock_upstream(StatusCode::OK, "{}").await;
    let (addr, _shutdown) =
        common::spawn_gateway(common::gateway_config(openai, cohere, None)).await;

    let response = reqwest::get(format!("http://{addr}/api/healthcheck"))
        .await
        .expect("gateway reachable");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "llm-gateway is healthy");
}

#[tokio::test]
async fn forwards_request_body_and_returns_upstream_response() {
    let (openai, seen) =
        common::start_mock_upstream(StatusCode::OK, r#"{"choices":[]}"#).await;
    let (cohere, _) = common::start_mock_upstream(StatusCode::OK, "{}").await;
    let (addr, _shutdown) =
        common::spawn_gateway(common::gateway_config(openai, cohere, None)).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}/api/openai/v1/chat/completions"))
        .header("content-type", "application/json")
        .body(r#"{"model":"gpt-4","messages":[]}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), r#"{"choices":[]}"#);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/v1/chat/completions");
    assert_eq!(seen[0].body, br#"{"model":"gpt-4","messages":[]}"#);
}

#[tokio::test]
async fn upstream_status_codes_pass_through_untouched() {
    let (openai, _) = common::start_mock_upstream(StatusCode::TOO_MANY_REQUESTS, "slow down").await;
    let (cohere, _) = common::start_mock_upstream(StatusCode::OK, "{}").await;
    let (addr, _shutdown) =
        common::spawn_gateway(common::gateway_config(openai, cohere, None)).await;

    let response = reqwest::get(format!("http://{addr}/api/openai/v1/models"))
        .await
        .unwrap();
    assert_eq!(response.status(), 429);
}

#[tokio::test]
async fn unreachable_upstream_maps_to_bad_gateway() {
    let openai = common::unreachable_addr().await;
    let (cohere, _) = common::start_mock_upstream(StatusCode::OK, "{}").await;
    let (addr, _shutdown) =
        common::spawn_gateway(common::gateway_config(openai, cohere, None)).await;

    let response = reqwest::get(format!("http://{addr}/api/openai/v1/models"))
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn cors_preflight_allows_the_configured_origin() {
    let (openai, _) = common::start_mock_upstream(StatusCode::OK, "{}").await;
    let (cohere, _) = common::start_mock_upstream(StatusCode::OK, "{}").await;
    let (addr, _shutdown) =
        common::spawn_gateway(common::gateway_config(openai, cohere, None)).await;

    let client = reqwest::Client::new();
    let response = client
        .request(
            reqwest::Method::OPTIONS,
            format!("http://{addr}/api/openai/v1/chat/completions"),
        )
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-credentials")
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );
}

#[tokio::test]
async fn metrics_endpoint_always_answers() {
    let (openai, _) = common::start_mock_upstream(StatusCode::OK, "{}").await;
    let (cohere, _) = common::start_mock_upstream(StatusCode::OK, "{}").await;
    let (addr, _shutdown) =
        common::spawn_gateway(common::gateway_config(openai, cohere, None)).await;

    let response = reqwest::get(format!("http://{addr}/metrics")).await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn oversized_request_bodies_are_rejected() {
    let (openai, _) = common::start_mock_upstream(StatusCode::OK, "{}").await;
    let (cohere, _) = common::start_mock_upstream(StatusCode::OK, "{}").await;
    let mut config = common::gateway_config(openai, cohere, None);
    config.limits.max_body_bytes = 64;
    let (addr, _shutdown) = common::spawn_gateway(config).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}/api/openai/v1/chat/completions"))
        .body("x".repeat(1024))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 413);
}
