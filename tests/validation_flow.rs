//! End-to-end validation scenarios against a live gateway.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use session_gateway::session::MemoryBackend;

mod common;

const ECHOED: &[&str] = &[
    "sessionid",
    "partner",
    "relationshipid",
    "contractnumber",
    "userpermissions",
    "userdocumentnumber",
    "useremail",
    "username",
    "fundid",
    "fundname",
    "authorization",
    "cookie",
    "x-correlation-id",
    "accept",
];

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn test_happy_path_rewrites_and_proxies() {
    let upstream_addr: SocketAddr = "127.0.0.1:28411".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28412".parse().unwrap();
    common::start_echo_upstream(upstream_addr, ECHOED).await;

    let backend = MemoryBackend::new();
    common::seed_session(
        &backend,
        "prevcom",
        "s-1",
        &common::record_json("prevcom", true, &["VIEW_SIMULATION_RESULTS"]),
    );

    let config = common::gateway_config(proxy_addr, upstream_addr);
    let _shutdown = common::start_gateway(&config, Arc::new(backend)).await;

    let token = common::make_token("s-1", Some("prevcom"), common::SESSION_SECRET);
    let response = client()
        .get(format!("http://{}/api/simulation/42/validate", proxy_addr))
        .header("Authorization", format!("Bearer {}", token))
        .header("partner", "prevcom")
        .header("accept", "application/json")
        .header("cookie", "tracking=1")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    // Envelope injected from the session record.
    let headers = response.headers();
    assert_eq!(headers.get("echo-sessionid").unwrap(), "s-1");
    assert_eq!(headers.get("echo-partner").unwrap(), "prevcom");
    assert_eq!(headers.get("echo-relationshipid").unwrap(), "REL001");
    assert_eq!(headers.get("echo-contractnumber").unwrap(), "378192372163682");
    assert_eq!(
        headers.get("echo-userpermissions").unwrap(),
        "VIEW_SIMULATION_RESULTS"
    );
    assert_eq!(headers.get("echo-userdocumentnumber").unwrap(), "12345678900");
    assert_eq!(headers.get("echo-username").unwrap(), "Maria Souza");
    assert_eq!(headers.get("echo-fundid").unwrap(), "F01");
    assert_eq!(headers.get("echo-fundname").unwrap(), "Prev Fund");

    // Allow-list: credentials and cookies never reach the upstream.
    assert!(headers.get("echo-authorization").is_none());
    assert!(headers.get("echo-cookie").is_none());
    // Content negotiation survives.
    assert!(headers.get("echo-accept").is_some());

    assert_eq!(response.text().await.unwrap(), "upstream-ok");
}

#[tokio::test]
async fn test_missing_token_is_invalid_session() {
    let upstream_addr: SocketAddr = "127.0.0.1:28421".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28422".parse().unwrap();
    common::start_echo_upstream(upstream_addr, ECHOED).await;

    let config = common::gateway_config(proxy_addr, upstream_addr);
    let _shutdown = common::start_gateway(&config, Arc::new(MemoryBackend::new())).await;

    let response = client()
        .get(format!("http://{}/api/simulation/42/validate", proxy_addr))
        .header("partner", "prevcom")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_SESSION");
    assert_eq!(body["status"], 401);
    assert_eq!(body["error"], "Unauthorized");
    assert!(body["correlationId"].as_str().is_some_and(|s| !s.is_empty()));
}

#[tokio::test]
async fn test_partner_mismatch_session_not_found() {
    let upstream_addr: SocketAddr = "127.0.0.1:28431".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28432".parse().unwrap();
    common::start_echo_upstream(upstream_addr, ECHOED).await;

    let backend = MemoryBackend::new();
    // Session exists only under prevcom.
    common::seed_session(
        &backend,
        "prevcom",
        "s-1",
        &common::record_json("prevcom", true, &["VIEW_SIMULATION_RESULTS"]),
    );

    let config = common::gateway_config(proxy_addr, upstream_addr);
    let _shutdown = common::start_gateway(&config, Arc::new(backend)).await;

    // Token carries no partner claim; the btgmais key simply misses.
    let token = common::make_token("s-1", None, common::SESSION_SECRET);
    let response = client()
        .get(format!("http://{}/api/simulation/42/validate", proxy_addr))
        .header("Authorization", format!("Bearer {}", token))
        .header("partner", "btgmais")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_SESSION");
}

#[tokio::test]
async fn test_no_relationship_selected_is_rejected() {
    let upstream_addr: SocketAddr = "127.0.0.1:28441".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28442".parse().unwrap();
    common::start_echo_upstream(upstream_addr, ECHOED).await;

    let backend = MemoryBackend::new();
    common::seed_session(
        &backend,
        "prevcom",
        "s-1",
        &common::record_json("prevcom", false, &["VIEW_SIMULATION_RESULTS"]),
    );

    let config = common::gateway_config(proxy_addr, upstream_addr);
    let _shutdown = common::start_gateway(&config, Arc::new(backend)).await;

    let token = common::make_token("s-1", Some("prevcom"), common::SESSION_SECRET);
    let response = client()
        .get(format!("http://{}/api/simulation/42/validate", proxy_addr))
        .header("Authorization", format!("Bearer {}", token))
        .header("partner", "prevcom")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_SESSION");
}

#[tokio::test]
async fn test_insufficient_permissions() {
    let upstream_addr: SocketAddr = "127.0.0.1:28451".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28452".parse().unwrap();
    common::start_echo_upstream(upstream_addr, ECHOED).await;

    let backend = MemoryBackend::new();
    // Session lacks CREATE_SIMULATION.
    common::seed_session(
        &backend,
        "prevcom",
        "s-1",
        &common::record_json("prevcom", true, &["VIEW_SIMULATION_RESULTS"]),
    );

    let mut config = common::gateway_config(proxy_addr, upstream_addr);
    config.routes[0].required_permissions = vec!["CREATE_SIMULATION".to_string()];
    let _shutdown = common::start_gateway(&config, Arc::new(backend)).await;

    let token = common::make_token("s-1", Some("prevcom"), common::SESSION_SECRET);
    let response = client()
        .get(format!("http://{}/api/simulation/42/validate", proxy_addr))
        .header("Authorization", format!("Bearer {}", token))
        .header("partner", "prevcom")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INSUFFICIENT_PERMISSIONS");
}

#[tokio::test]
async fn test_correlation_id_preserved_end_to_end() {
    let upstream_addr: SocketAddr = "127.0.0.1:28461".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28462".parse().unwrap();
    common::start_echo_upstream(upstream_addr, ECHOED).await;

    let backend = MemoryBackend::new();
    common::seed_session(
        &backend,
        "prevcom",
        "s-1",
        &common::record_json("prevcom", true, &["VIEW_SIMULATION_RESULTS"]),
    );

    let config = common::gateway_config(proxy_addr, upstream_addr);
    let _shutdown = common::start_gateway(&config, Arc::new(backend)).await;

    let token = common::make_token("s-1", Some("prevcom"), common::SESSION_SECRET);
    let supplied = "11111111-2222-3333-4444-555555555555";
    let response = client()
        .get(format!("http://{}/api/simulation/42/validate", proxy_addr))
        .header("Authorization", format!("Bearer {}", token))
        .header("partner", "prevcom")
        .header("X-Correlation-ID", supplied)
        .send()
        .await
        .unwrap();

    // Same id on the upstream request and on the client response.
    assert_eq!(response.headers().get("echo-x-correlation-id").unwrap(), supplied);
    assert_eq!(response.headers().get("x-correlation-id").unwrap(), supplied);

    // Without an inbound id, a fresh UUID is minted on both sides.
    let response = client()
        .get(format!("http://{}/api/simulation/42/validate", proxy_addr))
        .header("partner", "prevcom")
        .send()
        .await
        .unwrap();
    let minted = response
        .headers()
        .get("x-correlation-id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(uuid::Uuid::parse_str(&minted).is_ok());
}

#[tokio::test]
async fn test_unmatched_route_is_gateway_404() {
    let upstream_addr: SocketAddr = "127.0.0.1:28471".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28472".parse().unwrap();
    common::start_echo_upstream(upstream_addr, ECHOED).await;

    let config = common::gateway_config(proxy_addr, upstream_addr);
    let _shutdown = common::start_gateway(&config, Arc::new(MemoryBackend::new())).await;

    let response = client()
        .get(format!("http://{}/api/unknown/1", proxy_addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "GATEWAY_ERROR");
}

#[tokio::test]
async fn test_actuator_liveness_bypasses_validation() {
    let upstream_addr: SocketAddr = "127.0.0.1:28481".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28482".parse().unwrap();
    common::start_echo_upstream(upstream_addr, ECHOED).await;

    let config = common::gateway_config(proxy_addr, upstream_addr);
    let _shutdown = common::start_gateway(&config, Arc::new(MemoryBackend::new())).await;

    let response = client()
        .get(format!("http://{}/actuator/health/liveness", proxy_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client()
        .get(format!("http://{}/actuator/health/readiness", proxy_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}
