//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use session_gateway::config::{GatewayConfig, RouteConfig};
use session_gateway::http::GatewayServer;
use session_gateway::resilience::BreakerRegistry;
use session_gateway::session::{MemoryBackend, SessionBackend, SessionRecord, SessionStore};

pub const SESSION_SECRET: &str = "per-session-secret";

/// Start a mock upstream that answers 200 and echoes selected request
/// headers back as `echo-<name>` response headers, so tests can assert
/// exactly what the gateway forwarded.
pub async fn start_echo_upstream(addr: SocketAddr, echo: &'static [&'static str]) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 16 * 1024];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let request = String::from_utf8_lossy(&buf[..n]).to_string();

                        let mut echoed = String::new();
                        for name in echo {
                            if let Some(value) = header_value(&request, name) {
                                echoed.push_str(&format!("echo-{}: {}\r\n", name, value));
                            }
                        }

                        let body = "upstream-ok";
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n{}",
                            body.len(),
                            echoed,
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

fn header_value(raw_request: &str, name: &str) -> Option<String> {
    raw_request.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_string())
    })
}

/// Sign a token for `session_id` with the given secret.
pub fn make_token(session_id: &str, partner: Option<&str>, secret: &str) -> String {
    let mut claims = json!({"sessionId": session_id});
    if let Some(partner) = partner {
        claims["partner"] = json!(partner);
    }
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// A complete session record as the identity service would write it.
pub fn record_json(partner: &str, with_relationship: bool, permissions: &[&str]) -> String {
    let relationship = json!({
        "id": "REL001", "type": "PLAN", "name": "Plan A",
        "status": "ACTIVE", "contractNumber": "378192372163682"
    });
    let mut record = json!({
        "sessionId": "s-1",
        "partner": partner,
        "sessionSecret": SESSION_SECRET,
        "userInfo": {
            "documentNumber": "12345678900",
            "fullName": "Maria Souza",
            "email": "maria@example.com"
        },
        "fund": {"id": "F01", "name": "Prev Fund", "type": "PGBL"},
        "relationshipList": [relationship.clone()],
        "permissions": permissions,
        "createdAt": "2025-01-01T00:00:00Z"
    });
    if with_relationship {
        record["relationshipSelected"] = relationship;
    }
    record.to_string()
}

/// Seed the in-memory backend with a session under the standard key.
pub fn seed_session(backend: &MemoryBackend, partner: &str, session_id: &str, payload: &str) {
    backend.insert(SessionRecord::cache_key(partner, session_id), payload);
}

/// Gateway config with one protected route pointing at `upstream_addr`.
pub fn gateway_config(proxy_addr: SocketAddr, upstream_addr: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    config.observability.metrics_enabled = false;
    config.routes.push(RouteConfig {
        name: "simulation".to_string(),
        path_prefix: "/api/simulation".to_string(),
        upstream: format!("http://{}", upstream_addr),
        protected: true,
        required_permissions: vec!["VIEW_SIMULATION_RESULTS".to_string()],
        timeout_secs: Some(5),
    });
    config
}

/// Spawn a gateway on `proxy_addr` backed by the given key-value seam.
pub async fn start_gateway(
    config: &GatewayConfig,
    backend: Arc<dyn SessionBackend>,
) -> session_gateway::Shutdown {
    let registry = BreakerRegistry::from_config(&config.breakers);
    let store = SessionStore::new(
        backend,
        registry.breaker("redis"),
        config.session_store.read_timeout(),
    );

    let server = GatewayServer::new(config, &registry, store);
    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();

    let shutdown = session_gateway::Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    // Give the acceptor a beat to come up.
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown
}
