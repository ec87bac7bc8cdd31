use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use kaho::app::main_router;
use kaho::app::state::AppState;
use kaho::middleware::HttpLogPayload;
use kaho::port::{KeyValuePool, Sink};
use kaho::proxy::TrustedProxies;
use kaho::sink::CappedBufferSink;
use kaho::test_support::StubKeyValuePool;
use kaho::{Kaho, Severity};
use serde_json::{Value, json};
use std::sync::Arc;

struct Harness {
    server: TestServer,
    buffer: Arc<CappedBufferSink>,
    store: Arc<StubKeyValuePool>,
}

fn harness() -> Harness {
    let store = Arc::new(StubKeyValuePool::new());
    let pool: Arc<dyn KeyValuePool> = store.clone();
    let buffer = Arc::new(CappedBufferSink::new(pool));
    let sink: Arc<dyn Sink> = buffer.clone();
    let kaho = Arc::new(Kaho::new(vec![sink]));

    let app = main_router(AppState::new(kaho, TrustedProxies::none()));
    Harness {
        server: TestServer::new(app).unwrap(),
        buffer,
        store,
    }
}

#[tokio::test]
async fn test_health_endpoint_returns_healthy() {
    let h = harness();

    let response = h.server.get("/v1/health").await;

    response.assert_status_ok();
    response.assert_text("Healthy");
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let h = harness();

    let response = h.server.get("/v1/nope").await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<Value>(),
        json!({ "error": 0, "message": "404: Error Not Found" })
    );
}

#[tokio::test]
async fn test_every_request_is_logged_as_http_info() {
    let h = harness();

    h.server
        .get("/v1/health")
        .add_query_param("probe", "1")
        .add_header(
            HeaderName::from_static("rbx-server-id"),
            HeaderValue::from_static("server-7"),
        )
        .await
        .assert_status_ok();

    let entries = h.buffer.recent(10).await.unwrap();
    assert_eq!(entries.len(), 1);

    let entry = &entries[0];
    assert_eq!(entry.severity, Severity::Info);
    assert_eq!(entry.service, "HTTP");
    assert!(entry.message.starts_with("200 GET /v1/health?probe=1 "));

    let payload: HttpLogPayload = serde_json::from_value(entry.payload.clone()).unwrap();
    assert_eq!(payload.status, 200);
    assert_eq!(payload.method, "GET");
    assert_eq!(payload.path, "/v1/health");
    assert_eq!(payload.query, "probe=1");
    assert_eq!(payload.server_id, "server-7");
    assert!(payload.latency >= 0);
    // The in-memory transport carries no socket address.
    assert_eq!(payload.remote_addr, "");
}

#[tokio::test]
async fn test_not_found_requests_are_logged_too() {
    let h = harness();

    h.server.get("/missing").await;

    let entries = h.buffer.recent(1).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].message.starts_with("404 GET /missing "));
    assert_eq!(entries[0].payload["serverId"], "");
    assert_eq!(h.store.published().len(), 1);
}

#[tokio::test]
async fn test_logging_failure_does_not_change_response() {
    let h = harness();
    h.store.fail_on("LPUSH");

    let response = h.server.get("/v1/health").await;

    response.assert_status_ok();
    response.assert_text("Healthy");
    assert_eq!(h.store.list_len("kaho:entries"), 0);
}
