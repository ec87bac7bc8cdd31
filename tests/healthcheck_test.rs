use std::net::TcpListener;
use std::time::Duration;
use tokio::time::sleep;

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_healthcheck_succeeds_against_kaho_router() {
    let port = free_port();

    let server = tokio::spawn(async move {
        let app = axum::Router::new().route(
            "/v1/health",
            axum::routing::get(kaho::handler::health::health_handler),
        );
        let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{port}"))
            .await
            .unwrap();
        axum::serve(listener, app).await.unwrap();
    });

    sleep(Duration::from_millis(100)).await;

    let result = kaho::healthcheck_with_port(port).await;
    assert!(result.is_ok(), "healthcheck should pass: {result:?}");

    server.abort();
}

#[tokio::test]
async fn test_healthcheck_fails_when_server_not_running() {
    let port = free_port();

    let result = kaho::healthcheck_with_port(port).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_healthcheck_fails_on_non_success_status() {
    let port = free_port();

    let server = tokio::spawn(async move {
        let app = axum::Router::new().route(
            "/v1/health",
            axum::routing::get(|| async {
                (axum::http::StatusCode::SERVICE_UNAVAILABLE, "Unhealthy")
            }),
        );
        let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{port}"))
            .await
            .unwrap();
        axum::serve(listener, app).await.unwrap();
    });

    sleep(Duration::from_millis(100)).await;

    let result = kaho::healthcheck_with_port(port).await;
    assert!(result.is_err());

    server.abort();
}
