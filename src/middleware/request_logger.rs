use crate::app::state::AppState;
use crate::domain::{LogEntry, Severity};
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::warn;

/// Payload attached to every request entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HttpLogPayload {
    pub remote_addr: String,
    /// Nanoseconds.
    pub latency: i64,
    pub status: u16,
    pub method: String,
    pub path: String,
    pub query: String,
    pub server_id: String,
}

/// Record one `INFO` entry from service `HTTP` per handled request.
///
/// Delivery failures are reported on the process log only; the response is
/// returned unchanged.
pub async fn log_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let started_at = Utc::now();
    let started = Instant::now();

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or_default().to_string();
    let server_id = request
        .headers()
        .get("RBX-Server-Id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(peer)| {
            state
                .proxies
                .client_ip(peer.ip(), request.headers())
                .to_string()
        })
        .unwrap_or_default();

    let response = next.run(request).await;

    let elapsed = started.elapsed();
    let status = response.status().as_u16();
    let separator = if query.is_empty() { "" } else { "?" };
    let message = format!("{status} {method} {path}{separator}{query} {elapsed:?} {remote_addr}");

    let entry = LogEntry::new(Severity::Info, "HTTP", message)
        .at(started_at)
        .with_payload(HttpLogPayload {
            remote_addr,
            latency: i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX),
            status,
            method,
            path,
            query,
            server_id,
        });

    if let Err(e) = state.kaho.log_raw(&entry).await {
        warn!("[HTTP] failed to record request: {e}");
    }

    response
}
