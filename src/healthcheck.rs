//! Client side of `kaho healthcheck`, used as the container health probe.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_HTTP_PORT: u16 = 9600;
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum HealthcheckError {
    #[error("Healthcheck failed: could not build client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Healthcheck failed: {url} unreachable: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Healthcheck failed: {url} answered {status}")]
    Unhealthy { url: String, status: StatusCode },
}

/// Probe the local server on `HTTP_PORT`, or 9600 when unset or invalid.
pub async fn healthcheck() -> Result<(), HealthcheckError> {
    let port = std::env::var("HTTP_PORT")
        .ok()
        .and_then(|port| port.parse::<u16>().ok())
        .filter(|port| *port != 0)
        .unwrap_or(DEFAULT_HTTP_PORT);
    healthcheck_with_port(port).await
}

pub async fn healthcheck_with_port(port: u16) -> Result<(), HealthcheckError> {
    let client = reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .map_err(HealthcheckError::Client)?;

    let url = format!("http://127.0.0.1:{port}/v1/health");
    let status = match client.get(&url).send().await {
        Ok(response) => response.status(),
        Err(source) => return Err(HealthcheckError::Unreachable { url, source }),
    };

    if status.is_success() {
        Ok(())
    } else {
        Err(HealthcheckError::Unhealthy { url, status })
    }
}
