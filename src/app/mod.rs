mod router;
pub mod server;
pub mod state;
pub mod tracing;

pub use router::main_router;

use crate::config;
use crate::dispatcher::{Delivery, Kaho};
use crate::domain::Severity;
use crate::error::KahoError;
use crate::proxy::{ProxyMode, TrustedProxies};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const SERVICE: &str = "GIN";

/// Application entry point. Initializes tracing, configuration, the Kaho
/// dispatcher, and serves HTTP until a shutdown signal arrives.
///
/// Returns `KahoError::Fatal` as soon as a `FATAL` entry has been logged; the
/// binary turns any error into a non-zero exit status.
pub async fn run() -> Result<(), KahoError> {
    tracing::init_tracing();

    let settings = config::get_configuration()?;
    ::tracing::info!("Loaded settings");

    let kaho = Arc::new(state::build_kaho(&settings).await?);

    let proxies = trusted_proxies(&kaho, &settings.proxy).await?;
    let app = main_router(state::AppState::new(Arc::clone(&kaho), proxies));

    let banner = format!("Listening and Serving HTTP on :{}", settings.http_port);
    log_startup(&kaho, Severity::Default, &banner, None).await?;

    let listener = match server::bind(settings.http_port).await {
        Ok(listener) => listener,
        Err(e) => {
            let detail = json!(e.to_string());
            log_startup(&kaho, Severity::Fatal, "Failed to start HTTP Server", Some(detail)).await?;
            return Err(e);
        }
    };

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        server::shutdown_signal().await;
        signal_token.cancel();
    });

    server::serve(listener, app, shutdown_token).await
}

/// Log a startup entry and stop startup if it was fatal.
async fn log_startup(
    kaho: &Kaho,
    severity: Severity,
    message: &str,
    payload: Option<Value>,
) -> Result<(), KahoError> {
    match kaho.log(severity, SERVICE, message, payload).await {
        Delivery::Continue => Ok(()),
        Delivery::Terminate => Err(KahoError::Fatal {
            service: SERVICE.to_string(),
            message: message.to_string(),
        }),
    }
}

async fn trusted_proxies(kaho: &Kaho, mode: &str) -> Result<TrustedProxies, KahoError> {
    match mode.parse::<ProxyMode>() {
        Ok(ProxyMode::None) => {
            log_startup(kaho, Severity::Warning, "Running With No Proxy", None).await?;
            Ok(TrustedProxies::none())
        }
        Ok(ProxyMode::Cloudflare) => match TrustedProxies::cloudflare().await {
            Ok(proxies) => {
                let detail = json!({ "ranges": proxies.len() });
                log_startup(kaho, Severity::Debug, "Using Cloudflare as Proxy", Some(detail))
                    .await?;
                Ok(proxies)
            }
            Err(e) => {
                let detail = json!(e.to_string());
                log_startup(kaho, Severity::Fatal, "Failed to get Cloudflare Proxies", Some(detail))
                    .await?;
                Err(e)
            }
        },
        Err(_) => {
            log_startup(
                kaho,
                Severity::Fatal,
                "Unsupported Proxy Mode, allowed values are: cloudflare, none",
                None,
            )
            .await?;
            Ok(TrustedProxies::none())
        }
    }
}
