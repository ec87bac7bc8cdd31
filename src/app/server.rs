use crate::error::KahoError;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn bind(port: u16) -> Result<TcpListener, KahoError> {
    let address = format!("0.0.0.0:{port}");
    TcpListener::bind(&address)
        .await
        .map_err(|source| KahoError::Bind { address, source })
}

/// Serve `app` until `shutdown_token` is cancelled.
///
/// Peer addresses are attached to each request for the request logger.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown_token: CancellationToken,
) -> Result<(), KahoError> {
    info!("Server listening on {}", listener.local_addr()?);
    info!("  - GET  /v1/health     (health check)");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_token.cancelled_owned())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C) for graceful shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
