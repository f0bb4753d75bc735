//! Server startup and graceful shutdown

use crate::setup::App;
use anyhow::Result;
use gouvre_core::Config;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

/// Serve `app` until SIGINT/SIGTERM, then stop background tasks.
pub async fn start_server(config: &Config, app: App) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port);
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        base_url = %config.base_url,
        storage_path = %config.storage_path,
        cleanup_interval_secs = config.cleanup_interval_secs,
        "Server ready and accepting connections"
    );

    let App {
        router,
        shutdown,
        cleanup_task,
        ..
    } = app;

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await?;

    shutdown.cancel();
    if let Some(task) = cleanup_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Link cleanup task ended abnormally");
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C (SIGINT), SIGTERM, or when `shutdown` is cancelled elsewhere.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
        _ = shutdown.cancelled() => {},
    }

    tracing::info!("Shutting down gracefully...");
    shutdown.cancel();
}
