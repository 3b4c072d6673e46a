//! MobilizaSP HTTP Server
//!
//! Main entry point for the HTTP API server.

use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use infrastructure::{AppConfig, init_telemetry};
use presentation_http::{create_app, middleware::spawn_cleanup_task, state::AppState};
use tokio::{net::TcpListener, signal};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;

    info!("MobilizaSP v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.server.host,
        port = %config.server.port,
        sptrans = %config.sptrans.base_url,
        "Configuration loaded"
    );

    let state = AppState::from_config(&config).context("Failed to initialize services")?;

    let (app, limiter_state) = create_app(state, &config.server);
    if config.server.rate_limit_enabled {
        spawn_cleanup_task(
            limiter_state,
            config.server.rate_limit_cleanup_interval(),
            config.server.rate_limit_cleanup_max_age(),
        );
        info!(
            rpm = config.server.rate_limit_rpm,
            "Per-client rate limiting enabled"
        );
    }

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout()))
    .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    info!("Waiting up to {:?} for connections to close...", timeout);
}
