//! Application builder: wires router, middleware, and state into an Axum app
//! and runs it until a shutdown signal arrives.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use sensorhub_core::config::AppConfig;
use sensorhub_core::error::{AppError, ErrorKind};
use sensorhub_core::result::AppResult;
use sensorhub_realtime::server::RealtimeEngine;

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Runs the SensorHub server with the given configuration.
///
/// Returns once a shutdown signal has been received, every WebSocket client
/// has been closed, and in-flight HTTP requests have drained.
pub async fn run_server(config: AppConfig) -> AppResult<()> {
    tracing::info!("Starting SensorHub server...");

    let realtime = RealtimeEngine::new(&config.realtime);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, realtime);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Internal, format!("Failed to bind {addr}"), e)
        })?;

    tracing::info!(addr = %addr, "SensorHub server listening");

    serve_until(listener, state, shutdown_signal()).await?;

    tracing::info!("SensorHub server stopped");
    Ok(())
}

/// Serve `state` on `listener` until `signal` resolves.
///
/// When the signal fires, the realtime engine closes every client (bounded by
/// `server.shutdown_grace_seconds`) before the HTTP side drains.
pub async fn serve_until<F>(listener: TcpListener, state: AppState, signal: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let realtime = Arc::clone(&state.realtime);
    let grace = Duration::from_secs(state.config.server.shutdown_grace_seconds);
    let app = build_app(state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        signal.await;
        close_realtime(&realtime, grace).await;
    })
    .await
    .map_err(|e| AppError::internal(format!("Server error: {e}")))
}

async fn close_realtime(realtime: &RealtimeEngine, grace: Duration) {
    match tokio::time::timeout(grace, realtime.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Realtime engine shutdown failed"),
        Err(_) => tracing::warn!(
            grace_seconds = grace.as_secs(),
            "Realtime engine did not shut down within the grace period"
        ),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
