//! Serve command - run the HTTP API

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Notify;

use super::get_context;
use crate::api::{create_router, AppState};

pub async fn run(port: Option<u16>) -> Result<ExitCode> {
    let ctx = get_context()?;
    let mut server = ctx.config.server.clone();
    if let Some(port) = port {
        server.port = port;
    }

    let app = create_router(AppState::from_context(&ctx), &server);
    let addr = SocketAddr::from(([0, 0, 0, 0], server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        %addr,
        request_timeout_ms = server.request_timeout_ms,
        cors_hosts = ?server.cors_hosts,
        "wallet API listening"
    );

    // Once a shutdown signal arrives, in-flight requests get the shutdown
    // timeout to finish before the server is dropped
    let stopping = Arc::new(Notify::new());
    let serve = axum::serve(listener, app)
        .with_graceful_shutdown({
            let stopping = Arc::clone(&stopping);
            async move {
                shutdown_signal().await;
                stopping.notify_one();
            }
        })
        .into_future();
    tokio::pin!(serve);

    tokio::select! {
        result = &mut serve => result.context("Server error")?,
        _ = async {
            stopping.notified().await;
            tokio::time::sleep(server.shutdown_timeout()).await;
        } => {
            tracing::warn!(
                shutdown_timeout_ms = server.shutdown_timeout_ms,
                "shutdown timeout elapsed, dropping open connections"
            );
        }
    }

    tracing::info!("wallet API stopped");
    Ok(ExitCode::SUCCESS)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
