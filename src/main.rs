//! Redis Shard Proxy - HTTP front end
//!
//! Loads the shard topology, then serves:
//! - GET/PUT /kv/{key} routed to each shard's read/write pool
//! - /health, /ready and /shards for orchestration
//! - /metrics in Prometheus format

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use redis_shard_proxy::config::ProxyConfig;
use redis_shard_proxy::metrics::ProxyMetrics;
use redis_shard_proxy::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first to get log level
    let proxy_config = ProxyConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("redis_shard_proxy={}", proxy_config.log_level).parse()?),
        )
        .json()
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        shards = proxy_config.shards.len(),
        router = ?proxy_config.router,
        "Starting shard proxy"
    );

    let metrics = Arc::new(ProxyMetrics::install()?);
    info!("Prometheus metrics initialized");

    // All shards are registered before the proxy is shared
    let proxy = Arc::new(proxy_config.build_proxy()?);
    info!(shard_count = proxy.shard_count(), "Shards registered");

    let app_state = AppState::new(Arc::clone(&proxy), Arc::clone(&metrics));
    let app = server::router(app_state);
    let addr: SocketAddr = ([0, 0, 0, 0], proxy_config.http_port).into();

    info!(port = proxy_config.http_port, "Starting HTTP server");

    let http_server = axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = http_server.await {
        error!(error = %e, "HTTP server error");
    }

    info!("Shutting down shard proxy...");
    proxy.shutdown();

    info!("Shard proxy shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
