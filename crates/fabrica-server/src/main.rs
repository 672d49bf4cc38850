use std::time::Duration;

use anyhow::Context;
use fabrica_server::{AppConfig, observability, routes};

/// Time allowed for in-flight queue operations to drain on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = match std::env::var("FABRICA_CONFIG") {
        Ok(path) => AppConfig::from_toml_file(&path)
            .with_context(|| format!("loading config from {path}"))?,
        Err(_) => AppConfig::default(),
    };

    observability::init_tracing_with_level(&config.logging.level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting fabrica-server");

    let runtime = fabrica_server::build(&config, None).await;
    let router = routes::router(runtime.state.clone());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shutting down");
    runtime.broker.shutdown(SHUTDOWN_GRACE).await;
    runtime.cache.quit().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to install shutdown signal handler");
    }
}
