//! Gravity bot entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use gravity_bot::{build_router, AppState, Handler, TelegramChannel};
use gravity_common::logging::init_logging;
use gravity_common::Config;
use gravity_core::provider::GroqProvider;
use gravity_core::session::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_logging(&config.log_level, &config.log_format);

    tracing::info!("Gravity bot v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(match &config.session_dir {
        Some(dir) => SessionStore::with_snapshot_dir(dir.clone()),
        None => SessionStore::new(),
    });
    let channel = Arc::new(TelegramChannel::new(&config.telegram_bot_token));
    let provider = Arc::new(GroqProvider::new(
        &config.groq_api_key,
        Duration::from_secs(config.completion_timeout_secs),
    ));

    let handler = Arc::new(Handler::new(channel, provider, store));
    let app = build_router(Arc::new(AppState { handler }));

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .context("invalid bind address")?;

    tracing::info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind")?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
}
