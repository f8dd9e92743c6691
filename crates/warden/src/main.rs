//! # Warden - Gatehouse verification service
//!
//! Gates new members of managed groups behind an emoji-matching puzzle:
//! mute on entry, interactive solve via inline controls, timeout reaping of
//! abandoned attempts, and a private-message lock until verification passes.
//!
//! ## Architecture
//! ```text
//! Bot dispatcher → Warden → Redis (state + outbound queue) → Transport
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod flow;
mod platform;
mod puzzle;
mod reaper;
mod routes;
mod settings;
mod state;
mod store;

use config::AppConfig;
use platform::RedisPlatform;
use reaper::{Reaper, reaper_worker};
use state::AppState;
use store::RedisStore;

/// Gatehouse Warden - new-member verification service
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/warden.toml")]
    config: String,

    /// Redis URL (overrides config)
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("🛡️ Starting Gatehouse Warden v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!("📋 Configuration loaded from {}", args.config);

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Initialize application state
    let state = AppState::new(config.clone()).await?;
    info!("✅ Redis connected: {}", config.redis_url);

    // Spawn the timeout reaper on its own timer
    let verification = &config.verification;
    let reaper = Arc::new(Reaper::new(
        RedisStore::new(state.redis.clone()),
        RedisPlatform::new(state.redis.clone()),
        verification.ban_timeout_secs,
        verification.stale_ceiling_secs,
    ));
    let reaper_interval = verification.reaper_interval_secs;
    let reaper_shutdown = shutdown_tx.subscribe();
    tokio::spawn(async move {
        reaper_worker(reaper, reaper_interval, reaper_shutdown).await;
    });

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("🚀 Warden listening on {}", config.listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("🛑 Shutdown signal received");
        let _ = shutdown_tx.send(());
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("👋 Warden shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}
