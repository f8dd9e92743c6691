//! Application state and shared resources.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;

use crate::config::AppConfig;
use crate::flow::FlowController;
use crate::platform::RedisPlatform;
use crate::puzzle::{JpegRenderer, SessionMap};
use crate::settings::RedisSettings;
use crate::store::RedisStore;

/// Production flow controller wiring
pub type Flow = FlowController<RedisStore, RedisPlatform, RedisSettings, JpegRenderer>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Redis connection manager (auto-reconnecting)
    pub redis: ConnectionManager,

    /// Verification flow controller
    pub flow: Arc<Flow>,
}

impl AppState {
    /// Create new application state, connecting to Redis
    pub async fn new(config: AppConfig) -> Result<Self> {
        // Connect to Redis with connection manager (handles reconnection)
        let client = redis::Client::open(config.redis_url.as_str())
            .context("Failed to create Redis client")?;

        let redis = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        let verification = &config.verification;
        let font_path = crate::puzzle::resolve_font_path(&verification.font_path)?;
        let renderer = JpegRenderer::from_font_path(&font_path, verification.jpeg_quality)?;
        let sessions = Arc::new(SessionMap::new(Duration::from_secs(
            verification.session_ttl_secs,
        )));

        let flow = Arc::new(FlowController::new(
            RedisStore::new(redis.clone()),
            RedisPlatform::new(redis.clone()),
            RedisSettings::new(redis.clone()),
            renderer,
            sessions,
        ));

        Ok(Self {
            config,
            redis,
            flow,
        })
    }
}
