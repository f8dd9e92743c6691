//! Configuration management for Warden.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use gatehouse_common::constants::{
    DEFAULT_BAN_TIMEOUT_SECS, DEFAULT_LISTEN_ADDR, DEFAULT_REAPER_INTERVAL_SECS,
    DEFAULT_REDIS_URL, DEFAULT_SESSION_TTL_SECS, DEFAULT_STALE_CEILING_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Verification flow configuration
    #[serde(default)]
    pub verification: VerificationConfig,
}

/// Verification-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    /// Path to the glyph font used for puzzle rendering. When the path does
    /// not exist, startup falls back to the system DejaVu Sans locations.
    #[serde(default = "default_font_path")]
    pub font_path: String,

    /// JPEG quality for rendered puzzles (small payloads win)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Puzzle session validity in seconds
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Time an unverified user has before the reaper acts
    #[serde(default = "default_ban_timeout")]
    pub ban_timeout_secs: u64,

    /// Records older than this are dropped without punitive action
    #[serde(default = "default_stale_ceiling")]
    pub stale_ceiling_secs: u64,

    /// Reaper sweep interval in seconds
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_secs: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            font_path: default_font_path(),
            jpeg_quality: default_jpeg_quality(),
            session_ttl_secs: default_session_ttl(),
            ban_timeout_secs: default_ban_timeout(),
            stale_ceiling_secs: default_stale_ceiling(),
            reaper_interval_secs: default_reaper_interval(),
        }
    }
}

// Default value functions
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_font_path() -> String { "assets/fonts/DejaVuSans.ttf".to_string() }
fn default_jpeg_quality() -> u8 { 60 }
fn default_session_ttl() -> u64 { DEFAULT_SESSION_TTL_SECS }
fn default_ban_timeout() -> u64 { DEFAULT_BAN_TIMEOUT_SECS }
fn default_stale_ceiling() -> u64 { DEFAULT_STALE_CEILING_SECS }
fn default_reaper_interval() -> u64 { DEFAULT_REAPER_INTERVAL_SECS }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref redis_url) = args.redis_url {
            config.redis_url = redis_url.clone();
        }
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            listen_addr: default_listen_addr(),
            verification: VerificationConfig::default(),
        }
    }
}
