//! Shared constants for Gatehouse components.

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default Warden HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8787";

/// Time an unverified user has before the reaper bans/declines (10 minutes)
pub const DEFAULT_BAN_TIMEOUT_SECS: u64 = 600;

/// Records older than this are dropped without punitive action (36 hours)
pub const DEFAULT_STALE_CEILING_SECS: u64 = 36 * 60 * 60;

/// Reaper scan interval (10 minutes)
pub const DEFAULT_REAPER_INTERVAL_SECS: u64 = 600;

/// Puzzle session validity (30 minutes)
pub const DEFAULT_SESSION_TTL_SECS: u64 = 1800;

/// Redis key prefixes
pub mod redis_keys {
    /// Pending verification record: pending:{chat_id}:{user_id}
    pub const PENDING_PREFIX: &str = "pending:";

    /// Cleanup message id: cleanup:{chat_id}:{user_id}
    pub const CLEANUP_PREFIX: &str = "cleanup:";

    /// Per-group policy: settings:{chat_id}
    pub const SETTINGS_PREFIX: &str = "settings:";

    /// Group admin set: admins:{chat_id}
    pub const ADMINS_PREFIX: &str = "admins:";

    /// Outbound platform command queue (list)
    pub const OUTBOUND_QUEUE: &str = "outbound:commands";

    /// Prompt correlation id counter
    pub const PROMPT_ID_COUNTER: &str = "outbound:prompt_id";
}
