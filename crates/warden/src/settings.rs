//! Per-group policy lookup.
//!
//! Policy (gate on/off, welcome-mute, rules text) is configured out-of-band
//! by the host bot's settings commands; this module only reads it.

use anyhow::Result;
use gatehouse_common::GroupPolicy;
use gatehouse_common::constants::redis_keys;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

pub trait SettingsSource: Send + Sync {
    /// Policy for a group. A group with no stored policy gets the default
    /// (gate disabled), matching unmanaged chats.
    fn policy_for(&self, chat_id: i64) -> impl Future<Output = Result<GroupPolicy>> + Send;
}

#[derive(Clone)]
pub struct RedisSettings {
    redis: ConnectionManager,
}

impl RedisSettings {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

impl SettingsSource for RedisSettings {
    async fn policy_for(&self, chat_id: i64) -> Result<GroupPolicy> {
        let mut conn = self.redis.clone();
        let key = format!("{}{}", redis_keys::SETTINGS_PREFIX, chat_id);
        let data: Option<String> = conn.get(&key).await?;

        match data {
            Some(d) => Ok(serde_json::from_str(&d)?),
            None => Ok(GroupPolicy::default()),
        }
    }
}

/// Fixed in-memory policies, for tests.
#[derive(Default)]
pub struct StaticSettings {
    policies: std::collections::HashMap<i64, GroupPolicy>,
}

impl StaticSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, chat_id: i64, policy: GroupPolicy) -> Self {
        self.policies.insert(chat_id, policy);
        self
    }
}

impl SettingsSource for StaticSettings {
    async fn policy_for(&self, chat_id: i64) -> Result<GroupPolicy> {
        Ok(self.policies.get(&chat_id).cloned().unwrap_or_default())
    }
}
