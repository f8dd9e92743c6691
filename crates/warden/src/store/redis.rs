//! Redis-backed verification store.

use anyhow::{Context, Result};
use gatehouse_common::PendingVerification;
use gatehouse_common::constants::redis_keys;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::VerificationStore;

/// How long a tracked cleanup message id is retained (48 hours, comfortably
/// past the reaper's staleness ceiling)
const CLEANUP_TTL_SECS: u64 = 48 * 60 * 60;

/// Flip `passed` false→true and return the record as it was stored.
/// Runs server-side so the flow controller and the reaper cannot both
/// claim the same record.
const MARK_PASSED_SCRIPT: &str = r#"
local v = redis.call('GET', KEYS[1])
if not v then return false end
if cjson.decode(v).passed then return false end
redis.call('SET', KEYS[1], ARGV[1])
return v
"#;

/// Delete an unpassed record and return it (the reaper's claim).
const CLAIM_UNPASSED_SCRIPT: &str = r#"
local v = redis.call('GET', KEYS[1])
if not v then return false end
if cjson.decode(v).passed then return false end
redis.call('DEL', KEYS[1])
return v
"#;

/// Production store: JSON records under `pending:{chat}:{user}`.
#[derive(Clone)]
pub struct RedisStore {
    redis: ConnectionManager,
}

impl RedisStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    fn key(chat_id: i64, user_id: i64) -> String {
        format!("{}{}:{}", redis_keys::PENDING_PREFIX, chat_id, user_id)
    }

    fn cleanup_key(chat_id: i64, user_id: i64) -> String {
        format!("{}{}:{}", redis_keys::CLEANUP_PREFIX, chat_id, user_id)
    }
}

impl VerificationStore for RedisStore {
    async fn ensure(
        &self,
        chat_id: i64,
        user_id: i64,
        is_join_request: bool,
    ) -> Result<PendingVerification> {
        let mut conn = self.redis.clone();
        let key = Self::key(chat_id, user_id);

        if let Some(existing) = self.get(chat_id, user_id).await? {
            return Ok(existing);
        }

        let record = PendingVerification::new(chat_id, user_id, is_join_request);
        let data = serde_json::to_string(&record)?;

        // SET NX so a concurrent ensure for the same pair keeps the first write
        let created: bool = conn
            .set_nx(&key, &data)
            .await
            .context("Failed to store pending record")?;

        if created {
            tracing::debug!(chat_id, user_id, is_join_request, "Pending verification created");
            return Ok(record);
        }

        // Lost the race to another ensure; read whichever record won
        self.get(chat_id, user_id)
            .await?
            .context("Pending record vanished during ensure")
    }

    async fn get(&self, chat_id: i64, user_id: i64) -> Result<Option<PendingVerification>> {
        let mut conn = self.redis.clone();
        let data: Option<String> = conn.get(Self::key(chat_id, user_id)).await?;

        match data {
            Some(d) => Ok(Some(serde_json::from_str(&d)?)),
            None => Ok(None),
        }
    }

    async fn mark_passed(&self, chat_id: i64, user_id: i64) -> Result<Option<PendingVerification>> {
        let mut conn = self.redis.clone();
        let key = Self::key(chat_id, user_id);

        // The passed form of the record is pre-encoded client-side and only
        // written if the script sees an unpassed record.
        let current = self.get(chat_id, user_id).await?;
        let Some(mut record) = current else {
            return Ok(None);
        };
        if record.passed {
            return Ok(None);
        }
        record.passed = true;
        let updated = serde_json::to_string(&record)?;

        let claimed: Option<String> = redis::Script::new(MARK_PASSED_SCRIPT)
            .key(&key)
            .arg(&updated)
            .invoke_async(&mut conn)
            .await
            .context("Failed to claim pending record")?;

        match claimed {
            Some(data) => {
                let mut claimed: PendingVerification = serde_json::from_str(&data)?;
                claimed.passed = true;
                Ok(Some(claimed))
            }
            None => Ok(None),
        }
    }

    async fn claim_unpassed(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<Option<PendingVerification>> {
        let mut conn = self.redis.clone();

        let claimed: Option<String> = redis::Script::new(CLAIM_UNPASSED_SCRIPT)
            .key(Self::key(chat_id, user_id))
            .invoke_async(&mut conn)
            .await
            .context("Failed to claim pending record")?;

        match claimed {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, chat_id: i64, user_id: i64) -> Result<()> {
        let mut conn = self.redis.clone();
        let _: () = conn.del(Self::key(chat_id, user_id)).await?;
        Ok(())
    }

    async fn scan_unpassed(&self) -> Result<Vec<PendingVerification>> {
        let mut conn = self.redis.clone();

        let keys: Vec<String> = {
            let pattern = format!("{}*", redis_keys::PENDING_PREFIX);
            let mut iter = conn
                .scan_match::<_, String>(pattern)
                .await
                .context("Failed to scan pending records")?;

            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        let mut records = Vec::new();
        for key in keys {
            let data: Option<String> = conn.get(&key).await?;
            let Some(data) = data else { continue };
            match serde_json::from_str::<PendingVerification>(&data) {
                Ok(record) if !record.passed => records.push(record),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Skipping malformed pending record");
                }
            }
        }

        Ok(records)
    }

    async fn track_cleanup(&self, chat_id: i64, user_id: i64, message_id: i64) -> Result<()> {
        let mut conn = self.redis.clone();
        let _: () = conn
            .set_ex(Self::cleanup_key(chat_id, user_id), message_id, CLEANUP_TTL_SECS)
            .await?;
        Ok(())
    }

    async fn take_cleanup(&self, chat_id: i64, user_id: i64) -> Result<Option<i64>> {
        let mut conn = self.redis.clone();
        let key = Self::cleanup_key(chat_id, user_id);

        // GET + DEL for Redis 3.x compatibility (GETDEL requires Redis 6.2+)
        let message_id: Option<i64> = conn.get(&key).await?;
        let _: () = conn.del(&key).await?;

        Ok(message_id)
    }
}
