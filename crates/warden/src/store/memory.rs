//! In-memory verification store.
//!
//! Backs tests and single-process development runs with the same claim
//! semantics as the Redis store.

use std::collections::HashMap;

use anyhow::Result;
use gatehouse_common::PendingVerification;
use tokio::sync::RwLock;

use super::VerificationStore;

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(i64, i64), PendingVerification>>,
    cleanup: RwLock<HashMap<(i64, i64), i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record verbatim, bypassing `ensure`'s timestamping.
    #[cfg(test)]
    pub async fn insert_for_test(&self, record: PendingVerification) {
        self.records
            .write()
            .await
            .insert((record.chat_id, record.user_id), record);
    }
}

impl VerificationStore for MemoryStore {
    async fn ensure(
        &self,
        chat_id: i64,
        user_id: i64,
        is_join_request: bool,
    ) -> Result<PendingVerification> {
        let mut records = self.records.write().await;
        let record = records
            .entry((chat_id, user_id))
            .or_insert_with(|| PendingVerification::new(chat_id, user_id, is_join_request));
        Ok(record.clone())
    }

    async fn get(&self, chat_id: i64, user_id: i64) -> Result<Option<PendingVerification>> {
        Ok(self.records.read().await.get(&(chat_id, user_id)).cloned())
    }

    async fn mark_passed(&self, chat_id: i64, user_id: i64) -> Result<Option<PendingVerification>> {
        let mut records = self.records.write().await;
        match records.get_mut(&(chat_id, user_id)) {
            Some(record) if !record.passed => {
                record.passed = true;
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn claim_unpassed(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<Option<PendingVerification>> {
        let mut records = self.records.write().await;
        let passed = records.get(&(chat_id, user_id)).map(|r| r.passed);
        match passed {
            Some(false) => Ok(records.remove(&(chat_id, user_id))),
            _ => Ok(None),
        }
    }

    async fn remove(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.records.write().await.remove(&(chat_id, user_id));
        Ok(())
    }

    async fn scan_unpassed(&self) -> Result<Vec<PendingVerification>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| !r.passed)
            .cloned()
            .collect())
    }

    async fn track_cleanup(&self, chat_id: i64, user_id: i64, message_id: i64) -> Result<()> {
        self.cleanup.write().await.insert((chat_id, user_id), message_id);
        Ok(())
    }

    async fn take_cleanup(&self, chat_id: i64, user_id: i64) -> Result<Option<i64>> {
        Ok(self.cleanup.write().await.remove(&(chat_id, user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.ensure(-1, 7, false).await.unwrap();
        let second = store.ensure(-1, 7, true).await.unwrap();

        // Same record, is_join_request from the first call wins
        assert_eq!(first, second);
        assert_eq!(store.scan_unpassed().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ensure_never_resets_passed() {
        let store = MemoryStore::new();
        store.ensure(-1, 7, false).await.unwrap();
        assert!(store.mark_passed(-1, 7).await.unwrap().is_some());

        let again = store.ensure(-1, 7, false).await.unwrap();
        assert!(again.passed);
        assert!(store.scan_unpassed().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_passed_claims_only_once() {
        let store = MemoryStore::new();
        store.ensure(-1, 7, false).await.unwrap();

        let first = store.mark_passed(-1, 7).await.unwrap();
        assert!(first.is_some_and(|r| r.passed));
        // Second claim finds an already-resolved record
        assert!(store.mark_passed(-1, 7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_unpassed_excludes_passed_records() {
        let store = MemoryStore::new();
        store.ensure(-1, 7, false).await.unwrap();
        store.ensure(-1, 8, false).await.unwrap();
        store.mark_passed(-1, 7).await.unwrap();

        assert!(store.claim_unpassed(-1, 7).await.unwrap().is_none());
        let claimed = store.claim_unpassed(-1, 8).await.unwrap().unwrap();
        assert_eq!(claimed.user_id, 8);
        // Claim removed the record
        assert!(store.get(-1, 8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_is_unconditional() {
        let store = MemoryStore::new();
        store.ensure(-1, 7, false).await.unwrap();
        store.mark_passed(-1, 7).await.unwrap();

        // Unlike claim_unpassed, remove drops passed records too
        store.remove(-1, 7).await.unwrap();
        assert!(store.get(-1, 7).await.unwrap().is_none());

        // Removing an absent record is a no-op
        store.remove(-1, 7).await.unwrap();
    }

    #[tokio::test]
    async fn cleanup_map_is_take_once() {
        let store = MemoryStore::new();
        store.track_cleanup(-1, 7, 4242).await.unwrap();
        assert_eq!(store.take_cleanup(-1, 7).await.unwrap(), Some(4242));
        assert_eq!(store.take_cleanup(-1, 7).await.unwrap(), None);
    }
}
