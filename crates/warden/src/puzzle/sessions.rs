//! Ephemeral per-conversation puzzle sessions.
//!
//! Sessions are in-process state keyed by (chat, user), wholly separate from
//! the durable pending-verification store. An entry past its TTL behaves as
//! if no session exists, which surfaces the "please restart" path upstream.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::PuzzleSession;

/// Where the user is within one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Puzzle shown; rotate/confirm are live
    Puzzle(PuzzleSession),
    /// Puzzle solved; waiting on the rules agree control
    Rules,
}

#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub stage: Stage,
    /// Correlation id of the prompt message being edited in place
    pub prompt_message_id: i64,
    created_at: Instant,
}

/// Shared map of live verification sessions.
pub struct SessionMap {
    inner: RwLock<HashMap<(i64, i64), SessionEntry>>,
    ttl: Duration,
}

impl SessionMap {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Start (or wholesale replace) the session for a (chat, user) pair.
    pub async fn insert(&self, chat_id: i64, user_id: i64, session: PuzzleSession, prompt_message_id: i64) {
        let entry = SessionEntry {
            stage: Stage::Puzzle(session),
            prompt_message_id,
            created_at: Instant::now(),
        };
        self.inner.write().await.insert((chat_id, user_id), entry);
    }

    /// Fetch a live session entry; expired entries are dropped on access.
    pub async fn get(&self, chat_id: i64, user_id: i64) -> Option<SessionEntry> {
        let key = (chat_id, user_id);
        let mut map = self.inner.write().await;
        match map.get(&key) {
            Some(entry) if entry.created_at.elapsed() <= self.ttl => Some(entry.clone()),
            Some(_) => {
                map.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Replace the puzzle within an existing entry (rotation/regeneration).
    /// No-op when the session has already expired or been removed.
    pub async fn update_puzzle(&self, chat_id: i64, user_id: i64, session: PuzzleSession) {
        if let Some(entry) = self.inner.write().await.get_mut(&(chat_id, user_id)) {
            entry.stage = Stage::Puzzle(session);
        }
    }

    /// Advance the entry to the rules-acknowledgment stage.
    pub async fn advance_to_rules(&self, chat_id: i64, user_id: i64) {
        if let Some(entry) = self.inner.write().await.get_mut(&(chat_id, user_id)) {
            entry.stage = Stage::Rules;
        }
    }

    pub async fn remove(&self, chat_id: i64, user_id: i64) {
        self.inner.write().await.remove(&(chat_id, user_id));
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::generate;

    #[test]
    fn expired_sessions_vanish_on_access() {
        tokio_test::block_on(async {
            let map = SessionMap::new(Duration::ZERO);
            map.insert(-1, 7, generate(), 100).await;
            // TTL of zero: already expired by the time we look
            assert!(map.get(-1, 7).await.is_none());
            assert_eq!(map.len().await, 0);
        });
    }

    #[test]
    fn sessions_are_keyed_per_chat_and_user() {
        tokio_test::block_on(async {
            let map = SessionMap::new(Duration::from_secs(60));
            map.insert(-1, 7, generate(), 100).await;
            map.insert(-2, 7, generate(), 200).await;

            assert!(map.get(-1, 7).await.is_some());
            assert!(map.get(-2, 7).await.is_some());
            assert!(map.get(-1, 8).await.is_none());

            map.remove(-1, 7).await;
            assert!(map.get(-1, 7).await.is_none());
            assert!(map.get(-2, 7).await.is_some());
        });
    }

    #[test]
    fn stage_advances_to_rules() {
        tokio_test::block_on(async {
            let map = SessionMap::new(Duration::from_secs(60));
            map.insert(-1, 7, generate(), 100).await;
            map.advance_to_rules(-1, 7).await;
            let entry = map.get(-1, 7).await.unwrap();
            assert_eq!(entry.stage, Stage::Rules);
            assert_eq!(entry.prompt_message_id, 100);
        });
    }
}
