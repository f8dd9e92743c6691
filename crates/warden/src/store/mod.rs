//! Pending-verification store.
//!
//! One durable record per (user, chat) awaiting verification. Mutated by two
//! independent actors (the interactive flow and the timeout reaper), so both
//! terminal transitions are atomic claims: whichever actor claims a record
//! first is the sole authority for its outcome.

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use anyhow::Result;
use gatehouse_common::PendingVerification;

pub trait VerificationStore: Send + Sync {
    /// Idempotent create-if-absent keyed by (chat, user). Never resets
    /// `passed` on an existing record.
    fn ensure(
        &self,
        chat_id: i64,
        user_id: i64,
        is_join_request: bool,
    ) -> impl Future<Output = Result<PendingVerification>> + Send;

    fn get(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<PendingVerification>>> + Send;

    /// Atomically flip `passed` false→true. Returns the claimed record, or
    /// `None` when it was missing or already resolved.
    fn mark_passed(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<PendingVerification>>> + Send;

    /// Atomically delete an unpassed record (reaper's claim). Returns the
    /// claimed record, or `None` when it was missing or already passed.
    fn claim_unpassed(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<PendingVerification>>> + Send;

    /// Unconditional removal
    fn remove(&self, chat_id: i64, user_id: i64) -> impl Future<Output = Result<()>> + Send;

    /// All records with `passed=false`, for the reaper's scan
    fn scan_unpassed(&self) -> impl Future<Output = Result<Vec<PendingVerification>>> + Send;

    /// Remember a transient message id for best-effort cleanup on completion
    fn track_cleanup(
        &self,
        chat_id: i64,
        user_id: i64,
        message_id: i64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Take (and forget) the tracked cleanup message id
    fn take_cleanup(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<i64>>> + Send;
}
