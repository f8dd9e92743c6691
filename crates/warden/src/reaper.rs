//! Timeout reaper.
//!
//! Periodic job that resolves pending records the interactive flow never
//! finished: ban (or decline the join request of) users who ran out the
//! clock, and silently drop records old enough to predate extended downtime.
//! Runs independently of the flow controller, possibly in another process
//! sharing the same store; every removal is an atomic claim.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use gatehouse_common::PendingVerification;

use crate::platform::ChatPlatform;
use crate::store::VerificationStore;

/// What to do with one unpassed record of a given age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapAction {
    /// Too early; leave the record for a later sweep
    Skip,
    /// Ban, or decline the join request, then remove
    Punish,
    /// Older than the staleness ceiling; remove without punitive action
    Drop,
}

/// Age-based decision table for the sweep.
pub fn decide(age_secs: i64, ban_timeout_secs: u64, stale_ceiling_secs: u64) -> ReapAction {
    if age_secs < ban_timeout_secs as i64 {
        ReapAction::Skip
    } else if age_secs <= stale_ceiling_secs as i64 {
        ReapAction::Punish
    } else {
        ReapAction::Drop
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub skipped: usize,
    pub punished: usize,
    pub dropped: usize,
}

pub struct Reaper<S, P> {
    store: S,
    platform: P,
    ban_timeout_secs: u64,
    stale_ceiling_secs: u64,
}

impl<S, P> Reaper<S, P>
where
    S: VerificationStore,
    P: ChatPlatform,
{
    pub fn new(store: S, platform: P, ban_timeout_secs: u64, stale_ceiling_secs: u64) -> Self {
        Self {
            store,
            platform,
            ban_timeout_secs,
            stale_ceiling_secs,
        }
    }

    /// One full scan over unpassed records. Platform failures are logged
    /// and never abort the sweep; the claim removes the record regardless.
    pub async fn sweep(&self) -> Result<SweepStats> {
        let records = self.store.scan_unpassed().await?;
        let now = chrono::Utc::now().timestamp();

        let mut stats = SweepStats {
            scanned: records.len(),
            ..SweepStats::default()
        };

        for record in records {
            match decide(record.age_secs(now), self.ban_timeout_secs, self.stale_ceiling_secs) {
                ReapAction::Skip => stats.skipped += 1,
                ReapAction::Punish => {
                    let Some(claimed) = self
                        .store
                        .claim_unpassed(record.chat_id, record.user_id)
                        .await?
                    else {
                        // The flow controller resolved it since the scan
                        continue;
                    };
                    self.punish(&claimed).await;
                    stats.punished += 1;
                }
                ReapAction::Drop => {
                    let claimed = self
                        .store
                        .claim_unpassed(record.chat_id, record.user_id)
                        .await?;
                    if claimed.is_some() {
                        tracing::debug!(
                            chat_id = record.chat_id,
                            user_id = record.user_id,
                            "Stale pending record dropped without punitive action"
                        );
                        stats.dropped += 1;
                    }
                }
            }
        }

        if stats.punished > 0 || stats.dropped > 0 {
            tracing::info!(
                scanned = stats.scanned,
                punished = stats.punished,
                dropped = stats.dropped,
                "Reaper sweep finished"
            );
        }

        Ok(stats)
    }

    async fn punish(&self, record: &PendingVerification) {
        let result = if record.is_join_request {
            self.platform
                .decline_join_request(record.chat_id, record.user_id)
                .await
        } else {
            self.platform.ban(record.chat_id, record.user_id).await
        };

        match result {
            Ok(()) => tracing::info!(
                chat_id = record.chat_id,
                user_id = record.user_id,
                is_join_request = record.is_join_request,
                "Unverified user timed out"
            ),
            Err(e) => tracing::warn!(
                chat_id = record.chat_id,
                user_id = record.user_id,
                error = %e,
                "Punitive platform call failed; record removed anyway"
            ),
        }
    }
}

/// Background worker that runs the sweep on a fixed interval.
pub async fn reaper_worker<S, P>(
    reaper: Arc<Reaper<S, P>>,
    interval_secs: u64,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) where
    S: VerificationStore,
    P: ChatPlatform,
{
    tracing::info!(interval_secs, "Reaper worker started");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(interval_secs)) => {
                if let Err(e) = reaper.sweep().await {
                    tracing::error!(error = %e, "Reaper sweep error");
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Reaper worker shutting down...");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use gatehouse_common::PendingVerification;

    use super::*;
    use crate::flow::testutil::{MockPlatform, PlatformCall};
    use crate::store::{MemoryStore, VerificationStore};

    const BAN_TIMEOUT: u64 = 600;
    const STALE_CEILING: u64 = 36 * 60 * 60;
    const CHAT: i64 = -1001;

    #[test]
    fn decision_boundaries() {
        let t = BAN_TIMEOUT as i64;
        let ceiling = STALE_CEILING as i64;

        assert_eq!(decide(t - 1, BAN_TIMEOUT, STALE_CEILING), ReapAction::Skip);
        assert_eq!(decide(t, BAN_TIMEOUT, STALE_CEILING), ReapAction::Punish);
        assert_eq!(decide(t + 1, BAN_TIMEOUT, STALE_CEILING), ReapAction::Punish);
        assert_eq!(decide(ceiling, BAN_TIMEOUT, STALE_CEILING), ReapAction::Punish);
        assert_eq!(decide(ceiling + 1, BAN_TIMEOUT, STALE_CEILING), ReapAction::Drop);
    }

    fn record_aged(user_id: i64, age_secs: i64, is_join_request: bool) -> PendingVerification {
        let mut record = PendingVerification::new(CHAT, user_id, is_join_request);
        record.added_at = chrono::Utc::now().timestamp() - age_secs;
        record
    }

    #[tokio::test]
    async fn sweep_applies_the_decision_table() {
        let store = MemoryStore::new();
        let timeout = BAN_TIMEOUT as i64;

        store.insert_for_test(record_aged(1, timeout - 60, false)).await;
        store.insert_for_test(record_aged(2, timeout + 60, false)).await;
        store.insert_for_test(record_aged(3, timeout + 60, true)).await;
        store.insert_for_test(record_aged(4, STALE_CEILING as i64 + 60, false)).await;

        let reaper = Reaper::new(store, MockPlatform::new(), BAN_TIMEOUT, STALE_CEILING);
        let stats = reaper.sweep().await.unwrap();

        assert_eq!(stats.scanned, 4);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.punished, 2);
        assert_eq!(stats.dropped, 1);

        // Direct join is banned; join request is declined
        assert!(reaper.platform.saw(|c| matches!(c, PlatformCall::Ban { user_id: 2, .. })));
        assert!(reaper.platform.saw(|c| matches!(
            c,
            PlatformCall::DeclineJoinRequest { user_id: 3, .. }
        )));
        // The stale record got no punitive call
        assert!(!reaper.platform.saw(|c| matches!(c, PlatformCall::Ban { user_id: 4, .. })));

        // Too-early record survives, the rest are gone
        assert!(reaper.store.get(CHAT, 1).await.unwrap().is_some());
        for user_id in [2, 3, 4] {
            assert!(reaper.store.get(CHAT, user_id).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn passed_records_are_never_reaped() {
        let store = MemoryStore::new();
        store.insert_for_test(record_aged(1, BAN_TIMEOUT as i64 + 60, false)).await;
        store.mark_passed(CHAT, 1).await.unwrap();

        let reaper = Reaper::new(store, MockPlatform::new(), BAN_TIMEOUT, STALE_CEILING);
        let stats = reaper.sweep().await.unwrap();

        assert_eq!(stats.scanned, 0);
        assert!(reaper.store.get(CHAT, 1).await.unwrap().is_some());
        assert!(!reaper.platform.saw(|c| matches!(c, PlatformCall::Ban { .. })));
    }
}
