//! Message lock for unverified users.
//!
//! Private messages from a user with an outstanding pending record are
//! deleted before any further handler sees them. Puzzle interaction happens
//! through button callbacks, so the gate itself is unaffected.

use anyhow::Result;
use serde::Serialize;

use crate::platform::ChatPlatform;
use crate::store::VerificationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageVerdict {
    /// Hand the message on to the rest of the pipeline
    Allowed,
    /// Message deleted; do not forward
    Suppressed,
}

/// Gate an inbound private message. `chat_id` is the user's own private
/// conversation, which is the key the pending record is looked up under.
pub async fn handle_private_message<S, P>(
    store: &S,
    platform: &P,
    chat_id: i64,
    user_id: i64,
    message_id: i64,
) -> Result<MessageVerdict>
where
    S: VerificationStore,
    P: ChatPlatform,
{
    if platform.is_admin(chat_id, user_id).await.unwrap_or(false) {
        return Ok(MessageVerdict::Allowed);
    }

    match store.get(chat_id, user_id).await? {
        Some(record) if !record.passed => {
            if let Err(e) = platform.delete_message(chat_id, message_id).await {
                tracing::warn!(chat_id, user_id, message_id, error = %e, "Failed to delete locked message");
            }
            tracing::debug!(chat_id, user_id, message_id, "Message from unverified user suppressed");
            Ok(MessageVerdict::Suppressed)
        }
        _ => Ok(MessageVerdict::Allowed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::testutil::{MockPlatform, PlatformCall};
    use crate::store::MemoryStore;

    const CHAT: i64 = 77; // private chat mirrors the user id
    const USER: i64 = 77;

    #[tokio::test]
    async fn unverified_user_message_is_deleted() {
        let store = MemoryStore::new();
        let platform = MockPlatform::new();
        store.ensure(CHAT, USER, false).await.unwrap();

        let verdict = handle_private_message(&store, &platform, CHAT, USER, 555)
            .await
            .unwrap();

        assert_eq!(verdict, MessageVerdict::Suppressed);
        assert!(platform.saw(|c| matches!(
            c,
            PlatformCall::DeleteMessage { chat_id: CHAT, message_id: 555 }
        )));
    }

    #[tokio::test]
    async fn admin_message_passes_through() {
        let store = MemoryStore::new();
        let platform = MockPlatform::new().with_admin(CHAT, USER);
        store.ensure(CHAT, USER, false).await.unwrap();

        let verdict = handle_private_message(&store, &platform, CHAT, USER, 555)
            .await
            .unwrap();

        assert_eq!(verdict, MessageVerdict::Allowed);
        assert!(!platform.saw(|c| matches!(c, PlatformCall::DeleteMessage { .. })));
    }

    #[tokio::test]
    async fn verified_and_unknown_users_pass_through() {
        let store = MemoryStore::new();
        let platform = MockPlatform::new();

        // No record at all
        let verdict = handle_private_message(&store, &platform, CHAT, USER, 555)
            .await
            .unwrap();
        assert_eq!(verdict, MessageVerdict::Allowed);

        // Record exists but already passed
        store.ensure(CHAT, USER, false).await.unwrap();
        store.mark_passed(CHAT, USER).await.unwrap();
        let verdict = handle_private_message(&store, &platform, CHAT, USER, 556)
            .await
            .unwrap();
        assert_eq!(verdict, MessageVerdict::Allowed);
    }
}
