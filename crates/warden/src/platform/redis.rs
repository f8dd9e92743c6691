//! Redis-queued platform implementation.
//!
//! Outbound actions are enqueued as JSON envelopes on a Redis list consumed
//! by the transport process, which owns API credentials and rate limiting.
//! Prompt "message ids" are correlation ids drawn from a Redis counter; the
//! transport maps them to real platform message ids. Admin rights come from
//! a per-group set the host bot keeps in sync.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use gatehouse_common::RestrictMode;
use gatehouse_common::constants::redis_keys;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;

use super::ChatPlatform;

/// Outbound command envelope
#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum Command<'a> {
    SendPuzzlePrompt {
        chat_id: i64,
        user_id: i64,
        correlation_id: i64,
        image_b64: String,
        caption: &'a str,
    },
    EditPuzzlePrompt {
        chat_id: i64,
        message_id: i64,
        image_b64: String,
        caption: &'a str,
    },
    SendRulesPrompt {
        chat_id: i64,
        user_id: i64,
        correlation_id: i64,
        rules_text: &'a str,
    },
    SendText {
        chat_id: i64,
        correlation_id: i64,
        text: &'a str,
    },
    DeleteMessage {
        chat_id: i64,
        message_id: i64,
    },
    Restrict {
        chat_id: i64,
        user_id: i64,
        mode: RestrictMode,
        #[serde(skip_serializing_if = "Option::is_none")]
        until: Option<i64>,
    },
    Unrestrict {
        chat_id: i64,
        user_id: i64,
    },
    Ban {
        chat_id: i64,
        user_id: i64,
    },
    ApproveJoinRequest {
        chat_id: i64,
        user_id: i64,
    },
    DeclineJoinRequest {
        chat_id: i64,
        user_id: i64,
    },
}

#[derive(Clone)]
pub struct RedisPlatform {
    redis: ConnectionManager,
}

impl RedisPlatform {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    async fn enqueue(&self, command: &Command<'_>) -> Result<()> {
        let mut conn = self.redis.clone();
        let envelope = serde_json::to_string(command)?;
        let _: () = conn
            .lpush(redis_keys::OUTBOUND_QUEUE, envelope)
            .await
            .context("Failed to enqueue platform command")?;
        Ok(())
    }

    async fn next_correlation_id(&self) -> Result<i64> {
        let mut conn = self.redis.clone();
        let id: i64 = conn
            .incr(redis_keys::PROMPT_ID_COUNTER, 1)
            .await
            .context("Failed to allocate correlation id")?;
        Ok(id)
    }
}

impl ChatPlatform for RedisPlatform {
    async fn send_puzzle_prompt(
        &self,
        chat_id: i64,
        user_id: i64,
        image_jpeg: &[u8],
        caption: &str,
    ) -> Result<i64> {
        let correlation_id = self.next_correlation_id().await?;
        self.enqueue(&Command::SendPuzzlePrompt {
            chat_id,
            user_id,
            correlation_id,
            image_b64: STANDARD.encode(image_jpeg),
            caption,
        })
        .await?;

        tracing::debug!(chat_id, user_id, correlation_id, "Puzzle prompt enqueued");
        Ok(correlation_id)
    }

    async fn edit_puzzle_prompt(
        &self,
        chat_id: i64,
        message_id: i64,
        image_jpeg: &[u8],
        caption: &str,
    ) -> Result<()> {
        self.enqueue(&Command::EditPuzzlePrompt {
            chat_id,
            message_id,
            image_b64: STANDARD.encode(image_jpeg),
            caption,
        })
        .await
    }

    async fn send_rules_prompt(&self, chat_id: i64, user_id: i64, rules_text: &str) -> Result<i64> {
        let correlation_id = self.next_correlation_id().await?;
        self.enqueue(&Command::SendRulesPrompt {
            chat_id,
            user_id,
            correlation_id,
            rules_text,
        })
        .await?;
        Ok(correlation_id)
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i64> {
        let correlation_id = self.next_correlation_id().await?;
        self.enqueue(&Command::SendText {
            chat_id,
            correlation_id,
            text,
        })
        .await?;
        Ok(correlation_id)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        self.enqueue(&Command::DeleteMessage { chat_id, message_id }).await
    }

    async fn restrict(
        &self,
        chat_id: i64,
        user_id: i64,
        mode: RestrictMode,
        until: Option<i64>,
    ) -> Result<()> {
        self.enqueue(&Command::Restrict {
            chat_id,
            user_id,
            mode,
            until,
        })
        .await
    }

    async fn unrestrict(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.enqueue(&Command::Unrestrict { chat_id, user_id }).await
    }

    async fn ban(&self, chat_id: i64, user_id: i64) -> Result<()> {
        tracing::info!(chat_id, user_id, "Ban enqueued");
        self.enqueue(&Command::Ban { chat_id, user_id }).await
    }

    async fn approve_join_request(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.enqueue(&Command::ApproveJoinRequest { chat_id, user_id }).await
    }

    async fn decline_join_request(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.enqueue(&Command::DeclineJoinRequest { chat_id, user_id }).await
    }

    async fn is_admin(&self, chat_id: i64, user_id: i64) -> Result<bool> {
        let mut conn = self.redis.clone();
        let key = format!("{}{}", redis_keys::ADMINS_PREFIX, chat_id);
        let is_member: bool = conn
            .sismember(&key, user_id)
            .await
            .context("Failed to look up admin rights")?;
        Ok(is_member)
    }
}
