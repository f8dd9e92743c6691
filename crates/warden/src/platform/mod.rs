//! Chat-platform collaborator boundary.
//!
//! The verification flow only ever talks to the platform through this trait:
//! prompt messages with inline controls, restriction management, join-request
//! resolution, and admin lookup. The outbound transport itself lives in a
//! separate process (see `redis` for the production wiring).

mod redis;

pub use redis::RedisPlatform;

use anyhow::Result;
use gatehouse_common::RestrictMode;

pub trait ChatPlatform: Send + Sync {
    /// Send the puzzle image with rotate-left / rotate-right / confirm
    /// controls. Returns the prompt's message id for later edits.
    fn send_puzzle_prompt(
        &self,
        chat_id: i64,
        user_id: i64,
        image_jpeg: &[u8],
        caption: &str,
    ) -> impl Future<Output = Result<i64>> + Send;

    /// Replace the image on an existing puzzle prompt in place
    fn edit_puzzle_prompt(
        &self,
        chat_id: i64,
        message_id: i64,
        image_jpeg: &[u8],
        caption: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Present rules text with an "I agree" control
    fn send_rules_prompt(
        &self,
        chat_id: i64,
        user_id: i64,
        rules_text: &str,
    ) -> impl Future<Output = Result<i64>> + Send;

    /// Plain message in the group (welcome text, try-again notices)
    fn send_text(&self, chat_id: i64, text: &str) -> impl Future<Output = Result<i64>> + Send;

    fn delete_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Restrict a user's posting ability, optionally until a Unix timestamp
    fn restrict(
        &self,
        chat_id: i64,
        user_id: i64,
        mode: RestrictMode,
        until: Option<i64>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Fully restore posting ability
    fn unrestrict(&self, chat_id: i64, user_id: i64) -> impl Future<Output = Result<()>> + Send;

    fn ban(&self, chat_id: i64, user_id: i64) -> impl Future<Output = Result<()>> + Send;

    fn approve_join_request(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> impl Future<Output = Result<()>> + Send;

    fn decline_join_request(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Whether the user holds administrative rights in the group
    fn is_admin(&self, chat_id: i64, user_id: i64) -> impl Future<Output = Result<bool>> + Send;
}
