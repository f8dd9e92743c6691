//! Verification flow controller.
//!
//! Drives the join-gate state machine:
//! `Unverified → PuzzlePresented ⇄ PuzzlePresented → [RulesPending] → Passed`.
//! A wrong confirm regenerates the whole puzzle (fresh base symbol and rows),
//! so confirming blind keeps a flat 1-in-5 success chance per attempt.
//! Terminal cleanup of the pending record is an atomic claim shared with the
//! reaper; the claim loser takes no side effects.

use std::sync::Arc;

use anyhow::Result;
use gatehouse_common::{FlowOutcome, GroupPolicy, RestrictMode, RotateDirection};

use crate::platform::ChatPlatform;
use crate::puzzle::{self, PuzzleRenderer, SessionMap, Stage};
use crate::settings::SettingsSource;
use crate::store::VerificationStore;

const PUZZLE_CAPTION: &str =
    "Prove you are human: rotate the middle strip until the repeated symbol lines up, then confirm.";
const TRY_AGAIN_TEXT: &str = "That was not quite right. A new puzzle has been issued, try again.";
const RESTART_TEXT: &str =
    "Your verification session has expired. Please leave and rejoin the group to restart.";
const WELCOME_TEXT: &str = "Verification complete. Welcome to the group!";

pub struct FlowController<S, P, G, R> {
    store: S,
    platform: P,
    settings: G,
    renderer: R,
    sessions: Arc<SessionMap>,
}

impl<S, P, G, R> FlowController<S, P, G, R>
where
    S: VerificationStore,
    P: ChatPlatform,
    G: SettingsSource,
    R: PuzzleRenderer,
{
    pub fn new(store: S, platform: P, settings: G, renderer: R, sessions: Arc<SessionMap>) -> Self {
        Self {
            store,
            platform,
            settings,
            renderer,
            sessions,
        }
    }

    /// Entry gate for a join or join-request event. Platforms batch
    /// simultaneous joins into one event, so this takes the whole batch;
    /// each newcomer is gated independently.
    pub async fn on_join(
        &self,
        chat_id: i64,
        user_ids: &[i64],
        is_join_request: bool,
    ) -> Result<Vec<(i64, FlowOutcome)>> {
        let policy = self.settings.policy_for(chat_id).await?;
        let mut outcomes = Vec::with_capacity(user_ids.len());
        let mut muted: Vec<(i64, i64)> = Vec::new();

        for &user_id in user_ids {
            if self.platform.is_admin(chat_id, user_id).await.unwrap_or(false) {
                tracing::debug!(chat_id, user_id, "Admin joined, gate skipped");
                outcomes.push((user_id, FlowOutcome::Exempt));
                continue;
            }

            if let Some(existing) = self.store.get(chat_id, user_id).await? {
                if existing.passed {
                    outcomes.push((user_id, FlowOutcome::Exempt));
                    continue;
                }
            }

            self.store.ensure(chat_id, user_id, is_join_request).await?;

            if let Err(e) = self
                .platform
                .restrict(chat_id, user_id, RestrictMode::Full, None)
                .await
            {
                tracing::warn!(chat_id, user_id, error = %e, "Failed to mute newcomer");
            }

            if !policy.captcha_enabled {
                // Gate disabled for this group: straight to completion
                outcomes.push((user_id, self.complete(chat_id, user_id).await?));
                continue;
            }

            let session = puzzle::generate();
            let image = self.renderer.render(&session)?;
            let message_id = match self
                .platform
                .send_puzzle_prompt(chat_id, user_id, &image, PUZZLE_CAPTION)
                .await
            {
                Ok(id) => id,
                Err(e) => {
                    // The record stays pending and the mute stands; the user
                    // can rejoin for a fresh prompt, or the reaper resolves
                    // the record on timeout. The rest of the batch proceeds.
                    tracing::warn!(chat_id, user_id, error = %e, "Failed to send puzzle prompt");
                    outcomes.push((user_id, FlowOutcome::RestartRequired));
                    continue;
                }
            };
            self.sessions.insert(chat_id, user_id, session, message_id).await;

            tracing::info!(chat_id, user_id, is_join_request, "Puzzle presented");
            muted.push((user_id, message_id));
            outcomes.push((user_id, FlowOutcome::PuzzlePresented));
        }

        // Cleanup tracking only covers the single-muted-newcomer case;
        // larger batches lose best-effort prompt cleanup.
        if let [(user_id, message_id)] = muted[..] {
            self.store.track_cleanup(chat_id, user_id, message_id).await?;
        }

        Ok(outcomes)
    }

    /// Rotate button pressed on the puzzle prompt.
    pub async fn on_rotate(
        &self,
        chat_id: i64,
        user_id: i64,
        direction: RotateDirection,
    ) -> Result<FlowOutcome> {
        let Some(entry) = self.sessions.get(chat_id, user_id).await else {
            return self.restart_required(chat_id).await;
        };

        let Stage::Puzzle(mut session) = entry.stage else {
            // Stale rotate press while the rules prompt is up
            return Ok(FlowOutcome::RulesPresented);
        };

        puzzle::rotate(&mut session, direction);
        let image = self.renderer.render(&session)?;
        self.platform
            .edit_puzzle_prompt(chat_id, entry.prompt_message_id, &image, PUZZLE_CAPTION)
            .await?;
        self.sessions.update_puzzle(chat_id, user_id, session).await;

        Ok(FlowOutcome::PuzzlePresented)
    }

    /// Confirm button pressed on the puzzle prompt.
    pub async fn on_confirm(&self, chat_id: i64, user_id: i64) -> Result<FlowOutcome> {
        let Some(entry) = self.sessions.get(chat_id, user_id).await else {
            return self.restart_required(chat_id).await;
        };

        let Stage::Puzzle(session) = entry.stage else {
            return Ok(FlowOutcome::RulesPresented);
        };

        if !puzzle::is_correct(&session) {
            // Brand-new puzzle, not a re-render: fresh base symbol and rows
            let fresh = puzzle::generate();
            let image = self.renderer.render(&fresh)?;
            self.platform
                .edit_puzzle_prompt(chat_id, entry.prompt_message_id, &image, PUZZLE_CAPTION)
                .await?;
            self.sessions.update_puzzle(chat_id, user_id, fresh).await;

            if let Err(e) = self.platform.send_text(chat_id, TRY_AGAIN_TEXT).await {
                tracing::warn!(chat_id, user_id, error = %e, "Failed to send retry notice");
            }

            tracing::debug!(chat_id, user_id, "Wrong confirm, puzzle regenerated");
            return Ok(FlowOutcome::PuzzleRegenerated);
        }

        let policy = self.settings.policy_for(chat_id).await?;
        if let Some(rules) = policy.rules_text.as_deref() {
            self.platform.send_rules_prompt(chat_id, user_id, rules).await?;
            self.sessions.advance_to_rules(chat_id, user_id).await;
            tracing::debug!(chat_id, user_id, "Puzzle solved, rules pending");
            return Ok(FlowOutcome::RulesPresented);
        }

        self.complete(chat_id, user_id).await
    }

    /// "I agree" pressed on the rules prompt.
    pub async fn on_agree_rules(&self, chat_id: i64, user_id: i64) -> Result<FlowOutcome> {
        let Some(entry) = self.sessions.get(chat_id, user_id).await else {
            return self.restart_required(chat_id).await;
        };

        if !matches!(entry.stage, Stage::Rules) {
            // Agree pressed without a solved puzzle behind it
            return self.restart_required(chat_id).await;
        }

        self.complete(chat_id, user_id).await
    }

    /// Terminal transition. Claims the pending record first; every later
    /// platform call is best-effort so a failed API call can never leave a
    /// permanently-stuck record behind.
    async fn complete(&self, chat_id: i64, user_id: i64) -> Result<FlowOutcome> {
        let claimed = self.store.mark_passed(chat_id, user_id).await?;
        let Some(record) = claimed else {
            // Reaper (or a parallel completion) got here first
            self.sessions.remove(chat_id, user_id).await;
            return Ok(FlowOutcome::AlreadyResolved);
        };

        if record.is_join_request {
            if let Err(e) = self.platform.approve_join_request(chat_id, user_id).await {
                tracing::warn!(chat_id, user_id, error = %e, "Failed to approve join request");
            }
        } else if self.platform.is_admin(chat_id, user_id).await.unwrap_or(false) {
            // Admins were never restricted; nothing to lift
        } else {
            // Once the record is claimed the policy lookup is best-effort
            // like every platform call: fall back to a plain unrestrict
            // rather than stranding a passed-but-still-muted user.
            let policy = match self.settings.policy_for(chat_id).await {
                Ok(policy) => policy,
                Err(e) => {
                    tracing::warn!(chat_id, user_id, error = %e, "Policy lookup failed, lifting mute fully");
                    GroupPolicy::default()
                }
            };
            let result = match policy.welcome_mute {
                Some(mute) => {
                    let until = chrono::Utc::now().timestamp() + mute.duration_secs as i64;
                    self.platform
                        .restrict(chat_id, user_id, RestrictMode::Media, Some(until))
                        .await
                }
                None => self.platform.unrestrict(chat_id, user_id).await,
            };
            if let Err(e) = result {
                tracing::warn!(chat_id, user_id, error = %e, "Failed to lift restriction");
            }
        }

        if let Err(e) = self.platform.send_text(chat_id, WELCOME_TEXT).await {
            tracing::warn!(chat_id, user_id, error = %e, "Failed to send welcome message");
        }

        match self.store.take_cleanup(chat_id, user_id).await {
            Ok(Some(message_id)) => {
                if let Err(e) = self.platform.delete_message(chat_id, message_id).await {
                    tracing::warn!(chat_id, user_id, message_id, error = %e, "Prompt cleanup failed");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(chat_id, user_id, error = %e, "Cleanup lookup failed"),
        }

        self.sessions.remove(chat_id, user_id).await;
        tracing::info!(chat_id, user_id, "Verification passed");

        Ok(FlowOutcome::Passed)
    }

    async fn restart_required(&self, chat_id: i64) -> Result<FlowOutcome> {
        if let Err(e) = self.platform.send_text(chat_id, RESTART_TEXT).await {
            tracing::warn!(chat_id, error = %e, "Failed to send restart notice");
        }
        Ok(FlowOutcome::RestartRequired)
    }

    /// Shared access for the message guard and the routes.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }
}
