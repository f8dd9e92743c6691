//! Core types shared across Gatehouse components.

use serde::{Deserialize, Serialize};

/// Durable marker that a (user, chat) pair has not yet completed the join
/// gate. One record per pair; owned exclusively by the verification store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingVerification {
    /// Joining user's platform id
    pub user_id: i64,

    /// Group the user is joining
    pub chat_id: i64,

    /// True once the user has completed verification
    pub passed: bool,

    /// True when the user arrived via a join request rather than a direct join
    pub is_join_request: bool,

    /// Timestamp of record creation (Unix epoch seconds)
    pub added_at: i64,
}

impl PendingVerification {
    pub fn new(chat_id: i64, user_id: i64, is_join_request: bool) -> Self {
        Self {
            user_id,
            chat_id,
            passed: false,
            is_join_request,
            added_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Record age in seconds relative to `now`
    pub fn age_secs(&self, now: i64) -> i64 {
        now - self.added_at
    }
}

/// Per-group verification policy, configured out-of-band by the host bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupPolicy {
    /// Whether the join gate is active for this group
    #[serde(default)]
    pub captcha_enabled: bool,

    /// Lighter post-verification restriction instead of a full unmute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub welcome_mute: Option<WelcomeMute>,

    /// Rules text shown (with an agree control) after a correct solve
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_text: Option<String>,
}

/// Time-bounded media restriction applied after successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeMute {
    /// Duration of the media restriction in seconds
    pub duration_secs: u64,
}

/// Direction of a front-row rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotateDirection {
    /// Move the first element to the back
    Left,
    /// Move the last element to the front
    Right,
}

/// How a user's posting ability is restricted in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestrictMode {
    /// No posting at all (pre-verification mute)
    Full,
    /// Text allowed, media blocked (welcome-mute)
    Media,
}

/// Outcome of one flow-controller step, echoed to the event dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum FlowOutcome {
    /// A puzzle prompt was sent or re-rendered
    PuzzlePresented,
    /// Wrong confirm; a brand-new puzzle was issued
    PuzzleRegenerated,
    /// Correct solve; rules text presented with an agree control
    RulesPresented,
    /// Verification completed; restrictions resolved
    Passed,
    /// Actor is exempt from the gate (admin or already verified)
    Exempt,
    /// No live session; the user must restart the flow
    RestartRequired,
    /// The pending record was already resolved by another actor
    AlreadyResolved,
}
