//! Recording fakes for flow tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use gatehouse_common::{GroupPolicy, RestrictMode};

use crate::platform::ChatPlatform;
use crate::puzzle::{PuzzleRenderer, PuzzleSession};
use crate::settings::{SettingsSource, StaticSettings};

/// Renderer that skips rasterization; flow tests care about the state
/// machine, not pixels.
pub struct StubRenderer;

impl PuzzleRenderer for StubRenderer {
    fn render(&self, _session: &PuzzleSession) -> Result<Vec<u8>> {
        Ok(vec![0xFF, 0xD8, 0xFF, 0xD9])
    }
}

/// Settings backend that serves a fixed number of lookups and then errors,
/// for exercising flows that outlive the settings store.
pub struct FailingSettings {
    inner: StaticSettings,
    lookups_allowed: usize,
    served: AtomicUsize,
}

impl FailingSettings {
    pub fn new(inner: StaticSettings, lookups_allowed: usize) -> Self {
        Self {
            inner,
            lookups_allowed,
            served: AtomicUsize::new(0),
        }
    }
}

impl SettingsSource for FailingSettings {
    async fn policy_for(&self, chat_id: i64) -> Result<GroupPolicy> {
        if self.served.fetch_add(1, Ordering::SeqCst) >= self.lookups_allowed {
            anyhow::bail!("settings backend unavailable");
        }
        self.inner.policy_for(chat_id).await
    }
}

/// Every side effect the mock platform observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    SendPuzzlePrompt { chat_id: i64, user_id: i64 },
    EditPuzzlePrompt { chat_id: i64, message_id: i64 },
    SendRulesPrompt { chat_id: i64, user_id: i64 },
    SendText { chat_id: i64, text: String },
    DeleteMessage { chat_id: i64, message_id: i64 },
    Restrict { chat_id: i64, user_id: i64, mode: RestrictMode, until: Option<i64> },
    Unrestrict { chat_id: i64, user_id: i64 },
    Ban { chat_id: i64, user_id: i64 },
    ApproveJoinRequest { chat_id: i64, user_id: i64 },
    DeclineJoinRequest { chat_id: i64, user_id: i64 },
}

/// In-memory platform double that records calls and issues sequential
/// message ids.
pub struct MockPlatform {
    calls: Mutex<Vec<PlatformCall>>,
    admins: HashSet<(i64, i64)>,
    fail_prompts: HashSet<(i64, i64)>,
    next_message_id: Mutex<i64>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            admins: HashSet::new(),
            fail_prompts: HashSet::new(),
            next_message_id: Mutex::new(1000),
        }
    }

    pub fn with_admin(mut self, chat_id: i64, user_id: i64) -> Self {
        self.admins.insert((chat_id, user_id));
        self
    }

    /// Make `send_puzzle_prompt` fail for one user.
    pub fn with_prompt_failure(mut self, chat_id: i64, user_id: i64) -> Self {
        self.fail_prompts.insert((chat_id, user_id));
        self
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    /// True if any recorded call matches the predicate
    pub fn saw(&self, predicate: impl Fn(&PlatformCall) -> bool) -> bool {
        self.calls.lock().unwrap().iter().any(predicate)
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_id(&self) -> i64 {
        let mut id = self.next_message_id.lock().unwrap();
        *id += 1;
        *id
    }
}

impl ChatPlatform for MockPlatform {
    async fn send_puzzle_prompt(
        &self,
        chat_id: i64,
        user_id: i64,
        _image_jpeg: &[u8],
        _caption: &str,
    ) -> Result<i64> {
        self.record(PlatformCall::SendPuzzlePrompt { chat_id, user_id });
        if self.fail_prompts.contains(&(chat_id, user_id)) {
            anyhow::bail!("message delivery failed");
        }
        Ok(self.next_id())
    }

    async fn edit_puzzle_prompt(
        &self,
        chat_id: i64,
        message_id: i64,
        _image_jpeg: &[u8],
        _caption: &str,
    ) -> Result<()> {
        self.record(PlatformCall::EditPuzzlePrompt { chat_id, message_id });
        Ok(())
    }

    async fn send_rules_prompt(&self, chat_id: i64, user_id: i64, _rules_text: &str) -> Result<i64> {
        self.record(PlatformCall::SendRulesPrompt { chat_id, user_id });
        Ok(self.next_id())
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i64> {
        self.record(PlatformCall::SendText {
            chat_id,
            text: text.to_string(),
        });
        Ok(self.next_id())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        self.record(PlatformCall::DeleteMessage { chat_id, message_id });
        Ok(())
    }

    async fn restrict(
        &self,
        chat_id: i64,
        user_id: i64,
        mode: RestrictMode,
        until: Option<i64>,
    ) -> Result<()> {
        self.record(PlatformCall::Restrict {
            chat_id,
            user_id,
            mode,
            until,
        });
        Ok(())
    }

    async fn unrestrict(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.record(PlatformCall::Unrestrict { chat_id, user_id });
        Ok(())
    }

    async fn ban(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.record(PlatformCall::Ban { chat_id, user_id });
        Ok(())
    }

    async fn approve_join_request(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.record(PlatformCall::ApproveJoinRequest { chat_id, user_id });
        Ok(())
    }

    async fn decline_join_request(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.record(PlatformCall::DeclineJoinRequest { chat_id, user_id });
        Ok(())
    }

    async fn is_admin(&self, chat_id: i64, user_id: i64) -> Result<bool> {
        Ok(self.admins.contains(&(chat_id, user_id)))
    }
}
