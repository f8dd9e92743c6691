//! Normalized platform event endpoints.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use gatehouse_common::{FlowOutcome, RotateDirection};

use crate::flow::{self, MessageVerdict};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct JoinEvent {
    chat_id: i64,
    /// Platforms batch simultaneous joins into one service message
    user_ids: Vec<i64>,
    #[serde(default)]
    is_join_request: bool,
}

#[derive(Serialize)]
pub struct JoinResult {
    user_id: i64,
    #[serde(flatten)]
    outcome: FlowOutcome,
}

#[derive(Serialize)]
pub struct JoinResponse {
    results: Vec<JoinResult>,
}

/// A user (or batch of users) joined or requested to join a gated group
pub async fn join(
    State(state): State<AppState>,
    Json(event): Json<JoinEvent>,
) -> Result<Json<JoinResponse>, StatusCode> {
    if event.user_ids.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let outcomes = state
        .flow
        .on_join(event.chat_id, &event.user_ids, event.is_join_request)
        .await
        .map_err(|e| {
            tracing::error!(chat_id = event.chat_id, error = %e, "Join handling failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(JoinResponse {
        results: outcomes
            .into_iter()
            .map(|(user_id, outcome)| JoinResult { user_id, outcome })
            .collect(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackAction {
    RotateLeft,
    RotateRight,
    Confirm,
    AgreeRules,
}

#[derive(Deserialize)]
pub struct CallbackEvent {
    chat_id: i64,
    user_id: i64,
    action: CallbackAction,
}

/// An inline control on the puzzle or rules prompt was pressed
pub async fn callback(
    State(state): State<AppState>,
    Json(event): Json<CallbackEvent>,
) -> Result<Json<FlowOutcome>, StatusCode> {
    let flow = &state.flow;
    let result = match event.action {
        CallbackAction::RotateLeft => {
            flow.on_rotate(event.chat_id, event.user_id, RotateDirection::Left).await
        }
        CallbackAction::RotateRight => {
            flow.on_rotate(event.chat_id, event.user_id, RotateDirection::Right).await
        }
        CallbackAction::Confirm => flow.on_confirm(event.chat_id, event.user_id).await,
        CallbackAction::AgreeRules => flow.on_agree_rules(event.chat_id, event.user_id).await,
    };

    match result {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            tracing::error!(
                chat_id = event.chat_id,
                user_id = event.user_id,
                error = %e,
                "Callback handling failed"
            );
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Deserialize)]
pub struct MessageEvent {
    /// The user's own private conversation
    chat_id: i64,
    user_id: i64,
    message_id: i64,
}

#[derive(Serialize)]
pub struct MessageResponse {
    verdict: MessageVerdict,
}

/// A private text message arrived; decide whether the lock suppresses it
pub async fn private_message(
    State(state): State<AppState>,
    Json(event): Json<MessageEvent>,
) -> Result<Json<MessageResponse>, StatusCode> {
    let verdict = flow::handle_private_message(
        state.flow.store(),
        state.flow.platform(),
        event.chat_id,
        event.user_id,
        event.message_id,
    )
    .await
    .map_err(|e| {
        tracing::error!(user_id = event.user_id, error = %e, "Message guard failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(MessageResponse { verdict }))
}
