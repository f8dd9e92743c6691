//! HTTP route handlers for Warden.
//!
//! The host bot's dispatcher normalizes platform updates and POSTs them
//! here; command parsing and the outbound transport stay on its side.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod events;
mod health;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))

        // Normalized platform events
        .route("/events/join", post(events::join))
        .route("/events/callback", post(events::callback))
        .route("/events/message", post(events::private_message))

        .layer(TraceLayer::new_for_http())

        // Add shared state
        .with_state(state)
}
