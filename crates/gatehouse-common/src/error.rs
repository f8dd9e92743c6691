//! Common error types for Gatehouse components.

use thiserror::Error;

/// Common errors across Gatehouse components
#[derive(Debug, Error)]
pub enum GatehouseError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Redis connection/operation error
    #[error("Redis error: {0}")]
    Redis(String),

    /// Puzzle generation/rendering error
    #[error("Puzzle error: {0}")]
    Puzzle(String),

    /// No live puzzle session for the acting user
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Pending record or group state missing
    #[error("State not found: {0}")]
    StateNotFound(String),

    /// Chat platform call failed
    #[error("Platform error: {0}")]
    Platform(String),

    /// Invalid input/request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatehouseError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::Redis(_) => 503,
            Self::Puzzle(_) => 500,
            Self::SessionNotFound(_) => 404,
            Self::StateNotFound(_) => 404,
            Self::Platform(_) => 502,
            Self::InvalidInput(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Redis(_) | Self::Platform(_))
    }
}
