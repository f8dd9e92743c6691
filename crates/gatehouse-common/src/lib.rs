//! # Gatehouse Common
//!
//! Shared types, traits, and utilities used across Gatehouse components.
//!
//! ## Modules
//! - `types` - Core data structures (PendingVerification, GroupPolicy, etc.)
//! - `error` - Common error types
//! - `constants` - Shared configuration constants

pub mod constants;
pub mod error;
pub mod types;

pub use error::GatehouseError;
pub use types::*;
