//! Verification flow: the join-gate state machine and the private-message
//! lock for unverified users.

mod controller;
mod guard;

pub use controller::FlowController;
pub use guard::{MessageVerdict, handle_private_message};

#[cfg(test)]
pub mod testutil;
