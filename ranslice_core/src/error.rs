//! Error taxonomy for the allocation engine.
//!
//! Every variant is detected before an interval commits any per-user state,
//! so a failed interval leaves the world exactly as it was.

use ranslice_env::{EnvError, UserId};
use thiserror::Error;

/// Errors raised while constructing or resolving a control interval.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Traffic class unknown, or its task spec has the wrong shape.
    /// A contract violation: well-formed scenarios never produce it.
    #[error("Invalid traffic class: {0}")]
    InvalidClass(String),

    /// An allocation or measurement references a user without metadata
    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    /// The caller chose an index outside the action space
    #[error("Action {action} out of range [0, {len})")]
    ActionOutOfRange { action: usize, len: usize },

    /// Throughput is non-positive, near zero or not finite
    #[error("Degenerate rate for {user}: {rate} B/s")]
    DegenerateRate { user: UserId, rate: f64 },

    /// No in-bound velocity was found within the redraw budget
    #[error("Mobility exhausted after {attempts} velocity redraws")]
    MobilityExhausted { attempts: u32 },

    /// Scenario description failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Artifact exchange failed
    #[error(transparent)]
    Env(#[from] EnvError),
}

impl CoreError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
