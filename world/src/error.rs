//! Failures surfaced by the world while constructing or stepping a simulation.

use bulwark_core::{Action, ActionRejection, ContentError};
use thiserror::Error;

/// Broken preconditions that indicate a logic fault rather than bad input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Map generation could not produce a layout where every spawnpoint
    /// reaches an exit.
    #[error("map '{0}' has no completable layout")]
    UnreachableLayout(String),
    /// A validated action produced a flow field that fails the map criteria.
    #[error("the new flow field does not satisfy the map criteria")]
    FlowFieldRejected,
    /// A content identifier vanished from the registry mid-run.
    #[error("missing {kind} '{id}'")]
    MissingContent {
        /// Kind of content that was looked up.
        kind: &'static str,
        /// Identifier that could not be resolved.
        id: String,
    },
}

impl InvariantViolation {
    pub(crate) fn missing(kind: &'static str, id: impl ToString) -> Self {
        Self::MissingContent {
            kind,
            id: id.to_string(),
        }
    }
}

/// Errors returned by [`crate::World`] construction and stepping.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The content or the requested map failed to load.
    #[error(transparent)]
    Content(#[from] ContentError),
    /// A due action failed validation while replaying in verification mode.
    #[error("Action is invalid: {action} Due to: {reason}")]
    InvalidAction {
        /// Wave playing when the action came due.
        wave: u32,
        /// Tick the action was scheduled for.
        tick: u64,
        /// Offending action.
        action: Action,
        /// Reason reported by validation.
        reason: ActionRejection,
    },
    /// Player health reached zero while replaying in verification mode.
    #[error("Player has lost")]
    PlayerLost {
        /// Wave playing when the player lost.
        wave: u32,
    },
    /// A logic fault aborted the current step.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    /// The state could not be serialised for hashing.
    #[error("failed to serialise the simulation state: {0}")]
    Hash(#[from] serde_json::Error),
}
