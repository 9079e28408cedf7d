#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative re-simulation of submitted games.
//!
//! A client that wins a game submits a [`VerificationRequest`]: the mods it
//! played with, the map, its action log and the hash of its final state. The
//! [`Verifier`] replays the log in verification mode on an independent
//! [`World`], bounded by a wall-clock and tick budget, and accepts the result
//! only when the replay wins and ends on the same state hash.

use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use bulwark_core::{
    Action, ActionLog, ActionRejection, ContentError, ContentPack, ContentRegistry, MapId,
    ModContent, Outcome,
};
use bulwark_world::{
    self as world, query, InvariantViolation, SimulationConfig, SimulationError, World,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Submission describing a finished game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    /// Mods applied on top of the base content, in load order.
    pub mods: Vec<ModContent>,
    /// Map that was played.
    pub game_map_id: MapId,
    /// Base64 SHA-256 digest of the final state reported by the client.
    pub game_end_state_hash: String,
    /// Every action the client applied, keyed by tick.
    pub actions: ActionLog,
    /// Name the result is recorded under.
    pub player_name: String,
}

impl VerificationRequest {
    /// Builds a submission from a world that just finished.
    pub fn from_world(
        mods: Vec<ModContent>,
        world: &World,
        player_name: impl Into<String>,
    ) -> Result<Self, SimulationError> {
        Ok(Self {
            mods,
            game_map_id: query::map_id(world).clone(),
            game_end_state_hash: query::state_hash(world)?.as_str().to_owned(),
            actions: query::action_log(world).clone(),
            player_name: player_name.into(),
        })
    }
}

/// Budget a single replay may consume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerificationLimits {
    /// Real time after which the replay is abandoned.
    pub wall_clock: Duration,
    /// Simulation steps after which the replay is abandoned.
    pub max_ticks: u64,
}

impl Default for VerificationLimits {
    fn default() -> Self {
        Self {
            wall_clock: Duration::from_secs(30),
            max_ticks: 2_000_000,
        }
    }
}

/// Summary of an accepted game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameResult {
    /// Name the result is recorded under.
    pub player_name: String,
    /// Mods the game was played with.
    pub mod_ids: Vec<String>,
    /// Score reached by the replay.
    pub score: i64,
    /// Steps the replay took to win.
    pub ticks: u64,
}

/// Reasons a submission is turned down.
#[derive(Debug, Error)]
pub enum Rejection {
    /// The mods or the map failed to load.
    #[error(transparent)]
    Content(ContentError),
    /// A due action failed validation.
    #[error("Action is invalid: {action} Due to: {reason}")]
    InvalidAction {
        /// Tick the action was scheduled for.
        tick: u64,
        /// Offending action.
        action: Action,
        /// Reason reported by validation.
        reason: ActionRejection,
    },
    /// The replay lost before winning.
    #[error("Player has lost")]
    PlayerLost,
    /// The replay exhausted its budget before winning.
    #[error("Game verification timed out after {ticks} ticks")]
    Timeout {
        /// Steps processed before giving up.
        ticks: u64,
    },
    /// The replay won on a different state than the client reported.
    #[error("Game end state hash mismatch. Server score: {server_score}")]
    HashMismatch {
        /// Hash reported by the client.
        expected: String,
        /// Hash computed by the replay.
        actual: String,
        /// Score reached by the replay.
        server_score: i64,
    },
    /// The replay hit a logic fault.
    #[error(transparent)]
    Invariant(InvariantViolation),
    /// The final state could not be hashed.
    #[error("failed to hash the end state: {0}")]
    Hash(serde_json::Error),
}

impl From<SimulationError> for Rejection {
    fn from(error: SimulationError) -> Self {
        match error {
            SimulationError::Content(error) => Self::Content(error),
            SimulationError::InvalidAction {
                tick,
                action,
                reason,
                ..
            } => Self::InvalidAction {
                tick,
                action,
                reason,
            },
            SimulationError::PlayerLost { .. } => Self::PlayerLost,
            SimulationError::Invariant(violation) => Self::Invariant(violation),
            SimulationError::Hash(error) => Self::Hash(error),
        }
    }
}

/// Outcome of verifying a submission.
#[derive(Debug)]
pub enum Verdict {
    /// The replay won and matched the reported hash.
    Accepted(GameResult),
    /// The submission was turned down.
    Rejected {
        /// Wave playing when the replay stopped.
        wave: u32,
        /// Why the submission was turned down.
        reason: Rejection,
    },
}

impl Verdict {
    /// Reports whether the submission was accepted.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted(result) => write!(
                f,
                "Result of {} verified with a score of {}",
                result.player_name, result.score
            ),
            Self::Rejected { wave, reason } => {
                write!(f, "Verification Failed at Wave {wave} due to: {reason}")
            }
        }
    }
}

/// Replays submissions against a fixed base content pack.
#[derive(Clone, Debug)]
pub struct Verifier {
    base: ContentPack,
    limits: VerificationLimits,
}

impl Verifier {
    /// Creates a verifier with the default budget.
    #[must_use]
    pub fn new(base: ContentPack) -> Self {
        Self {
            base,
            limits: VerificationLimits::default(),
        }
    }

    /// Replaces the budget applied to every replay.
    #[must_use]
    pub fn with_limits(mut self, limits: VerificationLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Budget applied to every replay.
    #[must_use]
    pub const fn limits(&self) -> VerificationLimits {
        self.limits
    }

    /// Replays the submission and decides whether to accept it.
    pub fn verify(&self, request: &VerificationRequest) -> Verdict {
        let verdict = self.replay(request);
        match &verdict {
            Verdict::Accepted(result) => log::info!(
                "verified {} on map '{}': score {} after {} ticks",
                result.player_name,
                request.game_map_id,
                result.score,
                result.ticks
            ),
            Verdict::Rejected { .. } => {
                log::warn!("rejected submission from {}: {verdict}", request.player_name);
            }
        }
        verdict
    }

    fn replay(&self, request: &VerificationRequest) -> Verdict {
        let content = match ContentRegistry::build(self.base.clone(), &request.mods) {
            Ok(content) => Arc::new(content),
            Err(error) => return rejected(0, Rejection::Content(error)),
        };
        let mut world = match World::new(
            content,
            &request.game_map_id,
            SimulationConfig::verification(),
        ) {
            Ok(world) => world,
            Err(error) => return rejected(0, error.into()),
        };
        world::load_actions(&mut world, request.actions.clone());

        let started = Instant::now();
        let mut events = Vec::new();
        loop {
            events.clear();
            match world::step(&mut world, &mut events) {
                Ok(Outcome::Won) => break,
                Ok(_) => {}
                Err(error) => return rejected(query::wave_number(&world), error.into()),
            }

            let ticks = query::tick(&world);
            if ticks >= self.limits.max_ticks || started.elapsed() > self.limits.wall_clock {
                return rejected(query::wave_number(&world), Rejection::Timeout { ticks });
            }
        }

        let wave = query::wave_number(&world);
        let actual = match query::state_hash(&world) {
            Ok(hash) => hash,
            Err(error) => return rejected(wave, error.into()),
        };
        let score = query::score(&world);
        if !actual.matches(&request.game_end_state_hash) {
            return rejected(
                wave,
                Rejection::HashMismatch {
                    expected: request.game_end_state_hash.clone(),
                    actual: actual.as_str().to_owned(),
                    server_score: score,
                },
            );
        }

        Verdict::Accepted(GameResult {
            player_name: request.player_name.clone(),
            mod_ids: query::content(&world).mod_ids().to_vec(),
            score,
            ticks: query::tick(&world),
        })
    }
}

fn rejected(wave: u32, reason: Rejection) -> Verdict {
    Verdict::Rejected { wave, reason }
}
