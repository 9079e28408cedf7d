#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Bulwark simulation.
//!
//! This crate defines the vocabulary that connects adapters, the authoritative
//! world, and pure systems. Content definitions are immutable parameter structs
//! addressed by string identifiers and resolved through an explicit
//! [`ContentRegistry`] handle. Players express intent through [`Action`]
//! values scheduled on a tick-indexed [`ActionLog`], and the world reports what
//! happened through [`Event`] values that presentation layers may consume
//! without ever feeding back into the simulation.

use std::time::Duration;

use glam::DVec2;
use serde::{Deserialize, Serialize};

mod action;
pub mod catalog;
mod content;
mod registry;
mod rng;

pub use action::{Action, ActionLog, ActionRejection};
pub use content::{
    AttackDefinition, DamageDefinition, EnemyTagId, EnemyType, EnemyTypeId, GameMap, MapId,
    ProjectileType, ProjectileTypeId, RarityId, Spawnpoint, SpawnpointTagId, TargetingShape,
    TileType, TileTypeId, TowerRarity, TowerType, TowerTypeId, TurretDefinition, Wave,
    WaveDefinition,
};
pub use registry::{ContentError, ContentPack, ContentRegistry, ModContent, ModInformation};
pub use rng::SimRng;

/// Simulated seconds covered by a single fixed step.
pub const TICK_SECONDS: f64 = 0.05;

/// Wall-clock duration represented by a single fixed step.
pub const TICK_DURATION: Duration = Duration::from_millis(50);

/// Seed shared by every executor so replays agree on all random draws.
pub const DEFAULT_SEED: u64 = 2345;

/// Execution policy applied to invalid actions and defeat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Interactive play: invalid actions are dropped from the log.
    Live,
    /// Authoritative replay: invalid actions and defeat fail the whole run.
    Verification,
}

/// Terminal state machine of a simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The game is still being played.
    Running,
    /// The final wave was cleared without the player dying.
    Won,
    /// Player health dropped to zero or below.
    Lost,
}

impl Outcome {
    /// Reports whether the outcome is latched and can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Location of a single tile expressed as column and row indices.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct TileCoord {
    x: u32,
    y: u32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Converts signed wire coordinates, rejecting negative values.
    #[must_use]
    pub fn from_signed(x: i32, y: i32) -> Option<Self> {
        Some(Self::new(u32::try_from(x).ok()?, u32::try_from(y).ok()?))
    }

    /// Column index of the tile.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Row index of the tile.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Continuous position of the tile's centre.
    #[must_use]
    pub fn center(&self) -> DVec2 {
        DVec2::new(f64::from(self.x) + 0.5, f64::from(self.y) + 0.5)
    }
}

/// Unique identifier assigned to an enemy by the world.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Presentation-only notifications broadcast by the world while stepping.
///
/// Events never feed back into the simulation and are excluded from the state
/// hash, so renderers may drop or reorder them freely.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A tower was built on a tile.
    TowerPlaced {
        /// Tile hosting the new tower.
        tile: TileCoord,
        /// Type of tower that was built.
        tower_type: TowerTypeId,
        /// Money spent on the placement.
        cost: i64,
    },
    /// A tower gained a level.
    TowerUpgraded {
        /// Tile hosting the tower.
        tile: TileCoord,
        /// Level reached after the upgrade.
        level: u32,
        /// Money spent on the upgrade.
        cost: i64,
    },
    /// A tower was sold.
    TowerRemoved {
        /// Tile that previously hosted the tower.
        tile: TileCoord,
        /// Money returned to the player.
        refund: i64,
    },
    /// An invalid action was dropped from the pending log in live mode.
    ActionDropped {
        /// Tick the action was scheduled for.
        tick: u64,
        /// Action that failed validation.
        action: Action,
        /// Reason reported by validation.
        reason: ActionRejection,
    },
    /// A new wave began.
    WaveStarted {
        /// Number of the wave that started.
        wave: u32,
        /// Money granted for reaching the wave.
        reward: i64,
    },
    /// An enemy entered the map.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Type of the spawned enemy.
        enemy_type: EnemyTypeId,
        /// Spawn position.
        position: DVec2,
    },
    /// An enemy was killed by the player's defences.
    EnemyKilled {
        /// Identifier of the killed enemy.
        enemy: EnemyId,
        /// Position at the moment of death.
        position: DVec2,
        /// Money awarded for the kill.
        money: i64,
        /// Score awarded for the kill.
        score: i64,
    },
    /// An enemy reached an exit and damaged the player.
    EnemyEscaped {
        /// Identifier of the escaping enemy.
        enemy: EnemyId,
        /// Health removed from the player.
        damage: f64,
    },
    /// A turret attacked an enemy.
    TurretFired {
        /// Tile hosting the tower that owns the turret.
        tile: TileCoord,
        /// Position the attack originated from.
        from: DVec2,
        /// Position of the attacked enemy.
        to: DVec2,
    },
    /// Splash damage was applied around a point.
    Splash {
        /// Centre of the splash.
        position: DVec2,
        /// Radius of the splash.
        radius: f64,
    },
    /// The final wave was cleared.
    Victory,
    /// The player ran out of health.
    Defeat,
}
