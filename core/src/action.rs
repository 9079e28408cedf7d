//! Player actions and the tick-indexed log that schedules them.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TowerTypeId;

/// Pending actions keyed by the tick at which they are applied.
///
/// The ordered map keeps serialisation and replay order identical on every
/// executor.
pub type ActionLog = BTreeMap<u64, Vec<Action>>;

/// Commands a player may schedule against a future tick.
///
/// Variants carry only primitive and identifier fields so any executor can
/// serialise and replay them identically.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all_fields = "camelCase")]
pub enum Action {
    /// Builds a tower of the given type on an empty tile.
    PlaceTower {
        /// Column of the target tile.
        x: i32,
        /// Row of the target tile.
        y: i32,
        /// Identifier of the tower type to build.
        tower_type_id: TowerTypeId,
    },
    /// Raises the level of an existing tower by one.
    UpgradeTower {
        /// Column of the target tile.
        x: i32,
        /// Row of the target tile.
        y: i32,
    },
    /// Sells an existing tower for its refund value.
    RemoveTower {
        /// Column of the target tile.
        x: i32,
        /// Row of the target tile.
        y: i32,
    },
}

impl Action {
    /// Signed wire coordinates targeted by the action.
    #[must_use]
    pub fn position(&self) -> (i32, i32) {
        match self {
            Self::PlaceTower { x, y, .. } | Self::UpgradeTower { x, y } | Self::RemoveTower { x, y } => {
                (*x, *y)
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlaceTower { x, y, tower_type_id } => {
                write!(f, "PlaceTower({x}, {y}, {tower_type_id})")
            }
            Self::UpgradeTower { x, y } => write!(f, "UpgradeTower({x}, {y})"),
            Self::RemoveTower { x, y } => write!(f, "RemoveTower({x}, {y})"),
        }
    }
}

/// Reasons an action fails validation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum ActionRejection {
    /// The coordinates lie outside the map.
    #[error("Invalid coordinates")]
    InvalidCoordinates,
    /// The requested tower type is not part of the loaded content.
    #[error("Unknown tower type {0}")]
    UnknownTowerType(String),
    /// A tower already occupies the tile.
    #[error("Tile is occupied")]
    TileOccupied,
    /// The tile type forbids building.
    #[error("Tile is not tower placeable")]
    NotPlaceable,
    /// The player cannot afford the action.
    #[error("Not enough money: {required} required, {available} available")]
    InsufficientFunds {
        /// Money the action costs.
        required: i64,
        /// Money the player currently holds.
        available: i64,
    },
    /// A solid tower here would cut enemies off from the exits.
    #[error("Tower would block the enemy path")]
    BlocksPath,
    /// No tower stands on the tile.
    #[error("There is no tower at this tile")]
    NoTower,
    /// The tower is already at its rarity's maximum level.
    #[error("Tower is already at max level")]
    MaxLevel,
}
