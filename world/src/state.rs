//! The hashed portion of a running simulation.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bulwark_core::ActionLog;
use bulwark_system_spawning::EnemySpawner;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::{enemies::Enemy, projectiles::Projectile, tiles::TileGrid};

/// Mutable gameplay state shared by every executor.
///
/// Field order is part of the hash contract: the state serialises to JSON in
/// declaration order, and every map inside it is ordered.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SimulationState {
    pub(crate) tick: u64,
    pub(crate) money: i64,
    pub(crate) score: i64,
    pub(crate) player_health: f64,
    pub(crate) tiles: TileGrid,
    pub(crate) actions: ActionLog,
    pub(crate) enemies: Vec<Enemy>,
    pub(crate) projectiles: Vec<Projectile>,
    pub(crate) enemy_spawner: EnemySpawner,
    pub(crate) next_enemy_id: u32,
}

impl SimulationState {
    pub(crate) fn hash(&self) -> Result<StateHash, serde_json::Error> {
        Ok(StateHash::digest(&serde_json::to_vec(self)?))
    }
}

/// Base64-encoded SHA-256 digest of the serialised simulation state.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateHash(String);

impl StateHash {
    fn digest(bytes: &[u8]) -> Self {
        Self(STANDARD.encode(Sha256::digest(bytes)))
    }

    /// Borrows the encoded digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reports whether the digest equals an encoded hash received from elsewhere.
    #[must_use]
    pub fn matches(&self, encoded: &str) -> bool {
        self.0 == encoded
    }
}

impl fmt::Display for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
