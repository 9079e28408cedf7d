#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave scheduler that queues enemies and releases them over time.
//!
//! The spawner is part of the hashed simulation state, so every field it keeps
//! is serialisable and every random draw goes through the simulation's single
//! [`SimRng`].

use bulwark_core::{
    EnemyTypeId, SimRng, Spawnpoint, TileCoord, Wave, WaveDefinition, TICK_SECONDS,
};
use serde::{Deserialize, Serialize};

/// Length of the quiet period before the first wave.
const INITIAL_WAVE_DURATION: f64 = 10.0;

/// Enemy waiting in the spawn queue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedEnemy {
    /// Seconds after the wave start at which the enemy appears.
    pub spawn_time: f64,
    /// Spawnpoint tile the enemy appears on.
    pub location: TileCoord,
    /// Type of the enemy.
    pub enemy_type: EnemyTypeId,
    /// Level of the enemy.
    pub level: i32,
}

/// Request to materialise an enemy right now.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnOrder {
    /// Spawnpoint tile the enemy appears on.
    pub location: TileCoord,
    /// Type of the enemy.
    pub enemy_type: EnemyTypeId,
    /// Level of the enemy.
    pub level: i32,
}

/// Summary of a wave that started during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveStart {
    /// Number of the wave that started.
    pub wave: u32,
    /// Money granted for reaching it.
    pub reward: i64,
}

/// Wave-schedule interpreter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemySpawner {
    wave_number: u32,
    current_wave_duration: f64,
    time_since_wave_start: f64,
    queued_enemies: Vec<QueuedEnemy>,
}

impl Default for EnemySpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl EnemySpawner {
    /// Creates a spawner waiting for the first wave.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            wave_number: 0,
            current_wave_duration: INITIAL_WAVE_DURATION,
            time_since_wave_start: 0.0,
            queued_enemies: Vec::new(),
        }
    }

    /// Number of the wave currently playing; zero before the first wave.
    #[must_use]
    pub const fn wave_number(&self) -> u32 {
        self.wave_number
    }

    /// Enemies not yet released, latest spawn time first.
    #[must_use]
    pub fn queued(&self) -> &[QueuedEnemy] {
        &self.queued_enemies
    }

    /// Reports whether the schedule's last wave has been reached.
    #[must_use]
    pub fn is_final_wave(&self, definition: &WaveDefinition) -> bool {
        definition.final_wave > 0 && self.wave_number == definition.final_wave
    }

    /// Advances the schedule by one fixed step.
    ///
    /// Enemies due this step are appended to `out` in release order. Returns
    /// the wave that started during the step, if any.
    pub fn handle(
        &mut self,
        definition: &WaveDefinition,
        spawnpoints: &[Spawnpoint],
        rng: &mut SimRng,
        out: &mut Vec<SpawnOrder>,
    ) -> Option<WaveStart> {
        self.time_since_wave_start += TICK_SECONDS;

        let mut started = None;
        if self.time_since_wave_start >= self.current_wave_duration
            && !self.is_final_wave(definition)
        {
            self.wave_number += 1;
            started = Some(self.start_next_wave(definition, spawnpoints, rng, out));
            self.time_since_wave_start = 0.0;
        }

        while self
            .queued_enemies
            .last()
            .is_some_and(|next| next.spawn_time <= self.time_since_wave_start)
        {
            let Some(due) = self.queued_enemies.pop() else {
                break;
            };
            out.push(due.into_order());
        }

        started
    }

    fn start_next_wave(
        &mut self,
        definition: &WaveDefinition,
        spawnpoints: &[Spawnpoint],
        rng: &mut SimRng,
        out: &mut Vec<SpawnOrder>,
    ) -> WaveStart {
        out.extend(self.queued_enemies.drain(..).map(QueuedEnemy::into_order));

        let number = self.wave_number;
        if let Some(wave) = definition.wave_at(number) {
            self.current_wave_duration = definition.wave_interval * wave.wave_duration_multiplier;
            self.queue_wave(wave, number, definition, spawnpoints, rng);
        } else {
            self.current_wave_duration = definition.wave_interval;
        }

        let reward = rng.randomly_round(
            definition.base_wave_reward * (1.0 + definition.reward_scaling_rate * waves_elapsed(number)),
        );
        log::debug!(
            "wave {number} started with {} queued enemies and a reward of {reward}",
            self.queued_enemies.len()
        );

        WaveStart {
            wave: number,
            reward,
        }
    }

    fn queue_wave(
        &mut self,
        wave: &Wave,
        number: u32,
        definition: &WaveDefinition,
        spawnpoints: &[Spawnpoint],
        rng: &mut SimRng,
    ) {
        let elapsed = waves_elapsed(number);
        let amount = definition.base_amount
            * (1.0 + definition.amount_scaling_rate * elapsed)
            * wave.amount_multiplier;
        let level = 1.0 + definition.level_scaling_rate * elapsed + f64::from(wave.level_modifier);
        let eligible = eligible_spawnpoints(spawnpoints, wave);

        let special_type = if wave.is_special_wave {
            pick_enemy_type(wave, rng)
        } else {
            None
        };

        let count = rng.randomly_round(amount).max(0);
        for _ in 0..count {
            let enemy_type = match &special_type {
                Some(enemy_type) => Some(enemy_type.clone()),
                None if wave.is_special_wave => None,
                None => pick_enemy_type(wave, rng),
            };
            let Some(enemy_type) = enemy_type else {
                continue;
            };

            let spawn_time = wave.spawn_delay + wave.spawn_duration * rng.next_f64();
            let Some(spawnpoint) = rng.index(eligible.len()).map(|index| eligible[index]) else {
                continue;
            };
            let level = i32::try_from(rng.randomly_round(level)).unwrap_or(i32::MAX);

            self.queued_enemies.push(QueuedEnemy {
                spawn_time,
                location: spawnpoint.location,
                enemy_type,
                level,
            });
        }

        self.queued_enemies
            .sort_by(|a, b| b.spawn_time.total_cmp(&a.spawn_time));

        for child in &wave.child_waves {
            self.queue_wave(child, number, definition, spawnpoints, rng);
        }
    }
}

impl QueuedEnemy {
    fn into_order(self) -> SpawnOrder {
        SpawnOrder {
            location: self.location,
            enemy_type: self.enemy_type,
            level: self.level,
        }
    }
}

fn waves_elapsed(number: u32) -> f64 {
    f64::from(number) - 1.0
}

fn pick_enemy_type(wave: &Wave, rng: &mut SimRng) -> Option<EnemyTypeId> {
    rng.weighted(wave.enemies.iter().map(|(id, weight)| (id, *weight)))
        .cloned()
}

fn eligible_spawnpoints<'a>(spawnpoints: &'a [Spawnpoint], wave: &Wave) -> Vec<&'a Spawnpoint> {
    let tagged: Vec<&Spawnpoint> = spawnpoints
        .iter()
        .filter(|spawnpoint| {
            spawnpoint
                .tags
                .iter()
                .any(|tag| wave.spawnpoint_tags.contains(tag))
        })
        .collect();

    if tagged.is_empty() {
        spawnpoints.iter().collect()
    } else {
        tagged
    }
}
