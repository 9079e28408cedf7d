#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Bulwark.
//!
//! The [`World`] owns every piece of gameplay state for one run: the generated
//! tile grid, the installed flow field, towers, enemies, projectiles, the wave
//! spawner and the tick-indexed action log. Adapters drive it through
//! [`queue_action`], [`load_actions`] and [`step`], and observe it through the
//! read-only [`query`] module. Every executor that starts from the same seed,
//! map, content and action log arrives at the same [`StateHash`].

use std::sync::Arc;

use bulwark_core::{
    Action, ActionLog, ActionRejection, ContentRegistry, Event, ExecutionMode, GameMap, MapId,
    Outcome, SimRng, DEFAULT_SEED,
};
use bulwark_system_spawning::{EnemySpawner, SpawnOrder, WaveStart};
use glam::DVec2;

mod actions;
mod combat;
mod enemies;
mod error;
mod generation;
mod navigation;
mod projectiles;
mod state;
mod tiles;
mod towers;

pub use error::{InvariantViolation, SimulationError};
pub use state::StateHash;

use combat::Combat;
use navigation::FlowField;
use state::SimulationState;
use tiles::MapTile;
use towers::TurretScratch;

/// Parameters fixed for the lifetime of a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Seed of the simulation's single random number generator.
    pub seed: u64,
    /// Policy applied to invalid actions and defeat.
    pub mode: ExecutionMode,
}

impl SimulationConfig {
    /// Interactive play with the shared seed.
    #[must_use]
    pub const fn live() -> Self {
        Self {
            seed: DEFAULT_SEED,
            mode: ExecutionMode::Live,
        }
    }

    /// Authoritative replay with the shared seed.
    #[must_use]
    pub const fn verification() -> Self {
        Self {
            seed: DEFAULT_SEED,
            mode: ExecutionMode::Verification,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::live()
    }
}

/// Represents the authoritative simulation of a single game.
#[derive(Debug)]
pub struct World {
    content: Arc<ContentRegistry>,
    map_id: MapId,
    map: GameMap,
    mode: ExecutionMode,
    rng: SimRng,
    state: SimulationState,
    flow_field: FlowField,
    outcome: Outcome,
    scratch: TurretScratch,
    spawn_orders: Vec<SpawnOrder>,
}

impl World {
    /// Generates the map layout and prepares a running simulation.
    pub fn new(
        content: Arc<ContentRegistry>,
        map_id: &MapId,
        config: SimulationConfig,
    ) -> Result<Self, SimulationError> {
        let map = content.map(map_id)?.clone();
        let mut rng = SimRng::seed_from(config.seed);
        let (tiles, flow_field) = generation::generate(map_id, &map, &content, &mut rng)?;

        let state = SimulationState {
            tick: 0,
            money: map.starting_money,
            score: 0,
            player_health: map.player_health,
            tiles,
            actions: ActionLog::new(),
            enemies: Vec::new(),
            projectiles: Vec::new(),
            enemy_spawner: EnemySpawner::new(),
            next_enemy_id: 0,
        };

        log::info!(
            "simulation of map '{map_id}' ({}x{}) created in {:?} mode with seed {}",
            map.width,
            map.height,
            config.mode,
            config.seed
        );

        Ok(Self {
            content,
            map_id: map_id.clone(),
            map,
            mode: config.mode,
            rng,
            state,
            flow_field,
            outcome: Outcome::Running,
            scratch: TurretScratch::default(),
            spawn_orders: Vec::new(),
        })
    }

    fn apply_due_actions(&mut self, out_events: &mut Vec<Event>) -> Result<(), SimulationError> {
        let tick = self.state.tick;
        let Some(due) = self.state.actions.remove(&tick) else {
            return Ok(());
        };

        let mut applied = Vec::with_capacity(due.len());
        for action in due {
            match self.check_valid(&action) {
                Ok(()) => {
                    self.perform(&action, out_events)?;
                    applied.push(action);
                }
                Err(reason) => match self.mode {
                    ExecutionMode::Verification => {
                        return Err(SimulationError::InvalidAction {
                            wave: self.state.enemy_spawner.wave_number(),
                            tick,
                            action,
                            reason,
                        });
                    }
                    ExecutionMode::Live => {
                        log::debug!("dropping {action} at tick {tick}: {reason}");
                        out_events.push(Event::ActionDropped {
                            tick,
                            action,
                            reason,
                        });
                    }
                },
            }
        }

        if !applied.is_empty() {
            let _ = self.state.actions.insert(tick, applied);
        }
        Ok(())
    }
}

/// Validates an action against the current state and schedules it for the next tick.
///
/// Returns the tick the action will be applied on. The action is validated
/// again when it comes due, since earlier actions on that tick may change the
/// outcome.
pub fn queue_action(world: &mut World, action: Action) -> Result<u64, ActionRejection> {
    world.check_valid(&action)?;
    let tick = world.state.tick.saturating_add(1);
    world.state.actions.entry(tick).or_default().push(action);
    Ok(tick)
}

/// Replaces the action log, typically with a recorded game to replay.
pub fn load_actions(world: &mut World, actions: ActionLog) {
    world.state.actions = actions;
}

/// Advances the simulation by one fixed step.
///
/// Once the outcome is terminal the world no longer changes and the latched
/// outcome is returned. In verification mode an invalid due action and defeat
/// are reported as errors instead.
pub fn step(world: &mut World, out_events: &mut Vec<Event>) -> Result<Outcome, SimulationError> {
    if world.outcome.is_terminal() {
        return Ok(world.outcome);
    }

    world.state.tick = world.state.tick.saturating_add(1);
    world.apply_due_actions(out_events)?;

    let content = Arc::clone(&world.content);
    let World {
        map,
        mode,
        rng,
        state,
        flow_field,
        outcome,
        scratch,
        spawn_orders,
        ..
    } = world;
    let SimulationState {
        tick,
        money,
        score,
        player_health,
        tiles,
        enemies,
        projectiles,
        enemy_spawner,
        next_enemy_id,
        ..
    } = state;

    let bounds = DVec2::new(f64::from(tiles.width()), f64::from(tiles.height()));
    {
        let mut combat = Combat {
            content: &content,
            enemies: &mut *enemies,
            money: &mut *money,
            score: &mut *score,
            next_enemy_id: &mut *next_enemy_id,
            rng: &mut *rng,
            events: &mut *out_events,
        };

        for coord in tiles.coords() {
            let Some(tower) = tiles.get_mut(coord).and_then(MapTile::tower_mut) else {
                continue;
            };
            let kind = content
                .tower_type(tower.tower_type())
                .ok_or_else(|| InvariantViolation::missing("tower type", tower.tower_type()))?;
            towers::tick_tower(coord, tower, kind, scratch, &mut combat, projectiles)?;
        }

        projectiles::tick_projectiles(projectiles, bounds, &mut combat)?;
    }

    enemies::tick_enemies(
        enemies,
        &enemies::Terrain {
            map,
            grid: tiles,
            field: flow_field,
        },
        rng,
        player_health,
        out_events,
    );

    spawn_orders.clear();
    let started = enemy_spawner.handle(&map.wave_definition, &map.spawnpoints, rng, spawn_orders);
    if let Some(WaveStart { wave, reward }) = started {
        *money += reward;
        log::info!("wave {wave} started at tick {tick}, reward {reward}");
        out_events.push(Event::WaveStarted { wave, reward });
    }
    if !spawn_orders.is_empty() {
        let mut combat = Combat {
            content: &content,
            enemies: &mut *enemies,
            money: &mut *money,
            score: &mut *score,
            next_enemy_id: &mut *next_enemy_id,
            rng: &mut *rng,
            events: &mut *out_events,
        };
        for order in spawn_orders.drain(..) {
            let kind = content
                .enemy_type(&order.enemy_type)
                .ok_or_else(|| InvariantViolation::missing("enemy type", &order.enemy_type))?;
            let _ = combat.spawn(&order.enemy_type, kind, order.location.center(), order.level);
        }
    }

    let wave = enemy_spawner.wave_number();
    if *player_health <= 0.0 {
        *outcome = Outcome::Lost;
        log::info!("player lost during wave {wave} at tick {tick}");
        out_events.push(Event::Defeat);
        if *mode == ExecutionMode::Verification {
            return Err(SimulationError::PlayerLost { wave });
        }
    } else if enemy_spawner.is_final_wave(&map.wave_definition)
        && enemy_spawner.queued().is_empty()
        && enemies.is_empty()
    {
        *outcome = Outcome::Won;
        log::info!("final wave {wave} cleared at tick {tick} with score {score}");
        out_events.push(Event::Victory);
    }

    Ok(*outcome)
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::sync::Arc;

    use bulwark_core::{
        Action, ActionLog, ActionRejection, ContentRegistry, EnemyId, EnemyTypeId, ExecutionMode,
        GameMap, MapId, Outcome, ProjectileTypeId, TileCoord, TileTypeId, TowerTypeId,
    };
    use glam::DVec2;

    use super::{towers, SimulationError, StateHash, World};

    /// Number of steps processed so far.
    #[must_use]
    pub fn tick(world: &World) -> u64 {
        world.state.tick
    }

    /// Money currently held by the player.
    #[must_use]
    pub fn money(world: &World) -> i64 {
        world.state.money
    }

    /// Score accumulated by killing enemies.
    #[must_use]
    pub fn score(world: &World) -> i64 {
        world.state.score
    }

    /// Remaining player health.
    #[must_use]
    pub fn player_health(world: &World) -> f64 {
        world.state.player_health
    }

    /// Number of the wave currently playing; zero before the first wave.
    #[must_use]
    pub fn wave_number(world: &World) -> u32 {
        world.state.enemy_spawner.wave_number()
    }

    /// Latched terminal state of the run.
    #[must_use]
    pub fn outcome(world: &World) -> Outcome {
        world.outcome
    }

    /// Policy the world applies to invalid actions and defeat.
    #[must_use]
    pub fn mode(world: &World) -> ExecutionMode {
        world.mode
    }

    /// Identifier of the map being played.
    #[must_use]
    pub fn map_id(world: &World) -> &MapId {
        &world.map_id
    }

    /// Definition of the map being played.
    #[must_use]
    pub fn map(world: &World) -> &GameMap {
        &world.map
    }

    /// Content handle the world resolves identifiers against.
    #[must_use]
    pub fn content(world: &World) -> &Arc<ContentRegistry> {
        &world.content
    }

    /// Terrain type of a tile, or `None` outside the map.
    #[must_use]
    pub fn tile_type(world: &World, tile: TileCoord) -> Option<&TileTypeId> {
        world.state.tiles.get(tile).map(|tile| tile.tile_type())
    }

    /// Reports whether enemies cannot walk over the tile.
    #[must_use]
    pub fn is_solid(world: &World, tile: TileCoord) -> bool {
        world.state.tiles.is_solid(tile)
    }

    /// Captures the tower standing on a tile, if any.
    #[must_use]
    pub fn tower(world: &World, tile: TileCoord) -> Option<TowerSnapshot> {
        let tower = world.state.tiles.get(tile)?.tower()?;
        Some(TowerSnapshot {
            tower_type: tower.tower_type().clone(),
            level: tower.level(),
            turrets: tower
                .turrets()
                .iter()
                .map(|turret| TurretSnapshot {
                    angle: turret.angle(),
                    targets: turret.targets().to_vec(),
                })
                .collect(),
        })
    }

    /// Derived prices of the tower standing on a tile.
    #[must_use]
    pub fn tower_economics(world: &World, tile: TileCoord) -> Option<TowerEconomics> {
        let tower = world.state.tiles.get(tile)?.tower()?;
        let kind = world.content.tower_type(tower.tower_type())?;
        let max_level = world
            .content
            .rarity(&kind.rarity)
            .map_or(1, |rarity| rarity.max_level);
        Some(TowerEconomics {
            upgrade_cost: (tower.level() < max_level)
                .then(|| towers::upgrade_cost(kind, tower.level())),
            total_cost: towers::total_cost(kind, tower.level()),
            refund: towers::refund(kind, tower.level()),
        })
    }

    /// Cost of reaching the nearest exit from a tile over the installed flow field.
    #[must_use]
    pub fn flow_cost(world: &World, tile: TileCoord) -> Option<f64> {
        world.flow_field.cost(tile)
    }

    /// Reports whether a solid tower on the tile would keep the map completable.
    #[must_use]
    pub fn can_block(world: &World, tile: TileCoord) -> bool {
        world.can_block(tile)
    }

    /// Checks an action against the current state without scheduling it.
    pub fn validate(world: &World, action: &Action) -> Result<(), ActionRejection> {
        world.check_valid(action)
    }

    /// Captures every live enemy ordered by identifier.
    #[must_use]
    pub fn enemies(world: &World) -> Vec<EnemySnapshot> {
        world
            .state
            .enemies
            .iter()
            .filter(|enemy| !enemy.is_dead())
            .map(|enemy| EnemySnapshot {
                id: enemy.id(),
                enemy_type: enemy.enemy_type().clone(),
                position: enemy.position(),
                level: enemy.level(),
                health: enemy.health(),
                max_health: enemy.max_health(),
            })
            .collect()
    }

    /// Captures every projectile in flight.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .state
            .projectiles
            .iter()
            .map(|projectile| ProjectileSnapshot {
                projectile_type: projectile.projectile_type().clone(),
                position: projectile.position(),
                z: projectile.z(),
            })
            .collect()
    }

    /// Number of enemies still waiting in the spawn queue.
    #[must_use]
    pub fn queued_enemies(world: &World) -> usize {
        world.state.enemy_spawner.queued().len()
    }

    /// Every action applied so far together with those still pending.
    #[must_use]
    pub fn action_log(world: &World) -> &ActionLog {
        &world.state.actions
    }

    /// Actions scheduled for future ticks.
    pub fn pending_actions(world: &World) -> impl Iterator<Item = (u64, &[Action])> + '_ {
        world
            .state
            .actions
            .range(world.state.tick.saturating_add(1)..)
            .map(|(tick, actions)| (*tick, actions.as_slice()))
    }

    /// Digest of the hashed simulation state.
    pub fn state_hash(world: &World) -> Result<StateHash, SimulationError> {
        Ok(world.state.hash()?)
    }

    /// Immutable view of a tower.
    #[derive(Clone, Debug, PartialEq)]
    pub struct TowerSnapshot {
        /// Type of the tower.
        pub tower_type: TowerTypeId,
        /// Current level, starting at one.
        pub level: u32,
        /// Working state of each turret in definition order.
        pub turrets: Vec<TurretSnapshot>,
    }

    /// Immutable view of a turret.
    #[derive(Clone, Debug, PartialEq)]
    pub struct TurretSnapshot {
        /// Facing in radians, measured from the tile centre.
        pub angle: f64,
        /// Enemies selected on the last attack.
        pub targets: Vec<EnemyId>,
    }

    /// Prices derived from a tower's type and level.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TowerEconomics {
        /// Price of the next level, or `None` at the rarity's max level.
        pub upgrade_cost: Option<i64>,
        /// Money invested into the tower so far.
        pub total_cost: i64,
        /// Money returned when selling it.
        pub refund: i64,
    }

    /// Immutable view of an enemy.
    #[derive(Clone, Debug, PartialEq)]
    pub struct EnemySnapshot {
        /// Identifier assigned on spawn.
        pub id: EnemyId,
        /// Type of the enemy.
        pub enemy_type: EnemyTypeId,
        /// Centre of the enemy's body.
        pub position: DVec2,
        /// Level the enemy spawned with.
        pub level: i32,
        /// Remaining health.
        pub health: f64,
        /// Health at spawn after level scaling.
        pub max_health: f64,
    }

    /// Immutable view of a projectile.
    #[derive(Clone, Debug, PartialEq)]
    pub struct ProjectileSnapshot {
        /// Type of the projectile.
        pub projectile_type: ProjectileTypeId,
        /// Ground position.
        pub position: DVec2,
        /// Height above the ground.
        pub z: f64,
    }
}
