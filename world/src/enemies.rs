//! Enemy state and the per-tick movement pass.

use bulwark_core::{
    EnemyId, EnemyTagId, EnemyType, EnemyTypeId, Event, GameMap, SimRng, TileCoord, TICK_SECONDS,
};
use bulwark_system_movement::{self as movement, Body};
use glam::{DVec2, IVec2};
use serde::Serialize;

use crate::{navigation::FlowField, tiles::TileGrid};

/// Enemy walking toward the exits.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Enemy {
    id: EnemyId,
    enemy_type: EnemyTypeId,
    position: DVec2,
    velocity: DVec2,
    level: i32,
    health: f64,
    max_health: f64,
    lifetime: f64,
    current_tile: Option<IVec2>,
    heading: Option<IVec2>,
    dead: bool,
    #[serde(skip)]
    stats: Stats,
}

#[derive(Clone, Debug, Default)]
struct Stats {
    size: f64,
    weight: f64,
    speed: f64,
    z: f64,
    height: f64,
    base_health: f64,
    tags: Vec<EnemyTagId>,
}

impl Enemy {
    pub(crate) fn spawn(
        id: EnemyId,
        enemy_type: EnemyTypeId,
        kind: &EnemyType,
        position: DVec2,
        level: i32,
    ) -> Self {
        let max_health = kind.health * (0.9 + f64::from(level) * 0.1).powf(1.15);
        Self {
            id,
            enemy_type,
            position,
            velocity: DVec2::ZERO,
            level,
            health: max_health,
            max_health,
            lifetime: 0.0,
            current_tile: None,
            heading: None,
            dead: false,
            stats: Stats {
                size: kind.size,
                weight: kind.weight,
                speed: kind.speed,
                z: kind.z,
                height: kind.height,
                base_health: kind.health,
                tags: kind.tags.clone(),
            },
        }
    }

    pub(crate) const fn id(&self) -> EnemyId {
        self.id
    }

    pub(crate) fn enemy_type(&self) -> &EnemyTypeId {
        &self.enemy_type
    }

    pub(crate) const fn position(&self) -> DVec2 {
        self.position
    }

    pub(crate) const fn level(&self) -> i32 {
        self.level
    }

    pub(crate) const fn health(&self) -> f64 {
        self.health
    }

    pub(crate) const fn max_health(&self) -> f64 {
        self.max_health
    }

    pub(crate) const fn lifetime(&self) -> f64 {
        self.lifetime
    }

    pub(crate) const fn is_dead(&self) -> bool {
        self.dead
    }

    pub(crate) const fn size(&self) -> f64 {
        self.stats.size
    }

    pub(crate) fn tags(&self) -> &[EnemyTagId] {
        &self.stats.tags
    }

    /// Reports whether `z` lies within the enemy's vertical hitbox.
    pub(crate) fn spans_height(&self, z: f64) -> bool {
        z >= self.stats.z && z <= self.stats.z + self.stats.height
    }

    /// Subtracts health and reports whether this blow killed the enemy.
    pub(crate) fn take_damage(&mut self, amount: f64) -> bool {
        if self.dead {
            return false;
        }
        self.health -= amount;
        if self.health <= 0.0 {
            self.dead = true;
        }
        self.dead
    }

    /// Damage dealt to the player when escaping, scaled back by level.
    fn escape_damage(&self) -> f64 {
        self.health / (self.max_health / self.stats.base_health) / 100.0
    }

    fn body(&self) -> Body {
        Body {
            position: self.position,
            size: self.stats.size,
            weight: self.stats.weight,
        }
    }
}

/// Read-only terrain consulted while enemies move.
pub(crate) struct Terrain<'a> {
    pub(crate) map: &'a GameMap,
    pub(crate) grid: &'a TileGrid,
    pub(crate) field: &'a FlowField,
}

/// Moves every enemy one step and removes those that died or escaped.
pub(crate) fn tick_enemies(
    enemies: &mut Vec<Enemy>,
    terrain: &Terrain<'_>,
    rng: &mut SimRng,
    player_health: &mut f64,
    events: &mut Vec<Event>,
) {
    let bounds = DVec2::new(f64::from(terrain.map.width), f64::from(terrain.map.height));

    for index in 0..enemies.len() {
        if enemies[index].dead {
            continue;
        }

        let enemy = &mut enemies[index];
        enemy.lifetime += TICK_SECONDS;
        enemy.position = movement::integrate(enemy.position, enemy.velocity, TICK_SECONDS, bounds);

        let tile = movement::tile_of(enemy.position);
        let mut previous = None;
        if enemy.current_tile != Some(tile) {
            previous = enemy.current_tile.replace(tile);
            enemy.heading = None;

            let on_exit = TileCoord::from_signed(tile.x, tile.y)
                .is_some_and(|coord| terrain.map.is_exit(coord));
            if on_exit {
                let damage = enemy.escape_damage();
                *player_health -= damage;
                enemy.dead = true;
                events.push(Event::EnemyEscaped {
                    enemy: enemy.id,
                    damage,
                });
                continue;
            }
        }

        let heading = match enemy.heading {
            Some(heading) => heading,
            None => {
                let heading = movement::choose_heading(
                    tile,
                    previous,
                    |neighbour| terrain.field.cost_at(neighbour),
                    rng.next_f64(),
                );
                enemy.heading = Some(heading);
                heading
            }
        };

        let standing_on_solid = terrain
            .grid
            .tile_at(tile)
            .map_or(true, |coord| terrain.grid.is_solid(coord));
        if standing_on_solid {
            enemy.velocity = movement::unstick(
                enemy.velocity,
                enemy.position,
                tile,
                heading,
                |neighbour| terrain.grid.is_open_at(neighbour),
            );
        }

        let body = enemies[index].body();
        let push = movement::separation(
            body,
            enemies
                .iter()
                .enumerate()
                .filter(|(other, enemy)| *other != index && !enemy.dead)
                .map(|(_, enemy)| enemy.body()),
        );

        let enemy = &mut enemies[index];
        enemy.velocity = movement::steer(enemy.velocity + push, tile, heading, enemy.stats.speed);
    }

    enemies.retain(|enemy| !enemy.dead);
}
