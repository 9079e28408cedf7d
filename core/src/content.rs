//! Immutable content definitions consumed by the simulation.
//!
//! Definitions reference each other through string identifiers. The defaults
//! applied to omitted JSON fields match the values content authors rely on.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::TileCoord;

macro_rules! content_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from its string form.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrows the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

content_id!(
    /// Identifier of a [`TileType`].
    TileTypeId
);
content_id!(
    /// Identifier of a [`TowerType`].
    TowerTypeId
);
content_id!(
    /// Identifier of a [`TowerRarity`].
    RarityId
);
content_id!(
    /// Identifier of a [`ProjectileType`].
    ProjectileTypeId
);
content_id!(
    /// Identifier of an [`EnemyType`].
    EnemyTypeId
);
content_id!(
    /// Tag attached to enemy types and matched by damage multipliers.
    EnemyTagId
);
content_id!(
    /// Tag attached to spawnpoints and matched by waves.
    SpawnpointTagId
);
content_id!(
    /// Identifier of a [`GameMap`].
    MapId
);

/// Terrain kind assigned to map tiles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TileType {
    /// Enemies cannot walk through solid tiles.
    pub is_solid: bool,
    /// Whether towers may be built on the tile.
    pub is_tower_placeable: bool,
    /// Divides the pathfinding cost; faster terrain attracts enemies.
    pub movement_speed_modifier: f64,
    /// Multiplies the pathfinding cost.
    pub pathfinding_cost_modifier: f64,
}

impl TileType {
    /// Cost of stepping onto a traversable tile of this type.
    #[must_use]
    pub fn traversal_cost(&self) -> f64 {
        self.pathfinding_cost_modifier / self.movement_speed_modifier
    }
}

impl Default for TileType {
    fn default() -> Self {
        Self {
            is_solid: false,
            is_tower_placeable: true,
            movement_speed_modifier: 1.0,
            pathfinding_cost_modifier: 1.0,
        }
    }
}

/// Rarity tier bounding how far a tower can be upgraded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TowerRarity {
    /// Highest level a tower of this rarity may reach.
    pub max_level: u32,
    /// Relative drop weight used by content tooling.
    pub rarity_value: f64,
}

impl Default for TowerRarity {
    fn default() -> Self {
        Self {
            max_level: 1,
            rarity_value: 1.0,
        }
    }
}

/// Buildable tower definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TowerType {
    /// Price of building the tower at level one.
    pub cost: i64,
    /// Solid towers block enemy movement.
    pub is_solid: bool,
    /// Multiplier applied to all turret damage.
    pub base_damage_modifier: f64,
    /// Multiplier applied to all turret ranges.
    pub base_range_modifier: f64,
    /// Divides every turret's attack delay.
    pub base_attack_rate_modifier: f64,
    /// Share of the invested money returned when selling.
    pub refund_percentage: f64,
    /// Rarity tier capping the tower's level.
    pub rarity: RarityId,
    /// Independently targeting attack units.
    pub turrets: Vec<TurretDefinition>,
}

impl Default for TowerType {
    fn default() -> Self {
        Self {
            cost: 0,
            is_solid: true,
            base_damage_modifier: 1.0,
            base_range_modifier: 1.0,
            base_attack_rate_modifier: 1.0,
            refund_percentage: 0.5,
            rarity: RarityId::new("common"),
            turrets: Vec::new(),
        }
    }
}

/// Single attack unit mounted on a tower.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TurretDefinition {
    /// Seconds between attacks before rate modifiers.
    pub attack_delay: f64,
    /// Maximum number of tracked targets; zero attacks every enemy in range.
    pub simultaneous_targets: u32,
    /// Horizontal offset from the tile centre.
    pub offset_x: f64,
    /// Vertical offset from the tile centre.
    pub offset_y: f64,
    /// Area in which enemies can be targeted.
    pub shape: TargetingShape,
    /// Effect applied to each attacked enemy.
    pub attack: AttackDefinition,
}

impl Default for TurretDefinition {
    fn default() -> Self {
        Self {
            attack_delay: 1.0,
            simultaneous_targets: 1,
            offset_x: 0.0,
            offset_y: 0.0,
            shape: TargetingShape::default(),
            attack: AttackDefinition::default(),
        }
    }
}

/// Region relative to a turret in which enemies are targetable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TargetingShape {
    /// Disc centred on the turret.
    Circle {
        /// Radius before range modifiers.
        radius: f64,
        /// Fraction of the per-level range bonus applied to the radius.
        #[serde(default = "full_effect")]
        radius_range_modifier_effect: f64,
    },
    /// Axis-aligned box centred at an offset from the turret.
    Rectangle {
        /// Width before range modifiers; the sign is ignored.
        width: f64,
        /// Height before range modifiers; the sign is ignored.
        height: f64,
        /// Horizontal offset of the box centre.
        #[serde(default)]
        offset_x: f64,
        /// Vertical offset of the box centre.
        #[serde(default)]
        offset_y: f64,
        /// Fraction of the per-level range bonus applied to the width.
        #[serde(default = "full_effect")]
        width_range_modifier_effect: f64,
        /// Fraction of the per-level range bonus applied to the height.
        #[serde(default = "full_effect")]
        height_range_modifier_effect: f64,
        /// Fraction of the per-level range bonus applied to the x offset.
        #[serde(default = "full_effect")]
        offset_x_range_modifier_effect: f64,
        /// Fraction of the per-level range bonus applied to the y offset.
        #[serde(default = "full_effect")]
        offset_y_range_modifier_effect: f64,
    },
    /// Intersection of several shapes.
    Compound {
        /// Every listed shape must contain the enemy.
        shapes: Vec<TargetingShape>,
    },
}

fn full_effect() -> f64 {
    1.0
}

impl Default for TargetingShape {
    fn default() -> Self {
        Self::Circle {
            radius: 1.0,
            radius_range_modifier_effect: 1.0,
        }
    }
}

/// Effect of a turret attack.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttackDefinition {
    /// Instant damage dealt to the target.
    pub damage: Option<DamageDefinition>,
    /// Instant damage dealt around the target when direct damage lands.
    pub splash_damage: Option<DamageDefinition>,
    /// Radius of the instant splash.
    pub splash_radius: f64,
    /// Projectile launched toward the target.
    pub projectile: Option<ProjectileTypeId>,
    /// Random angular spread of launched projectiles, in degrees.
    pub projectile_spread: f64,
}

/// Amount of damage plus per-tag multipliers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DamageDefinition {
    /// Base damage before modifiers.
    pub damage: f64,
    /// Multipliers applied when the victim carries the tag.
    pub damage_multiplier: BTreeMap<EnemyTagId, f64>,
}

/// Ballistic projectile definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectileType {
    /// Horizontal speed in tiles per second.
    pub speed: f64,
    /// Initial vertical speed.
    pub z_speed: f64,
    /// Vertical acceleration.
    pub z_acceleration: f64,
    /// Launch height.
    pub z_initial: f64,
    /// Damage dealt to each enemy hit.
    pub damage: Option<DamageDefinition>,
    /// Damage dealt around impacts.
    pub splash_damage: Option<DamageDefinition>,
    /// Diameter used for hit tests.
    pub size: f64,
    /// Hits after which the projectile disappears.
    pub max_hits: u32,
    /// Allows piercing projectiles to hit the same enemy repeatedly.
    pub multiple_hits_to_same_enemy: bool,
    /// Radius of splash damage.
    pub splash_radius: f64,
    /// Removes the projectile once it flew past the turret's range.
    pub disappear_when_out_of_range: bool,
    /// Splashes when removed for leaving the range.
    pub splash_when_disappear: bool,
    /// Splashes around every enemy hit.
    pub splash_when_hitting_enemy: bool,
    /// Splashes on ground impact.
    pub splash_when_hitting_ground: bool,
}

impl Default for ProjectileType {
    fn default() -> Self {
        Self {
            speed: 1.0,
            z_speed: 0.0,
            z_acceleration: 0.0,
            z_initial: 0.5,
            damage: None,
            splash_damage: None,
            size: 0.1,
            max_hits: 1,
            multiple_hits_to_same_enemy: false,
            splash_radius: 0.0,
            disappear_when_out_of_range: false,
            splash_when_disappear: false,
            splash_when_hitting_enemy: true,
            splash_when_hitting_ground: true,
        }
    }
}

/// Enemy definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnemyType {
    /// Diameter used for collisions and targeting.
    pub size: f64,
    /// Health at level one.
    pub health: f64,
    /// Acceleration toward the chosen tile.
    pub speed: f64,
    /// Mass used when enemies push each other apart.
    pub weight: f64,
    /// Bottom of the vertical hitbox.
    pub z: f64,
    /// Height of the vertical hitbox.
    pub height: f64,
    /// Tags matched by damage multipliers.
    pub tags: Vec<EnemyTagId>,
    /// Enemies released at the death position.
    pub spawn_on_death: Vec<EnemyTypeId>,
}

impl Default for EnemyType {
    fn default() -> Self {
        Self {
            size: 0.0,
            health: 0.0,
            speed: 1.0,
            weight: 1.0,
            z: 0.0,
            height: 1.0,
            tags: Vec::new(),
            spawn_on_death: Vec::new(),
        }
    }
}

/// Tile where enemies enter the map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spawnpoint {
    /// Location of the spawnpoint.
    pub location: TileCoord,
    /// Tags that waves may filter on.
    #[serde(default)]
    pub tags: Vec<SpawnpointTagId>,
}

/// Wave schedule attached to a map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaveDefinition {
    /// Wave after which no further waves start; zero means endless.
    pub final_wave: u32,
    /// Seconds between wave starts before duration multipliers.
    pub wave_interval: f64,
    /// Enemies per wave before scaling.
    pub base_amount: f64,
    /// Money granted at wave start before scaling.
    pub base_wave_reward: f64,
    /// Level increase per wave.
    pub level_scaling_rate: f64,
    /// Relative amount increase per wave.
    pub amount_scaling_rate: f64,
    /// Relative reward increase per wave.
    pub reward_scaling_rate: f64,
    /// Declared waves.
    pub waves: Vec<Wave>,
}

impl Default for WaveDefinition {
    fn default() -> Self {
        Self {
            final_wave: 10,
            wave_interval: 30.0,
            base_amount: 5.0,
            base_wave_reward: 50.0,
            level_scaling_rate: 0.5,
            amount_scaling_rate: 0.1,
            reward_scaling_rate: 0.1,
            waves: Vec::new(),
        }
    }
}

impl WaveDefinition {
    /// Resolves the wave played at the given number.
    ///
    /// Exact matches win over recurring matches; within each group the highest
    /// priority wins and the first declared wave breaks ties.
    #[must_use]
    pub fn wave_at(&self, number: u32) -> Option<&Wave> {
        let number = i64::from(number);
        let exact = highest_priority(
            self.waves
                .iter()
                .filter(|wave| i64::from(wave.wave_number) == number),
        );
        exact.or_else(|| {
            highest_priority(self.waves.iter().filter(|wave| {
                wave.frequency != 0
                    && (number - i64::from(wave.wave_number)) % i64::from(wave.frequency) == 0
            }))
        })
    }
}

fn highest_priority<'a>(waves: impl Iterator<Item = &'a Wave>) -> Option<&'a Wave> {
    waves.fold(None, |best: Option<&Wave>, wave| match best {
        Some(current) if current.priority >= wave.priority => Some(current),
        _ => Some(wave),
    })
}

/// Batch of enemies released together.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Wave {
    /// Wave number the batch is declared for.
    pub wave_number: i32,
    /// Tie-breaker between waves matching the same number.
    pub priority: i32,
    /// Recurrence interval in waves; zero disables recurrence.
    pub frequency: i32,
    /// Multiplier applied to the scaled enemy amount.
    pub amount_multiplier: f64,
    /// Added to the scaled enemy level.
    pub level_modifier: i32,
    /// Multiplier applied to the wave interval while this wave runs.
    pub wave_duration_multiplier: f64,
    /// Seconds before the first enemy may appear.
    pub spawn_delay: f64,
    /// Seconds over which enemies are spread.
    pub spawn_duration: f64,
    /// Special waves use a single enemy type for the whole batch.
    pub is_special_wave: bool,
    /// Relative weights of enemy types.
    pub enemies: BTreeMap<EnemyTypeId, f64>,
    /// Tags restricting which spawnpoints are used.
    pub spawnpoint_tags: Vec<SpawnpointTagId>,
    /// Batches released alongside this one.
    pub child_waves: Vec<Wave>,
}

impl Default for Wave {
    fn default() -> Self {
        Self {
            wave_number: 0,
            priority: 0,
            frequency: 0,
            amount_multiplier: 1.0,
            level_modifier: 0,
            wave_duration_multiplier: 1.0,
            spawn_delay: 0.0,
            spawn_duration: 0.0,
            is_special_wave: false,
            enemies: BTreeMap::new(),
            spawnpoint_tags: Vec::new(),
            child_waves: Vec::new(),
        }
    }
}

/// Playable map layout and rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameMap {
    /// Number of tile columns.
    pub width: u32,
    /// Number of tile rows.
    pub height: u32,
    /// Tiles where enemies leave the map and damage the player.
    pub exits: Vec<TileCoord>,
    /// Requires every exit to be reachable from every other exit.
    pub is_all_exits_must_be_reachable: bool,
    /// Money available at the start.
    pub starting_money: i64,
    /// Health available at the start.
    pub player_health: f64,
    /// Tile type assigned before random generation.
    pub default_tile_type: TileTypeId,
    /// Weighted tile types drawn during generation.
    pub tile_type_weights: BTreeMap<TileTypeId, f64>,
    /// Tiles where enemies appear.
    pub spawnpoints: Vec<Spawnpoint>,
    /// Wave schedule played on the map.
    pub wave_definition: WaveDefinition,
}

impl Default for GameMap {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            exits: Vec::new(),
            is_all_exits_must_be_reachable: true,
            starting_money: 0,
            player_health: 0.0,
            default_tile_type: TileTypeId::new("grass"),
            tile_type_weights: BTreeMap::new(),
            spawnpoints: Vec::new(),
            wave_definition: WaveDefinition::default(),
        }
    }
}

impl GameMap {
    /// Reports whether the coordinate lies inside the map.
    #[must_use]
    pub fn contains(&self, tile: TileCoord) -> bool {
        tile.x() < self.width && tile.y() < self.height
    }

    /// Reports whether the tile is one of the map's exits.
    #[must_use]
    pub fn is_exit(&self, tile: TileCoord) -> bool {
        self.exits.contains(&tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(number: i32, priority: i32, frequency: i32) -> Wave {
        Wave {
            wave_number: number,
            priority,
            frequency,
            ..Wave::default()
        }
    }

    #[test]
    fn wave_at_prefers_higher_priority_and_recurrence() {
        let definition = WaveDefinition {
            waves: vec![wave(1, 1, 1), wave(4, 10, 4)],
            ..WaveDefinition::default()
        };

        assert_eq!(definition.wave_at(4).map(|w| w.priority), Some(10));
        assert_eq!(definition.wave_at(8).map(|w| w.priority), Some(10));
        assert_eq!(definition.wave_at(12).map(|w| w.priority), Some(10));
        assert_eq!(definition.wave_at(1).map(|w| w.priority), Some(1));
    }

    #[test]
    fn wave_at_returns_none_between_recurrences() {
        let definition = WaveDefinition {
            waves: vec![wave(4, 10, 4)],
            ..WaveDefinition::default()
        };

        assert!(definition.wave_at(2).is_none());
        assert!(definition.wave_at(5).is_none());
        assert!(definition.wave_at(8).is_some());
    }

    #[test]
    fn exact_match_beats_recurring_match_of_higher_priority() {
        let definition = WaveDefinition {
            waves: vec![wave(2, 50, 2), wave(6, 0, 0)],
            ..WaveDefinition::default()
        };

        assert_eq!(definition.wave_at(6).map(|w| w.wave_number), Some(6));
        assert_eq!(definition.wave_at(4).map(|w| w.wave_number), Some(2));
    }

    #[test]
    fn omitted_fields_take_content_defaults() {
        let tower: TowerType =
            serde_json::from_str(r#"{"cost":100,"rarity":"rare"}"#).expect("tower parses");
        assert!(tower.is_solid);
        assert_eq!(tower.refund_percentage, 0.5);
        assert_eq!(tower.rarity, RarityId::new("rare"));

        let shape: TargetingShape =
            serde_json::from_str(r#"{"kind":"circle","radius":3.0}"#).expect("shape parses");
        assert_eq!(
            shape,
            TargetingShape::Circle {
                radius: 3.0,
                radius_range_modifier_effect: 1.0
            }
        );
    }

    #[test]
    fn traversal_cost_combines_modifiers() {
        let mud = TileType {
            movement_speed_modifier: 0.5,
            pathfinding_cost_modifier: 1.5,
            ..TileType::default()
        };
        assert_eq!(mud.traversal_cost(), 3.0);
    }
}
