//! Built-in content shipped with the engine.
//!
//! The official pack is the baseline every mod is layered on. It also carries
//! a small training map whose single wave of basic enemies overwhelms an
//! undefended player.

use std::collections::BTreeMap;

use crate::{
    AttackDefinition, ContentPack, DamageDefinition, EnemyTagId, EnemyType, EnemyTypeId, GameMap,
    MapId, ProjectileType, ProjectileTypeId, RarityId, Spawnpoint, TargetingShape, TileCoord,
    TileType, TileTypeId, TowerRarity, TowerType, TowerTypeId, TurretDefinition, Wave,
    WaveDefinition,
};

/// Identifier of the official fifteen by seven map.
pub const OFFICIAL_MAP: &str = "official";

/// Identifier of the ten by ten training map.
pub const TRAINING_GROUNDS: &str = "trainingGrounds";

/// Official content pack including the training map.
#[must_use]
pub fn official() -> ContentPack {
    let mut pack = ContentPack::default();

    let _ = pack.tile_types.insert("grass".into(), TileType::default());
    let _ = pack.tile_types.insert(
        "dirt".into(),
        TileType {
            is_tower_placeable: false,
            ..TileType::default()
        },
    );
    let _ = pack.tile_types.insert(
        "stone".into(),
        TileType {
            is_solid: true,
            is_tower_placeable: false,
            ..TileType::default()
        },
    );

    let _ = pack.rarities.insert(
        "common".into(),
        TowerRarity {
            max_level: 5,
            rarity_value: 1.0,
        },
    );
    let _ = pack.rarities.insert(
        "rare".into(),
        TowerRarity {
            max_level: 4,
            rarity_value: 0.5,
        },
    );

    let _ = pack.projectile_types.insert(
        "soldierBullet".into(),
        ProjectileType {
            speed: 8.0,
            size: 0.1,
            damage: Some(damage(20.0)),
            ..ProjectileType::default()
        },
    );
    let _ = pack.projectile_types.insert(
        "cannonBall".into(),
        ProjectileType {
            speed: 8.0,
            size: 0.4,
            damage: Some(damage(60.0)),
            splash_damage: Some(damage(15.0)),
            splash_radius: 1.5,
            disappear_when_out_of_range: true,
            splash_when_disappear: true,
            ..ProjectileType::default()
        },
    );

    let _ = pack.tower_types.insert(
        "soldier".into(),
        tower(100, "common", 1.0, 3.0, "soldierBullet"),
    );
    let _ = pack.tower_types.insert(
        "cannon".into(),
        tower(150, "rare", 5.0, 5.5, "cannonBall"),
    );

    let _ = pack.enemy_types.insert(
        "basic".into(),
        EnemyType {
            size: 0.45,
            health: 100.0,
            ..EnemyType::default()
        },
    );
    let _ = pack.enemy_types.insert(
        "heavy".into(),
        EnemyType {
            size: 0.6,
            health: 300.0,
            speed: 0.5,
            weight: 3.0,
            height: 1.5,
            tags: vec![EnemyTagId::new("heavy")],
            ..EnemyType::default()
        },
    );
    let _ = pack.enemy_types.insert(
        "boss".into(),
        EnemyType {
            size: 1.2,
            health: 5000.0,
            speed: 0.2,
            weight: 10.0,
            height: 2.0,
            spawn_on_death: ["heavy", "heavy", "basic", "basic"]
                .into_iter()
                .map(EnemyTypeId::new)
                .collect(),
            ..EnemyType::default()
        },
    );

    let _ = pack.maps.insert(MapId::new(OFFICIAL_MAP), official_map());
    let _ = pack.maps.insert(MapId::new(TRAINING_GROUNDS), training_grounds());
    pack
}

fn official_map() -> GameMap {
    let default_wave = Wave {
        wave_number: 1,
        priority: 1,
        frequency: 1,
        spawn_duration: 5.0,
        enemies: weights(&[("basic", 1.0), ("heavy", 0.5)]),
        ..Wave::default()
    };
    let special_wave = Wave {
        wave_number: 4,
        priority: 10,
        frequency: 4,
        amount_multiplier: 4.0,
        spawn_duration: 10.0,
        wave_duration_multiplier: 2.0,
        is_special_wave: true,
        enemies: weights(&[("basic", 1.0), ("heavy", 1.0)]),
        ..Wave::default()
    };
    let final_wave = Wave {
        wave_number: 5,
        amount_multiplier: 0.3,
        spawn_delay: 10.0,
        spawn_duration: 5.0,
        enemies: weights(&[("boss", 1.0)]),
        child_waves: vec![default_wave.clone(), special_wave.clone()],
        ..Wave::default()
    };

    GameMap {
        width: 15,
        height: 7,
        exits: vec![TileCoord::new(0, 6)],
        starting_money: 500,
        player_health: 100.0,
        default_tile_type: TileTypeId::new("grass"),
        tile_type_weights: [("grass", 0.6), ("dirt", 0.2), ("stone", 0.2)]
            .into_iter()
            .map(|(id, weight)| (TileTypeId::new(id), weight))
            .collect(),
        spawnpoints: vec![Spawnpoint {
            location: TileCoord::new(14, 0),
            tags: Vec::new(),
        }],
        wave_definition: WaveDefinition {
            final_wave: 5,
            wave_interval: 10.0,
            base_wave_reward: 200.0,
            amount_scaling_rate: 0.2,
            reward_scaling_rate: 1.0,
            level_scaling_rate: 1.0,
            waves: vec![default_wave, special_wave, final_wave],
            ..WaveDefinition::default()
        },
        ..GameMap::default()
    }
}

fn training_grounds() -> GameMap {
    GameMap {
        width: 10,
        height: 10,
        exits: vec![TileCoord::new(0, 9)],
        starting_money: 300,
        player_health: 3.0,
        default_tile_type: TileTypeId::new("grass"),
        tile_type_weights: BTreeMap::new(),
        spawnpoints: vec![Spawnpoint {
            location: TileCoord::new(9, 0),
            tags: Vec::new(),
        }],
        wave_definition: WaveDefinition {
            final_wave: 2,
            wave_interval: 10.0,
            base_amount: 5.0,
            base_wave_reward: 50.0,
            level_scaling_rate: 0.0,
            amount_scaling_rate: 0.0,
            reward_scaling_rate: 0.0,
            waves: vec![Wave {
                wave_number: 1,
                enemies: weights(&[("basic", 1.0)]),
                ..Wave::default()
            }],
        },
        ..GameMap::default()
    }
}

fn tower(cost: i64, rarity: &str, delay: f64, radius: f64, projectile: &str) -> TowerType {
    TowerType {
        cost,
        rarity: RarityId::new(rarity),
        turrets: vec![TurretDefinition {
            attack_delay: delay,
            shape: TargetingShape::Circle {
                radius,
                radius_range_modifier_effect: 1.0,
            },
            attack: AttackDefinition {
                projectile: Some(ProjectileTypeId::new(projectile)),
                ..AttackDefinition::default()
            },
            ..TurretDefinition::default()
        }],
        ..TowerType::default()
    }
}

fn damage(amount: f64) -> DamageDefinition {
    DamageDefinition {
        damage: amount,
        damage_multiplier: BTreeMap::new(),
    }
}

fn weights(entries: &[(&str, f64)]) -> BTreeMap<EnemyTypeId, f64> {
    entries
        .iter()
        .map(|(id, weight)| (EnemyTypeId::new(*id), *weight))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn official_pack_carries_both_maps() {
        let pack = official();
        assert!(pack.maps.contains_key(&MapId::new(OFFICIAL_MAP)));
        assert!(pack.maps.contains_key(&MapId::new(TRAINING_GROUNDS)));
    }

    #[test]
    fn final_official_wave_releases_its_children() {
        let pack = official();
        let map = &pack.maps[&MapId::new(OFFICIAL_MAP)];
        let last = map.wave_definition.wave_at(5).expect("final wave");
        assert_eq!(last.child_waves.len(), 2);
        assert_eq!(map.wave_definition.wave_at(4).map(|w| w.priority), Some(10));
    }
}
