//! Content merging, validation and lookup.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    EnemyType, EnemyTypeId, GameMap, MapId, ProjectileType, ProjectileTypeId, RarityId,
    TargetingShape, TileType, TileTypeId, TowerRarity, TowerType, TowerTypeId, Wave,
};

/// String-keyed tables of content definitions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentPack {
    /// Terrain kinds.
    pub tile_types: BTreeMap<TileTypeId, TileType>,
    /// Rarity tiers.
    pub rarities: BTreeMap<RarityId, TowerRarity>,
    /// Buildable towers.
    pub tower_types: BTreeMap<TowerTypeId, TowerType>,
    /// Projectiles launched by turrets.
    pub projectile_types: BTreeMap<ProjectileTypeId, ProjectileType>,
    /// Enemy kinds.
    pub enemy_types: BTreeMap<EnemyTypeId, EnemyType>,
    /// Playable maps.
    pub maps: BTreeMap<MapId, GameMap>,
}

impl ContentPack {
    fn remove_id(&mut self, id: &str) {
        self.tile_types.retain(|key, _| key.as_str() != id);
        self.rarities.retain(|key, _| key.as_str() != id);
        self.tower_types.retain(|key, _| key.as_str() != id);
        self.projectile_types.retain(|key, _| key.as_str() != id);
        self.enemy_types.retain(|key, _| key.as_str() != id);
        self.maps.retain(|key, _| key.as_str() != id);
    }

    fn absorb(&mut self, other: ContentPack) {
        self.tile_types.extend(other.tile_types);
        self.rarities.extend(other.rarities);
        self.tower_types.extend(other.tower_types);
        self.projectile_types.extend(other.projectile_types);
        self.enemy_types.extend(other.enemy_types);
        self.maps.extend(other.maps);
    }
}

/// Descriptive header of a mod.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModInformation {
    /// Stable identifier of the mod.
    pub mod_id: String,
    /// Human readable name.
    pub name: String,
    /// Content identifiers removed before this mod's content is added.
    pub remove: Vec<String>,
}

/// Content shipped by a single mod.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModContent {
    /// Header describing the mod.
    pub mod_information: ModInformation,
    /// Definitions added or overridden by the mod.
    pub content: ContentPack,
}

/// Errors raised while merging or validating content.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContentError {
    /// A definition references an identifier that does not exist.
    #[error("{owner} references missing {kind} '{id}'")]
    MissingReference {
        /// Definition holding the dangling reference.
        owner: String,
        /// Kind of content that was expected.
        kind: &'static str,
        /// Identifier that could not be resolved.
        id: String,
    },
    /// A wave has no enemy weights to draw from.
    #[error("wave {wave} on map '{map}' has no positive enemy weights")]
    EmptyWaveRoster {
        /// Map owning the wave.
        map: String,
        /// Declared wave number.
        wave: i32,
    },
    /// A map coordinate lies outside the map.
    #[error("map '{map}' places a {what} outside the grid at ({x}, {y})")]
    OutOfBounds {
        /// Offending map.
        map: String,
        /// Kind of coordinate.
        what: &'static str,
        /// Column of the coordinate.
        x: u32,
        /// Row of the coordinate.
        y: u32,
    },
    /// A map has a zero dimension.
    #[error("map '{0}' has an empty grid")]
    EmptyGrid(String),
    /// A map has no spawnpoints.
    #[error("map '{0}' declares no spawnpoints")]
    NoSpawnpoints(String),
    /// A numeric field that must be positive is not.
    #[error("{owner} requires a positive {field}")]
    NonPositive {
        /// Definition holding the field.
        owner: String,
        /// Name of the field.
        field: &'static str,
    },
    /// The requested map is not part of the content.
    #[error("unknown map '{0}'")]
    UnknownMap(String),
}

/// Validated, merged content shared by every simulation built from it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContentRegistry {
    pack: ContentPack,
    mod_ids: Vec<String>,
}

impl ContentRegistry {
    /// Merges the mods onto the base pack in order and validates the result.
    ///
    /// Each mod first removes the identifiers it lists and then adds or
    /// overrides its own definitions.
    pub fn build(base: ContentPack, mods: &[ModContent]) -> Result<Self, ContentError> {
        let mut pack = base;
        let mut mod_ids = Vec::with_capacity(mods.len());
        for content in mods {
            for id in &content.mod_information.remove {
                pack.remove_id(id);
            }
            pack.absorb(content.content.clone());
            mod_ids.push(content.mod_information.mod_id.clone());
        }

        let registry = Self { pack, mod_ids };
        registry.validate()?;
        Ok(registry)
    }

    /// Identifiers of the mods merged into the registry, in load order.
    #[must_use]
    pub fn mod_ids(&self) -> &[String] {
        &self.mod_ids
    }

    /// Looks up a tile type.
    #[must_use]
    pub fn tile_type(&self, id: &TileTypeId) -> Option<&TileType> {
        self.pack.tile_types.get(id)
    }

    /// Looks up a rarity tier.
    #[must_use]
    pub fn rarity(&self, id: &RarityId) -> Option<&TowerRarity> {
        self.pack.rarities.get(id)
    }

    /// Looks up a tower type.
    #[must_use]
    pub fn tower_type(&self, id: &TowerTypeId) -> Option<&TowerType> {
        self.pack.tower_types.get(id)
    }

    /// Looks up a projectile type.
    #[must_use]
    pub fn projectile_type(&self, id: &ProjectileTypeId) -> Option<&ProjectileType> {
        self.pack.projectile_types.get(id)
    }

    /// Looks up an enemy type.
    #[must_use]
    pub fn enemy_type(&self, id: &EnemyTypeId) -> Option<&EnemyType> {
        self.pack.enemy_types.get(id)
    }

    /// Looks up a map.
    pub fn map(&self, id: &MapId) -> Result<&GameMap, ContentError> {
        self.pack
            .maps
            .get(id)
            .ok_or_else(|| ContentError::UnknownMap(id.to_string()))
    }

    /// Tower types available for building, in identifier order.
    pub fn tower_types(&self) -> impl Iterator<Item = (&TowerTypeId, &TowerType)> {
        self.pack.tower_types.iter()
    }

    fn validate(&self) -> Result<(), ContentError> {
        for (id, tower) in &self.pack.tower_types {
            let owner = format!("tower type '{id}'");
            if self.rarity(&tower.rarity).is_none() {
                return Err(missing(&owner, "rarity", tower.rarity.as_str()));
            }
            for turret in &tower.turrets {
                validate_shape(&owner, &turret.shape)?;
                if let Some(projectile) = &turret.attack.projectile {
                    if self.projectile_type(projectile).is_none() {
                        return Err(missing(&owner, "projectile type", projectile.as_str()));
                    }
                }
            }
        }

        for (id, rarity) in &self.pack.rarities {
            if rarity.max_level == 0 {
                return Err(ContentError::NonPositive {
                    owner: format!("rarity '{id}'"),
                    field: "maxLevel",
                });
            }
        }

        for (id, enemy) in &self.pack.enemy_types {
            let owner = format!("enemy type '{id}'");
            if enemy.health <= 0.0 {
                return Err(ContentError::NonPositive {
                    owner,
                    field: "health",
                });
            }
            if enemy.weight <= 0.0 {
                return Err(ContentError::NonPositive {
                    owner,
                    field: "weight",
                });
            }
            for spawned in &enemy.spawn_on_death {
                if self.enemy_type(spawned).is_none() {
                    return Err(missing(&owner, "enemy type", spawned.as_str()));
                }
            }
        }

        for (id, map) in &self.pack.maps {
            self.validate_map(id, map)?;
        }

        Ok(())
    }

    fn validate_map(&self, id: &MapId, map: &GameMap) -> Result<(), ContentError> {
        let owner = format!("map '{id}'");
        if map.width == 0 || map.height == 0 {
            return Err(ContentError::EmptyGrid(id.to_string()));
        }
        if map.spawnpoints.is_empty() {
            return Err(ContentError::NoSpawnpoints(id.to_string()));
        }
        if self.tile_type(&map.default_tile_type).is_none() {
            return Err(missing(&owner, "tile type", map.default_tile_type.as_str()));
        }
        for tile_type in map.tile_type_weights.keys() {
            if self.tile_type(tile_type).is_none() {
                return Err(missing(&owner, "tile type", tile_type.as_str()));
            }
        }

        let locations = map
            .exits
            .iter()
            .map(|exit| ("exit", *exit))
            .chain(map.spawnpoints.iter().map(|spawn| ("spawnpoint", spawn.location)));
        for (what, tile) in locations {
            if !map.contains(tile) {
                return Err(ContentError::OutOfBounds {
                    map: id.to_string(),
                    what,
                    x: tile.x(),
                    y: tile.y(),
                });
            }
        }

        if map.wave_definition.wave_interval <= 0.0 {
            return Err(ContentError::NonPositive {
                owner,
                field: "waveInterval",
            });
        }

        for wave in &map.wave_definition.waves {
            self.validate_wave(id, wave)?;
        }
        Ok(())
    }

    fn validate_wave(&self, map: &MapId, wave: &Wave) -> Result<(), ContentError> {
        let total: f64 = wave.enemies.values().filter(|weight| **weight > 0.0).sum();
        if total <= 0.0 {
            return Err(ContentError::EmptyWaveRoster {
                map: map.to_string(),
                wave: wave.wave_number,
            });
        }
        for enemy in wave.enemies.keys() {
            if self.enemy_type(enemy).is_none() {
                return Err(missing(
                    &format!("wave {} on map '{map}'", wave.wave_number),
                    "enemy type",
                    enemy.as_str(),
                ));
            }
        }
        for child in &wave.child_waves {
            self.validate_wave(map, child)?;
        }
        Ok(())
    }
}

fn validate_shape(owner: &str, shape: &TargetingShape) -> Result<(), ContentError> {
    match shape {
        TargetingShape::Compound { shapes } if shapes.is_empty() => Err(ContentError::NonPositive {
            owner: owner.to_owned(),
            field: "compound shape count",
        }),
        TargetingShape::Compound { shapes } => {
            shapes.iter().try_for_each(|inner| validate_shape(owner, inner))
        }
        TargetingShape::Circle { .. } | TargetingShape::Rectangle { .. } => Ok(()),
    }
}

fn missing(owner: &str, kind: &'static str, id: &str) -> ContentError {
    ContentError::MissingReference {
        owner: owner.to_owned(),
        kind,
        id: id.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn official_catalog_validates() {
        let registry = ContentRegistry::build(catalog::official(), &[]).expect("catalog is valid");
        assert!(registry.map(&MapId::new(catalog::OFFICIAL_MAP)).is_ok());
        assert!(registry.tower_type(&TowerTypeId::new("soldier")).is_some());
        assert!(registry.mod_ids().is_empty());
    }

    #[test]
    fn mods_remove_then_override_in_order() {
        let mut cheaper = catalog::official()
            .tower_types
            .remove(&TowerTypeId::new("cannon"))
            .expect("cannon exists");
        cheaper.cost = 1;

        let mut content = ContentPack::default();
        let _ = content.tower_types.insert(TowerTypeId::new("cannon"), cheaper);
        let mods = vec![
            ModContent {
                mod_information: ModInformation {
                    mod_id: "no-soldiers".into(),
                    name: "No soldiers".into(),
                    remove: vec!["soldier".into()],
                },
                content: ContentPack::default(),
            },
            ModContent {
                mod_information: ModInformation {
                    mod_id: "cheap-cannons".into(),
                    ..ModInformation::default()
                },
                content,
            },
        ];

        let registry = ContentRegistry::build(catalog::official(), &mods).expect("mods merge");
        assert!(registry.tower_type(&TowerTypeId::new("soldier")).is_none());
        assert_eq!(
            registry.tower_type(&TowerTypeId::new("cannon")).map(|t| t.cost),
            Some(1)
        );
        assert_eq!(registry.mod_ids(), ["no-soldiers", "cheap-cannons"]);
    }

    #[test]
    fn removing_a_referenced_enemy_is_rejected() {
        let mods = vec![ModContent {
            mod_information: ModInformation {
                mod_id: "no-heavies".into(),
                remove: vec!["heavy".into()],
                ..ModInformation::default()
            },
            content: ContentPack::default(),
        }];

        let error = ContentRegistry::build(catalog::official(), &mods).expect_err("dangling");
        assert!(matches!(
            error,
            ContentError::MissingReference { kind: "enemy type", .. }
        ));
    }

    #[test]
    fn unknown_map_lookups_fail() {
        let registry = ContentRegistry::build(catalog::official(), &[]).expect("valid");
        assert_eq!(
            registry.map(&MapId::new("nowhere")),
            Err(ContentError::UnknownMap("nowhere".into()))
        );
    }
}
