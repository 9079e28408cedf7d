//! Tower state, derived economics and per-tick turret updates.

use bulwark_core::{
    AttackDefinition, EnemyId, Event, TileCoord, TowerType, TowerTypeId, TICK_SECONDS,
};
use bulwark_system_tower_targeting::{max_range, EnemyProbe, RangeModifiers, TowerTargeting, TurretAim};
use glam::DVec2;
use serde::Serialize;

use crate::{combat::Combat, error::InvariantViolation, projectiles::Projectile};

/// Tower standing on a map tile.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Tower {
    tower_type: TowerTypeId,
    level: u32,
    turrets: Vec<TurretState>,
    #[serde(skip)]
    solid: bool,
}

impl Tower {
    /// Builds a level one tower with one turret state per turret definition.
    pub(crate) fn new(tower_type: TowerTypeId, kind: &TowerType) -> Self {
        Self {
            tower_type,
            level: 1,
            turrets: vec![TurretState::default(); kind.turrets.len()],
            solid: kind.is_solid,
        }
    }

    pub(crate) fn tower_type(&self) -> &TowerTypeId {
        &self.tower_type
    }

    pub(crate) const fn level(&self) -> u32 {
        self.level
    }

    pub(crate) fn is_solid(&self) -> bool {
        self.solid
    }

    pub(crate) fn turrets(&self) -> &[TurretState] {
        &self.turrets
    }

    pub(crate) fn level_up(&mut self) {
        self.level = self.level.saturating_add(1);
    }
}

/// Per-turret working state.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TurretState {
    angle: f64,
    time_since_last_attack: f64,
    #[serde(skip)]
    targets: Vec<EnemyId>,
}

impl TurretState {
    pub(crate) fn angle(&self) -> f64 {
        self.angle
    }

    pub(crate) fn targets(&self) -> &[EnemyId] {
        &self.targets
    }

    fn face_first_target(&mut self, tile: TileCoord, combat: &Combat<'_>) {
        let Some(position) = self
            .targets
            .first()
            .and_then(|target| combat.enemy(*target))
            .map(|enemy| enemy.position())
        else {
            return;
        };
        let center = tile.center();
        let angle = (position.y - center.y).atan2(position.x - center.x);
        self.angle = if angle.is_nan() { 0.0 } else { angle };
    }
}

/// Money needed to raise a tower from `level` to the next level.
pub(crate) fn upgrade_cost(kind: &TowerType, level: u32) -> i64 {
    kind.cost.saturating_mul(i64::from(level))
}

/// Money invested into a tower of `level`: 1, 2, 4, 7, 11 times the base cost.
pub(crate) fn total_cost(kind: &TowerType, level: u32) -> i64 {
    let level = i64::from(level);
    kind.cost.saturating_mul(level * (level - 1) / 2 + 1)
}

/// Money returned when selling a tower of `level`.
pub(crate) fn refund(kind: &TowerType, level: u32) -> i64 {
    (total_cost(kind, level) as f64 * kind.refund_percentage) as i64
}

pub(crate) fn level_damage_modifier(level: u32) -> f64 {
    let level = f64::from(level);
    level * (level - 1.0) / 2.0 + 1.0
}

pub(crate) fn level_range_modifier(level: u32) -> f64 {
    0.8 + f64::from(level) * 0.2
}

/// Scratch buffers reused by every turret during a tick.
#[derive(Debug, Default)]
pub(crate) struct TurretScratch {
    targeting: TowerTargeting,
    probes: Vec<EnemyProbe>,
    /// Targets of uncapped turrets, which keep no list of their own.
    volley: Vec<EnemyId>,
}

/// Advances every turret of the tower on `tile` by one step.
pub(crate) fn tick_tower(
    tile: TileCoord,
    tower: &mut Tower,
    kind: &TowerType,
    scratch: &mut TurretScratch,
    combat: &mut Combat<'_>,
    projectiles: &mut Vec<Projectile>,
) -> Result<(), InvariantViolation> {
    let range = RangeModifiers::new(kind.base_range_modifier, level_range_modifier(tower.level));
    let damage_multiplier = kind.base_damage_modifier * level_damage_modifier(tower.level);

    for (state, definition) in tower.turrets.iter_mut().zip(&kind.turrets) {
        let origin = tile.center() + DVec2::new(definition.offset_x, definition.offset_y);
        let attack_delay = definition.attack_delay / kind.base_attack_rate_modifier;

        state.time_since_last_attack += TICK_SECONDS;
        if state.time_since_last_attack < attack_delay {
            state.face_first_target(tile, combat);
            continue;
        }

        combat.probes(&mut scratch.probes);
        let aim = TurretAim {
            shape: &definition.shape,
            origin,
            range,
            target_cap: definition.simultaneous_targets,
        };
        let targets = if definition.simultaneous_targets == 0 {
            &mut scratch.volley
        } else {
            &mut state.targets
        };
        scratch.targeting.handle(&aim, &scratch.probes, targets);

        let shot = Shot {
            tile,
            origin,
            attack: &definition.attack,
            damage_multiplier,
            tower_range: max_range(&definition.shape, range),
        };
        let mut attacked = false;
        for target in targets.iter() {
            attacked |= shot.fire(*target, combat, projectiles)?;
        }

        if attacked {
            state.time_since_last_attack -= attack_delay;
        } else {
            state.time_since_last_attack = attack_delay;
        }
        state.face_first_target(tile, combat);
    }
    Ok(())
}

struct Shot<'a> {
    tile: TileCoord,
    origin: DVec2,
    attack: &'a AttackDefinition,
    damage_multiplier: f64,
    tower_range: f64,
}

impl Shot<'_> {
    fn fire(
        &self,
        target: EnemyId,
        combat: &mut Combat<'_>,
        projectiles: &mut Vec<Projectile>,
    ) -> Result<bool, InvariantViolation> {
        let Some(index) = combat.enemy_index(target) else {
            return Ok(false);
        };
        let position = combat.enemies[index].position();
        combat.events.push(Event::TurretFired {
            tile: self.tile,
            from: self.origin,
            to: position,
        });

        if let Some(damage) = &self.attack.damage {
            combat.damage(index, damage, self.damage_multiplier)?;
            if let Some(splash) = &self.attack.splash_damage {
                combat.splash(
                    position,
                    self.attack.splash_radius,
                    splash,
                    self.damage_multiplier,
                    Some(target),
                )?;
            }
        }

        if let Some(projectile) = &self.attack.projectile {
            let content = combat.content;
            let kind = content
                .projectile_type(projectile)
                .ok_or_else(|| InvariantViolation::missing("projectile type", projectile))?;
            projectiles.push(Projectile::launch(
                projectile.clone(),
                kind,
                self.origin,
                position,
                self.damage_multiplier,
                self.tower_range,
                self.attack.projectile_spread,
                combat.rng,
            ));
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use bulwark_core::{TargetingShape, TurretDefinition};

    use super::*;
    use crate::combat::tests::{flat, spawn_at, Harness};

    fn priced(cost: i64) -> TowerType {
        TowerType {
            cost,
            ..TowerType::default()
        }
    }

    #[test]
    fn invested_cost_follows_triangular_growth() {
        let kind = priced(100);
        let totals: Vec<i64> = (1..=5).map(|level| total_cost(&kind, level)).collect();
        assert_eq!(totals, vec![100, 200, 400, 700, 1100]);
        assert_eq!(upgrade_cost(&kind, 3), 300);
    }

    #[test]
    fn refund_truncates_the_share() {
        let kind = TowerType {
            refund_percentage: 0.45,
            ..priced(75)
        };
        assert_eq!(refund(&kind, 1), 33);
        assert_eq!(refund(&kind, 2), 67);
    }

    #[test]
    fn level_modifiers_reward_upgrades() {
        assert_eq!(level_damage_modifier(1), 1.0);
        assert_eq!(level_damage_modifier(4), 7.0);
        assert_eq!(level_range_modifier(1), 1.0);
        assert!((level_range_modifier(3) - 1.4).abs() < 1e-12);
    }

    #[test]
    fn new_towers_start_at_level_one_with_a_state_per_turret() {
        let kind = TowerType {
            turrets: vec![Default::default(), Default::default()],
            is_solid: false,
            ..priced(10)
        };
        let mut tower = Tower::new(TowerTypeId::new("twin"), &kind);
        assert_eq!(tower.level(), 1);
        assert_eq!(tower.turrets().len(), 2);
        assert!(!tower.is_solid());
        tower.level_up();
        assert_eq!(tower.level(), 2);
    }

    fn ring(simultaneous_targets: u32) -> TowerType {
        TowerType {
            is_solid: false,
            turrets: vec![TurretDefinition {
                attack_delay: 1.0,
                simultaneous_targets,
                shape: TargetingShape::Circle {
                    radius: 1.5,
                    radius_range_modifier_effect: 1.0,
                },
                attack: AttackDefinition {
                    damage: Some(flat(1.0)),
                    ..AttackDefinition::default()
                },
                ..TurretDefinition::default()
            }],
            ..priced(50)
        }
    }

    fn armed(kind: &TowerType, time_since_last_attack: f64) -> Tower {
        let mut tower = Tower::new(TowerTypeId::new("ring"), kind);
        tower.turrets[0].time_since_last_attack = time_since_last_attack;
        tower
    }

    fn tick(harness: &mut Harness, tower: &mut Tower, kind: &TowerType) {
        let mut scratch = TurretScratch::default();
        let mut projectiles = Vec::new();
        tick_tower(
            TileCoord::new(2, 2),
            tower,
            kind,
            &mut scratch,
            &mut harness.combat(),
            &mut projectiles,
        )
        .expect("turret resolves");
        assert!(projectiles.is_empty());
    }

    #[test]
    fn uncapped_turrets_attack_without_tracking_or_turning() {
        let kind = ring(0);
        let mut harness = Harness::new();
        let _ = spawn_at(&mut harness, "basic", DVec2::new(2.5, 3.5));
        let full = harness.enemies[0].health();
        let mut tower = armed(&kind, 1.0);

        tick(&mut harness, &mut tower, &kind);

        assert!(harness.enemies[0].health() < full);
        assert_eq!(tower.turrets()[0].angle(), 0.0);
        assert!(tower.turrets()[0].targets().is_empty());
    }

    #[test]
    fn capped_turrets_track_and_face_their_target() {
        let kind = ring(1);
        let mut harness = Harness::new();
        let enemy = spawn_at(&mut harness, "basic", DVec2::new(2.5, 3.5));
        let mut tower = armed(&kind, 1.0);

        tick(&mut harness, &mut tower, &kind);

        assert_eq!(tower.turrets()[0].targets(), &[enemy]);
        assert!((tower.turrets()[0].angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn turrets_wait_out_the_attack_delay() {
        let kind = ring(1);
        let mut harness = Harness::new();
        let _ = spawn_at(&mut harness, "basic", DVec2::new(2.5, 3.5));
        let full = harness.enemies[0].health();
        let mut tower = armed(&kind, 0.0);

        tick(&mut harness, &mut tower, &kind);

        assert_eq!(harness.enemies[0].health(), full);
        assert!(tower.turrets()[0].targets().is_empty());
        assert!((tower.turrets()[0].time_since_last_attack - TICK_SECONDS).abs() < 1e-12);
    }

    #[test]
    fn hits_roll_the_timer_back_by_one_delay() {
        let kind = ring(1);
        let mut harness = Harness::new();
        let _ = spawn_at(&mut harness, "basic", DVec2::new(2.5, 3.5));
        let mut tower = armed(&kind, 1.5);

        tick(&mut harness, &mut tower, &kind);

        assert!((tower.turrets()[0].time_since_last_attack - 0.55).abs() < 1e-9);
        assert!(harness
            .events
            .iter()
            .any(|event| matches!(event, Event::TurretFired { tile, .. } if *tile == TileCoord::new(2, 2))));
    }

    #[test]
    fn misses_hold_the_timer_at_the_delay() {
        let kind = ring(1);
        let mut harness = Harness::new();
        let _ = spawn_at(&mut harness, "basic", DVec2::new(7.5, 7.5));
        let mut tower = armed(&kind, 1.5);

        tick(&mut harness, &mut tower, &kind);
        assert_eq!(tower.turrets()[0].time_since_last_attack, 1.0);
        assert!(harness.events.iter().all(|event| !matches!(event, Event::TurretFired { .. })));

        let _ = spawn_at(&mut harness, "basic", DVec2::new(2.5, 3.0));
        tick(&mut harness, &mut tower, &kind);
        assert!((tower.turrets()[0].time_since_last_attack - TICK_SECONDS).abs() < 1e-12);
    }
}
