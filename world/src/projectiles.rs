//! Ballistic projectiles launched by turrets.

use std::collections::BTreeSet;

use bulwark_core::{EnemyId, ProjectileType, ProjectileTypeId, SimRng, TICK_SECONDS};
use glam::DVec2;
use serde::Serialize;

use crate::{combat::Combat, error::InvariantViolation};

/// Projectile in flight.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Projectile {
    projectile_type: ProjectileTypeId,
    position: DVec2,
    velocity: DVec2,
    z: f64,
    z_velocity: f64,
    damage_multiplier: f64,
    tower_range: f64,
    range_travelled: f64,
    hits: u32,
    enemies_hit: Option<BTreeSet<EnemyId>>,
}

impl Projectile {
    /// Aims a new projectile from `origin` at `target`, then applies spread.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn launch(
        projectile_type: ProjectileTypeId,
        kind: &ProjectileType,
        origin: DVec2,
        target: DVec2,
        damage_multiplier: f64,
        tower_range: f64,
        spread_degrees: f64,
        rng: &mut SimRng,
    ) -> Self {
        let delta = target - origin;
        let distance = delta.length();
        let direction = if distance > 0.0 {
            delta / distance
        } else {
            DVec2::X
        };
        let mut velocity = direction * kind.speed;

        if spread_degrees != 0.0 {
            let magnitude = velocity.length();
            let angle = velocity.y.atan2(velocity.x)
                + (rng.next_f64() - 0.5) * spread_degrees.to_radians();
            velocity = DVec2::new(magnitude * angle.cos(), magnitude * angle.sin());
        }

        Self {
            projectile_type,
            position: origin,
            velocity,
            z: kind.z_initial,
            z_velocity: kind.z_speed,
            damage_multiplier,
            tower_range,
            range_travelled: 0.0,
            hits: 0,
            enemies_hit: None,
        }
    }

    pub(crate) fn projectile_type(&self) -> &ProjectileTypeId {
        &self.projectile_type
    }

    pub(crate) const fn position(&self) -> DVec2 {
        self.position
    }

    pub(crate) const fn z(&self) -> f64 {
        self.z
    }

    /// Advances the projectile and resolves impacts; returns whether it is spent.
    fn tick(&mut self, kind: &ProjectileType, bounds: DVec2, combat: &mut Combat<'_>) -> Result<bool, InvariantViolation> {
        self.position += self.velocity * TICK_SECONDS;
        self.range_travelled += self.velocity.length() * TICK_SECONDS;
        self.z += self.z_velocity * TICK_SECONDS;
        self.z_velocity += kind.z_acceleration * TICK_SECONDS;

        if self.position.x < 0.0
            || self.position.y < 0.0
            || self.position.x >= bounds.x
            || self.position.y >= bounds.y
        {
            return Ok(true);
        }

        if kind.disappear_when_out_of_range && self.range_travelled > self.tower_range {
            if kind.splash_when_disappear {
                self.splash(kind, None, combat)?;
            }
            return Ok(true);
        }

        if self.z <= 0.0 {
            if kind.splash_when_hitting_ground {
                self.splash(kind, None, combat)?;
            }
            return Ok(true);
        }

        let candidates = combat.enemies.len();
        for index in 0..candidates {
            let enemy = &combat.enemies[index];
            if enemy.is_dead() || !self.overlaps(kind, enemy.position(), enemy.size()) {
                continue;
            }
            if !enemy.spans_height(self.z) {
                continue;
            }
            let id = enemy.id();
            if self
                .enemies_hit
                .as_ref()
                .is_some_and(|hit| hit.contains(&id))
            {
                continue;
            }

            self.strike(kind, index, id, combat)?;
            self.hits += 1;
            if self.hits >= kind.max_hits {
                return Ok(true);
            }
            if !kind.multiple_hits_to_same_enemy {
                let _ = self.enemies_hit.get_or_insert_with(BTreeSet::new).insert(id);
            }
        }
        Ok(false)
    }

    fn overlaps(&self, kind: &ProjectileType, position: DVec2, size: f64) -> bool {
        let offset = self.position - position;
        let reach = (kind.size + size) * 0.5;
        offset.x.abs() < reach && offset.y.abs() < reach && offset.length_squared() <= reach * reach
    }

    fn strike(
        &self,
        kind: &ProjectileType,
        index: usize,
        id: EnemyId,
        combat: &mut Combat<'_>,
    ) -> Result<(), InvariantViolation> {
        if let Some(damage) = &kind.damage {
            combat.damage(index, damage, self.damage_multiplier)?;
        }
        if kind.splash_when_hitting_enemy {
            let exclude = kind.damage.as_ref().map(|_| id);
            self.splash(kind, exclude, combat)?;
        }
        Ok(())
    }

    fn splash(
        &self,
        kind: &ProjectileType,
        exclude: Option<EnemyId>,
        combat: &mut Combat<'_>,
    ) -> Result<(), InvariantViolation> {
        let Some(splash) = &kind.splash_damage else {
            return Ok(());
        };
        combat.splash(
            self.position,
            kind.splash_radius,
            splash,
            self.damage_multiplier,
            exclude,
        )
    }
}

/// Advances every projectile and drops those that are spent.
pub(crate) fn tick_projectiles(
    projectiles: &mut Vec<Projectile>,
    bounds: DVec2,
    combat: &mut Combat<'_>,
) -> Result<(), InvariantViolation> {
    let content = combat.content;
    let mut spent = Vec::new();
    for (index, projectile) in projectiles.iter_mut().enumerate() {
        let kind = content
            .projectile_type(&projectile.projectile_type)
            .ok_or_else(|| InvariantViolation::missing("projectile type", &projectile.projectile_type))?;
        if projectile.tick(kind, bounds, combat)? {
            spent.push(index);
        }
    }

    let mut index = 0;
    projectiles.retain(|_| {
        let keep = spent.binary_search(&index).is_err();
        index += 1;
        keep
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use bulwark_core::Event;

    use super::*;
    use crate::{
        combat::tests::{flat, spawn_at, Harness},
        enemies::Enemy,
    };

    const BOUNDS: DVec2 = DVec2::new(10.0, 10.0);

    fn bolt() -> ProjectileType {
        ProjectileType {
            speed: 10.0,
            ..ProjectileType::default()
        }
    }

    #[test]
    fn launch_aims_at_the_target_at_full_speed() {
        let mut rng = SimRng::seed_from(1);
        let projectile = Projectile::launch(
            "bolt".into(),
            &bolt(),
            DVec2::new(1.0, 1.0),
            DVec2::new(4.0, 5.0),
            1.0,
            3.0,
            0.0,
            &mut rng,
        );
        assert!((projectile.velocity - DVec2::new(6.0, 8.0)).length() < 1e-12);
        assert_eq!(projectile.z(), 0.5);
    }

    #[test]
    fn launch_on_top_of_the_target_fires_along_x() {
        let mut rng = SimRng::seed_from(1);
        let projectile = Projectile::launch(
            "bolt".into(),
            &bolt(),
            DVec2::ONE,
            DVec2::ONE,
            1.0,
            3.0,
            0.0,
            &mut rng,
        );
        assert_eq!(projectile.velocity, DVec2::new(10.0, 0.0));
    }

    #[test]
    fn spread_keeps_speed_and_bounds_the_angle() {
        let mut rng = SimRng::seed_from(5);
        for _ in 0..16 {
            let projectile = Projectile::launch(
                "bolt".into(),
                &bolt(),
                DVec2::ZERO,
                DVec2::new(1.0, 0.0),
                1.0,
                3.0,
                20.0,
                &mut rng,
            );
            assert!((projectile.velocity.length() - 10.0).abs() < 1e-9);
            let angle = projectile.velocity.y.atan2(projectile.velocity.x);
            assert!(angle.abs() <= 10.0_f64.to_radians() + 1e-12);
        }
    }

    #[test]
    fn hit_test_uses_half_the_combined_size() {
        let mut rng = SimRng::seed_from(1);
        let projectile = Projectile::launch(
            "bolt".into(),
            &bolt(),
            DVec2::new(2.0, 2.0),
            DVec2::new(3.0, 2.0),
            1.0,
            3.0,
            0.0,
            &mut rng,
        );
        let kind = bolt();
        assert!(projectile.overlaps(&kind, DVec2::new(2.25, 2.0), 0.45));
        assert!(!projectile.overlaps(&kind, DVec2::new(2.3, 2.0), 0.45));
    }

    fn fire(kind: &ProjectileType, from: DVec2, tower_range: f64) -> Projectile {
        fire_named("shell", kind, from, tower_range)
    }

    fn fire_named(name: &str, kind: &ProjectileType, from: DVec2, tower_range: f64) -> Projectile {
        let mut rng = SimRng::seed_from(1);
        Projectile::launch(
            name.into(),
            kind,
            from,
            from + DVec2::X,
            1.0,
            tower_range,
            0.0,
            &mut rng,
        )
    }

    fn splashing() -> ProjectileType {
        ProjectileType {
            speed: 10.0,
            splash_damage: Some(flat(5.0)),
            splash_radius: 1.0,
            ..ProjectileType::default()
        }
    }

    fn splashed(harness: &Harness) -> bool {
        harness
            .events
            .iter()
            .any(|event| matches!(event, Event::Splash { .. }))
    }

    #[test]
    fn leaving_the_map_spends_the_projectile() {
        let kind = bolt();
        let mut harness = Harness::new();
        let mut projectile = fire(&kind, DVec2::new(9.9, 5.0), 3.0);
        assert!(projectile
            .tick(&kind, BOUNDS, &mut harness.combat())
            .expect("tick resolves"));
    }

    #[test]
    fn flying_past_the_range_disappears_and_optionally_splashes() {
        for splash_when_disappear in [false, true] {
            let kind = ProjectileType {
                disappear_when_out_of_range: true,
                splash_when_disappear,
                ..splashing()
            };
            let mut harness = Harness::new();
            let _ = spawn_at(&mut harness, "basic", DVec2::new(5.5, 6.0));
            let full = harness.enemies[0].health();
            let mut projectile = fire(&kind, DVec2::new(5.0, 5.0), 0.3);

            assert!(projectile
                .tick(&kind, BOUNDS, &mut harness.combat())
                .expect("tick resolves"));
            assert_eq!(splashed(&harness), splash_when_disappear);
            assert_eq!(harness.enemies[0].health() < full, splash_when_disappear);
        }
    }

    #[test]
    fn projectiles_within_range_keep_flying() {
        let kind = ProjectileType {
            disappear_when_out_of_range: true,
            ..splashing()
        };
        let mut harness = Harness::new();
        let mut projectile = fire(&kind, DVec2::new(5.0, 5.0), 3.0);
        assert!(!projectile
            .tick(&kind, BOUNDS, &mut harness.combat())
            .expect("tick resolves"));
        assert!((projectile.position() - DVec2::new(5.5, 5.0)).length() < 1e-12);
    }

    #[test]
    fn hitting_the_ground_lands_and_optionally_splashes() {
        for splash_when_hitting_ground in [false, true] {
            let kind = ProjectileType {
                z_speed: -20.0,
                splash_when_hitting_ground,
                ..splashing()
            };
            let mut harness = Harness::new();
            let _ = spawn_at(&mut harness, "basic", DVec2::new(5.5, 6.0));
            let full = harness.enemies[0].health();
            let mut projectile = fire(&kind, DVec2::new(5.0, 5.0), 3.0);

            assert!(projectile
                .tick(&kind, BOUNDS, &mut harness.combat())
                .expect("tick resolves"));
            assert!(projectile.z() <= 0.0);
            assert_eq!(splashed(&harness), splash_when_hitting_ground);
            assert_eq!(harness.enemies[0].health() < full, splash_when_hitting_ground);
        }
    }

    #[test]
    fn only_enemies_whose_hitbox_spans_the_height_are_struck() {
        let kind = ProjectileType {
            speed: 1.0,
            z_initial: 2.0,
            damage: Some(flat(10.0)),
            ..ProjectileType::default()
        };
        let mut harness = Harness::new();
        let _ = spawn_at(&mut harness, "basic", DVec2::new(5.05, 5.0));
        let _ = spawn_at(&mut harness, "boss", DVec2::new(5.05, 5.0));
        let full: Vec<f64> = harness.enemies.iter().map(Enemy::health).collect();
        let mut projectile = fire(&kind, DVec2::new(5.0, 5.0), 3.0);

        assert!(projectile
            .tick(&kind, BOUNDS, &mut harness.combat())
            .expect("tick resolves"));
        assert_eq!(harness.enemies[0].health(), full[0]);
        assert!((full[1] - harness.enemies[1].health() - 10.0).abs() < 1e-9);
    }

    fn piercing(multiple_hits_to_same_enemy: bool) -> ProjectileType {
        ProjectileType {
            speed: 1.0,
            max_hits: 3,
            multiple_hits_to_same_enemy,
            damage: Some(flat(10.0)),
            ..ProjectileType::default()
        }
    }

    fn damage_taken(harness: &Harness, full: &[f64]) -> Vec<f64> {
        harness
            .enemies
            .iter()
            .zip(full)
            .map(|(enemy, full)| (full - enemy.health()).round())
            .collect()
    }

    #[test]
    fn piercing_projectiles_strike_each_enemy_once() {
        let kind = piercing(false);
        let mut harness = Harness::new();
        let _ = spawn_at(&mut harness, "basic", DVec2::new(5.05, 5.0));
        let _ = spawn_at(&mut harness, "basic", DVec2::new(5.05, 5.0));
        let full: Vec<f64> = harness.enemies.iter().map(Enemy::health).collect();
        let mut projectile = fire(&kind, DVec2::new(5.0, 5.0), 3.0);

        for _ in 0..2 {
            assert!(!projectile
                .tick(&kind, BOUNDS, &mut harness.combat())
                .expect("tick resolves"));
        }
        assert_eq!(damage_taken(&harness, &full), vec![10.0, 10.0]);
        assert_eq!(projectile.hits, 2);
    }

    #[test]
    fn repeat_hits_exhaust_max_hits() {
        let kind = piercing(true);
        let mut harness = Harness::new();
        let _ = spawn_at(&mut harness, "basic", DVec2::new(5.05, 5.0));
        let _ = spawn_at(&mut harness, "basic", DVec2::new(5.05, 5.0));
        let full: Vec<f64> = harness.enemies.iter().map(Enemy::health).collect();
        let mut projectile = fire(&kind, DVec2::new(5.0, 5.0), 3.0);

        assert!(!projectile
            .tick(&kind, BOUNDS, &mut harness.combat())
            .expect("tick resolves"));
        assert!(projectile
            .tick(&kind, BOUNDS, &mut harness.combat())
            .expect("tick resolves"));
        assert_eq!(damage_taken(&harness, &full), vec![20.0, 10.0]);
        assert!(projectile.enemies_hit.is_none());
    }

    #[test]
    fn spent_projectiles_are_dropped_from_the_flight_list() {
        let mut harness = Harness::new();
        let kind = harness
            .content
            .projectile_type(&"soldierBullet".into())
            .expect("catalog projectile")
            .clone();
        let mut projectiles = vec![
            fire_named("soldierBullet", &kind, DVec2::new(9.9, 5.0), 3.0),
            fire_named("soldierBullet", &kind, DVec2::new(2.0, 5.0), 3.0),
        ];

        tick_projectiles(&mut projectiles, BOUNDS, &mut harness.combat()).expect("tick resolves");
        assert_eq!(projectiles.len(), 1);
        assert!((projectiles[0].position().x - 2.4).abs() < 1e-12);
    }
}
