//! Damage, kill rewards and enemy spawning shared by turrets and projectiles.

use bulwark_core::{
    ContentRegistry, DamageDefinition, EnemyId, EnemyType, EnemyTypeId, Event, SimRng,
};
use bulwark_system_tower_targeting::EnemyProbe;
use glam::DVec2;

use crate::{enemies::Enemy, error::InvariantViolation};

/// Mutable slice of the simulation touched while resolving attacks.
///
/// Enemies are only ever appended while a `Combat` is alive, so indices stay
/// valid and the list stays sorted by identifier.
pub(crate) struct Combat<'a> {
    pub(crate) content: &'a ContentRegistry,
    pub(crate) enemies: &'a mut Vec<Enemy>,
    pub(crate) money: &'a mut i64,
    pub(crate) score: &'a mut i64,
    pub(crate) next_enemy_id: &'a mut u32,
    pub(crate) rng: &'a mut SimRng,
    pub(crate) events: &'a mut Vec<Event>,
}

impl Combat<'_> {
    pub(crate) fn enemy_index(&self, id: EnemyId) -> Option<usize> {
        self.enemies.binary_search_by_key(&id, Enemy::id).ok()
    }

    pub(crate) fn enemy(&self, id: EnemyId) -> Option<&Enemy> {
        self.enemy_index(id).map(|index| &self.enemies[index])
    }

    /// Fills `probes` with every live enemy.
    pub(crate) fn probes(&self, probes: &mut Vec<EnemyProbe>) {
        probes.clear();
        probes.extend(
            self.enemies
                .iter()
                .filter(|enemy| !enemy.is_dead())
                .map(|enemy| EnemyProbe {
                    enemy: enemy.id(),
                    position: enemy.position(),
                    size: enemy.size(),
                }),
        );
    }

    /// Indices of enemies whose body overlaps the circle.
    fn enemies_within(&self, center: DVec2, radius: f64) -> Vec<usize> {
        self.enemies
            .iter()
            .enumerate()
            .filter(|(_, enemy)| {
                let reach = radius + enemy.size();
                enemy.position().distance_squared(center) <= reach * reach
            })
            .map(|(index, _)| index)
            .collect()
    }

    /// Applies damage to the enemy at `index`, rewarding the player on a kill.
    pub(crate) fn damage(
        &mut self,
        index: usize,
        damage: &DamageDefinition,
        multiplier: f64,
    ) -> Result<(), InvariantViolation> {
        let Some(enemy) = self.enemies.get_mut(index) else {
            return Ok(());
        };
        if enemy.is_dead() {
            return Ok(());
        }

        let mut amount = damage.damage * multiplier;
        for tag in enemy.tags() {
            if let Some(factor) = damage.damage_multiplier.get(tag) {
                amount *= factor;
            }
        }
        if !enemy.take_damage(amount) {
            return Ok(());
        }

        let id = enemy.id();
        let position = enemy.position();
        let level = enemy.level();
        let enemy_type = enemy.enemy_type().clone();
        let max_health = enemy.max_health();
        let lifetime = enemy.lifetime();

        let money = self.rng.randomly_round(max_health.sqrt() / 10.0).max(1);
        let score = self
            .rng
            .randomly_round(max_health.sqrt() / (lifetime + 1.0).cbrt().cbrt())
            .max(1);
        *self.money += money;
        *self.score += score;
        self.events.push(Event::EnemyKilled {
            enemy: id,
            position,
            money,
            score,
        });

        let content = self.content;
        let kind = content
            .enemy_type(&enemy_type)
            .ok_or_else(|| InvariantViolation::missing("enemy type", &enemy_type))?;
        for spawned in &kind.spawn_on_death {
            let spawned_kind = content
                .enemy_type(spawned)
                .ok_or_else(|| InvariantViolation::missing("enemy type", spawned))?;
            let _ = self.spawn(spawned, spawned_kind, position, level);
        }
        Ok(())
    }

    /// Damages every enemy overlapping the circle except `exclude`.
    pub(crate) fn splash(
        &mut self,
        center: DVec2,
        radius: f64,
        damage: &DamageDefinition,
        multiplier: f64,
        exclude: Option<EnemyId>,
    ) -> Result<(), InvariantViolation> {
        for index in self.enemies_within(center, radius) {
            if Some(self.enemies[index].id()) == exclude {
                continue;
            }
            self.damage(index, damage, multiplier)?;
        }
        if radius > 0.0 {
            self.events.push(Event::Splash {
                position: center,
                radius,
            });
        }
        Ok(())
    }

    /// Appends a fresh enemy and announces it.
    pub(crate) fn spawn(
        &mut self,
        enemy_type: &EnemyTypeId,
        kind: &EnemyType,
        position: DVec2,
        level: i32,
    ) -> EnemyId {
        let id = EnemyId::new(*self.next_enemy_id);
        *self.next_enemy_id = self.next_enemy_id.wrapping_add(1);
        self.enemies
            .push(Enemy::spawn(id, enemy_type.clone(), kind, position, level));
        self.events.push(Event::EnemySpawned {
            enemy: id,
            enemy_type: enemy_type.clone(),
            position,
        });
        id
    }
}
