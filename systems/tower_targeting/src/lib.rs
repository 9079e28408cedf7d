#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure targeting rules for turrets: shape geometry and target acquisition.

use bulwark_core::{EnemyId, TargetingShape};
use glam::DVec2;

/// Range multipliers contributed by the tower type and the tower's level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangeModifiers {
    /// Tower type's base range modifier.
    pub base: f64,
    /// Level-derived range modifier; one means no bonus.
    pub level: f64,
}

impl RangeModifiers {
    /// Creates modifiers from the base and level factors.
    #[must_use]
    pub const fn new(base: f64, level: f64) -> Self {
        Self { base, level }
    }

    /// Scales a shape dimension, applying `effect` of the level bonus.
    #[must_use]
    pub fn scale(&self, value: f64, effect: f64) -> f64 {
        value * self.base * ((self.level - 1.0) * effect + 1.0)
    }
}

/// Reports whether an enemy of `size` at `position` lies within the shape.
#[must_use]
pub fn contains(
    shape: &TargetingShape,
    origin: DVec2,
    range: RangeModifiers,
    position: DVec2,
    size: f64,
) -> bool {
    let delta = position - origin;
    match shape {
        TargetingShape::Circle {
            radius,
            radius_range_modifier_effect,
        } => {
            let reach = range.scale(*radius, *radius_range_modifier_effect) + size;
            delta.x.abs() < reach && delta.y.abs() < reach && delta.length_squared() < reach * reach
        }
        TargetingShape::Rectangle {
            width,
            height,
            offset_x,
            offset_y,
            width_range_modifier_effect,
            height_range_modifier_effect,
            offset_x_range_modifier_effect,
            offset_y_range_modifier_effect,
        } => {
            let centre = DVec2::new(
                range.scale(*offset_x, *offset_x_range_modifier_effect),
                range.scale(*offset_y, *offset_y_range_modifier_effect),
            );
            let half_width = range.scale(*width, *width_range_modifier_effect).abs() * 0.5 + size;
            let half_height = range.scale(*height, *height_range_modifier_effect).abs() * 0.5 + size;
            let offset = delta - centre;
            offset.x.abs() < half_width && offset.y.abs() < half_height
        }
        TargetingShape::Compound { shapes } => shapes
            .iter()
            .all(|inner| contains(inner, origin, range, position, size)),
    }
}

/// Furthest distance from the turret covered by the shape.
#[must_use]
pub fn max_range(shape: &TargetingShape, range: RangeModifiers) -> f64 {
    match shape {
        TargetingShape::Circle {
            radius,
            radius_range_modifier_effect,
        } => range.scale(*radius, *radius_range_modifier_effect),
        TargetingShape::Rectangle {
            width,
            height,
            offset_x,
            offset_y,
            width_range_modifier_effect,
            height_range_modifier_effect,
            offset_x_range_modifier_effect,
            offset_y_range_modifier_effect,
        } => {
            let horizontal = range.scale(*width, *width_range_modifier_effect).abs() * 0.5
                + range.scale(*offset_x, *offset_x_range_modifier_effect).abs();
            let vertical = range.scale(*height, *height_range_modifier_effect).abs() * 0.5
                + range.scale(*offset_y, *offset_y_range_modifier_effect).abs();
            (horizontal * horizontal + vertical * vertical).sqrt()
        }
        TargetingShape::Compound { shapes } => shapes
            .iter()
            .map(|inner| max_range(inner, range))
            .fold(0.0, f64::max),
    }
}

/// Live enemy considered for targeting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyProbe {
    /// Identifier of the enemy.
    pub enemy: EnemyId,
    /// Current position.
    pub position: DVec2,
    /// Collision diameter.
    pub size: f64,
}

/// Turret parameters relevant to target acquisition.
#[derive(Clone, Copy, Debug)]
pub struct TurretAim<'a> {
    /// Targeting area.
    pub shape: &'a TargetingShape,
    /// Turret position.
    pub origin: DVec2,
    /// Range multipliers of the owning tower.
    pub range: RangeModifiers,
    /// Maximum number of targets; zero targets everything in range.
    pub target_cap: u32,
}

impl TurretAim<'_> {
    fn covers(&self, probe: &EnemyProbe) -> bool {
        contains(self.shape, self.origin, self.range, probe.position, probe.size)
    }
}

#[derive(Clone, Copy, Debug)]
struct RankedCandidate {
    enemy: EnemyId,
    distance_sq: f64,
}

/// Target acquisition that reuses a scratch buffer across turrets.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    ranked: Vec<RankedCandidate>,
}

impl TowerTargeting {
    /// Creates a targeting system with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates `targets` for a turret about to attack.
    ///
    /// Uncapped turrets replace the list with every covered enemy in probe
    /// order. Capped turrets keep targets that are still alive and covered,
    /// then refill up to the cap nearest-first, breaking distance ties by
    /// enemy identifier.
    pub fn handle(&mut self, aim: &TurretAim<'_>, probes: &[EnemyProbe], targets: &mut Vec<EnemyId>) {
        if aim.target_cap == 0 {
            targets.clear();
            targets.extend(
                probes
                    .iter()
                    .filter(|probe| aim.covers(probe))
                    .map(|probe| probe.enemy),
            );
            return;
        }

        targets.retain(|enemy| {
            probes
                .iter()
                .any(|probe| probe.enemy == *enemy && aim.covers(probe))
        });

        let cap = usize::try_from(aim.target_cap).unwrap_or(usize::MAX);
        if targets.len() >= cap {
            targets.truncate(cap);
            return;
        }

        self.ranked.clear();
        for probe in probes {
            if targets.contains(&probe.enemy) || !aim.covers(probe) {
                continue;
            }
            self.ranked.push(RankedCandidate {
                enemy: probe.enemy,
                distance_sq: probe.position.distance_squared(aim.origin),
            });
        }

        self.ranked.sort_by(|a, b| {
            a.distance_sq
                .total_cmp(&b.distance_sq)
                .then_with(|| a.enemy.cmp(&b.enemy))
        });

        let free = cap - targets.len();
        targets.extend(self.ranked.iter().take(free).map(|candidate| candidate.enemy));
    }
}
