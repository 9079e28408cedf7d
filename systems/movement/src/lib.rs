#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure steering rules for enemies walking down the flow field.
//!
//! Enemies move continuously. Whenever one enters a new tile it picks a
//! neighbouring tile to head for, preferring lower flow-field costs without
//! always taking the best one. Each step it then blends damping, acceleration
//! toward that tile, separation from overlapping enemies and, when standing
//! inside something solid, a push back into open ground.

use glam::{DVec2, IVec2};

/// Neighbour offsets in the order they are weighed: right, left, up, down.
pub const HEADINGS: [IVec2; 4] = [
    IVec2::new(1, 0),
    IVec2::new(-1, 0),
    IVec2::new(0, -1),
    IVec2::new(0, 1),
];

const SOLID_DAMPING: f64 = 0.7;
const UNSTICK_IMPULSE: f64 = 0.5;
const SEPARATION_STRENGTH: f64 = 0.02;
const VELOCITY_DAMPING: f64 = 0.95;
const ACCELERATION_SCALE: f64 = 0.05;
const EDGE_EPSILON: f64 = 1e-7;

/// Chooses the next tile to head for.
///
/// `cost` yields the flow-field cost of in-bounds tiles and `None` outside the
/// map. Out-of-bounds tiles and the tile the enemy just left are excluded.
/// Remaining neighbours are weighted by `exp(min - cost)` and sampled with
/// `roll`, a uniform draw from `[0, 1)`.
pub fn choose_heading<F>(tile: IVec2, previous: Option<IVec2>, cost: F, roll: f64) -> IVec2
where
    F: Fn(IVec2) -> Option<f64>,
{
    let costs = HEADINGS.map(|offset| {
        let neighbour = tile + offset;
        if Some(neighbour) == previous {
            return f64::MAX;
        }
        cost(neighbour).unwrap_or(f64::MAX)
    });

    let min = costs.iter().copied().fold(f64::MAX, f64::min);
    let weights = costs.map(|cost| (-(cost - min)).exp());
    let total: f64 = weights.iter().sum();

    let mut remaining = roll * total;
    for (offset, weight) in HEADINGS.iter().zip(weights).take(3) {
        remaining -= weight;
        if remaining <= 0.0 {
            return tile + *offset;
        }
    }
    tile + HEADINGS[3]
}

/// Pushes an enemy standing on a solid tile back toward open ground.
///
/// The push goes toward the nearest edge shared with an open neighbour, or
/// toward the heading if every neighbour is blocked.
pub fn unstick<F>(velocity: DVec2, position: DVec2, tile: IVec2, heading: IVec2, is_open: F) -> DVec2
where
    F: Fn(IVec2) -> bool,
{
    let mut velocity = velocity * SOLID_DAMPING;
    let local = position - tile.as_dvec2();
    let edge_distances = [1.0 - local.x, local.x, local.y, 1.0 - local.y];

    let nearest = HEADINGS
        .iter()
        .zip(edge_distances)
        .filter(|(offset, _)| is_open(tile + **offset))
        .map(|(_, distance)| distance)
        .fold(None, |best: Option<f64>, distance| {
            Some(best.map_or(distance, |best| best.min(distance)))
        });

    match nearest {
        None => velocity += (heading - tile).as_dvec2() * UNSTICK_IMPULSE,
        Some(nearest) => {
            for (offset, distance) in HEADINGS.iter().zip(edge_distances) {
                if distance == nearest && is_open(tile + *offset) {
                    velocity += offset.as_dvec2() * UNSTICK_IMPULSE;
                }
            }
        }
    }
    velocity
}

/// Body of another enemy considered for separation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    /// Current position.
    pub position: DVec2,
    /// Collision diameter.
    pub size: f64,
    /// Mass.
    pub weight: f64,
}

/// Impulse pushing `body` away from every overlapping neighbour.
///
/// Heavier neighbours push harder. Bodies sharing the exact same position
/// exert no force.
pub fn separation(body: Body, neighbours: impl IntoIterator<Item = Body>) -> DVec2 {
    let mut impulse = DVec2::ZERO;
    for other in neighbours {
        let reach = (body.size + other.size) * 0.5;
        let offset = body.position - other.position;
        let distance_sq = offset.length_squared();
        if distance_sq <= 0.0 || distance_sq >= reach * reach {
            continue;
        }
        let distance = distance_sq.sqrt();
        impulse += offset / distance * SEPARATION_STRENGTH * (other.weight / body.weight);
    }
    impulse
}

/// Damps the velocity and accelerates toward the heading tile.
#[must_use]
pub fn steer(velocity: DVec2, tile: IVec2, heading: IVec2, speed: f64) -> DVec2 {
    velocity * VELOCITY_DAMPING + (heading - tile).as_dvec2() * speed * ACCELERATION_SCALE
}

/// Integrates the position over `dt` and clamps it inside the map.
#[must_use]
pub fn integrate(position: DVec2, velocity: DVec2, dt: f64, bounds: DVec2) -> DVec2 {
    let moved = position + velocity * dt;
    DVec2::new(
        moved.x.clamp(0.0, bounds.x - EDGE_EPSILON),
        moved.y.clamp(0.0, bounds.y - EDGE_EPSILON),
    )
}

/// Tile containing a continuous position.
#[must_use]
pub fn tile_of(position: DVec2) -> IVec2 {
    position.floor().as_ivec2()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(costs: [(IVec2, f64); 4]) -> impl Fn(IVec2) -> Option<f64> {
        move |tile| {
            costs
                .iter()
                .find(|(candidate, _)| *candidate == tile)
                .map(|(_, cost)| *cost)
        }
    }

    #[test]
    fn strongly_cheaper_neighbour_always_wins() {
        let tile = IVec2::new(5, 5);
        let costs = field([
            (IVec2::new(6, 5), 90.0),
            (IVec2::new(4, 5), 10.0),
            (IVec2::new(5, 4), 90.0),
            (IVec2::new(5, 6), 90.0),
        ]);
        for roll in [0.25, 0.5, 0.999] {
            assert_eq!(choose_heading(tile, None, &costs, roll), IVec2::new(4, 5));
        }
    }

    #[test]
    fn previous_tile_and_out_of_bounds_are_excluded() {
        let tile = IVec2::new(0, 0);
        let costs = field([
            (IVec2::new(1, 0), 0.0),
            (IVec2::new(0, 1), 5.0),
            (IVec2::new(-9, -9), 0.0),
            (IVec2::new(-9, -8), 0.0),
        ]);
        let heading = choose_heading(tile, Some(IVec2::new(1, 0)), &costs, 0.3);
        assert_eq!(heading, IVec2::new(0, 1));
    }

    #[test]
    fn equal_costs_split_by_roll() {
        let tile = IVec2::new(1, 1);
        let costs = |_: IVec2| Some(1.0);
        assert_eq!(choose_heading(tile, None, costs, 0.1), IVec2::new(2, 1));
        assert_eq!(choose_heading(tile, None, costs, 0.3), IVec2::new(0, 1));
        assert_eq!(choose_heading(tile, None, costs, 0.6), IVec2::new(1, 0));
        assert_eq!(choose_heading(tile, None, costs, 0.9), IVec2::new(1, 2));
    }

    #[test]
    fn unstick_pushes_toward_nearest_open_edge() {
        let tile = IVec2::new(3, 3);
        let position = DVec2::new(3.9, 3.5);
        let pushed = unstick(DVec2::ZERO, position, tile, IVec2::new(3, 2), |_| true);
        assert_eq!(pushed, DVec2::new(0.5, 0.0));

        let enclosed = unstick(DVec2::new(1.0, 0.0), position, tile, IVec2::new(3, 2), |_| false);
        assert_eq!(enclosed, DVec2::new(0.7, -0.5));
    }

    #[test]
    fn heavier_neighbours_push_harder() {
        let body = Body {
            position: DVec2::new(1.0, 1.0),
            size: 0.5,
            weight: 1.0,
        };
        let light = Body {
            position: DVec2::new(1.2, 1.0),
            size: 0.5,
            weight: 1.0,
        };
        let heavy = Body { weight: 3.0, ..light };
        let far = Body {
            position: DVec2::new(3.0, 1.0),
            ..light
        };

        let light_push = separation(body, [light, far]);
        let heavy_push = separation(body, [heavy]);
        assert!(light_push.x < 0.0);
        assert!((heavy_push.x - light_push.x * 3.0).abs() < 1e-12);
        assert_eq!(separation(body, [body]), DVec2::ZERO);
    }

    #[test]
    fn integrate_clamps_to_map() {
        let bounds = DVec2::new(10.0, 7.0);
        let clamped = integrate(DVec2::new(9.99, 0.01), DVec2::new(1.0, -1.0), 0.05, bounds);
        assert_eq!(clamped, DVec2::new(10.0 - 1e-7, 0.0));
        assert_eq!(tile_of(clamped), IVec2::new(9, 0));
    }

    #[test]
    fn steer_converges_on_speed() {
        let mut velocity = DVec2::ZERO;
        for _ in 0..400 {
            velocity = steer(velocity, IVec2::new(2, 2), IVec2::new(3, 2), 1.5);
        }
        assert!((velocity.x - 1.5).abs() < 1e-6);
        assert_eq!(velocity.y, 0.0);
    }
}
