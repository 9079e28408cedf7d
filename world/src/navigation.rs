//! Flow field builder used to steer enemies and gate tower placement.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, VecDeque},
};

use bulwark_core::{GameMap, TileCoord};
use glam::IVec2;

use crate::tiles::{TileGrid, SOLID_TILE_COST};

/// Dense traversal-cost grid seeded from the map exits.
///
/// Costs are accumulated by a multi-source uniform-cost search: stepping onto
/// a tile costs that tile's traversal cost, and solid tiles cost
/// [`SOLID_TILE_COST`]. Tiles whose cost reaches that threshold cannot reach an
/// exit. Tiles never visited keep an infinite cost.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct FlowField {
    width: u32,
    height: u32,
    costs: Vec<f64>,
}

impl FlowField {
    /// Builds the field for the grid.
    ///
    /// `blocked` marks one extra tile as solid, which is how placement checks
    /// ask whether a tile may become solid without touching the grid.
    pub(crate) fn build(grid: &TileGrid, exits: &[TileCoord], blocked: Option<TileCoord>) -> Self {
        let width = grid.width();
        let height = grid.height();
        let mut field = Self {
            width,
            height,
            costs: vec![f64::INFINITY; cell_count(width, height)],
        };

        let step_cost = |tile: TileCoord| {
            if Some(tile) == blocked {
                SOLID_TILE_COST
            } else {
                grid.get(tile).map_or(SOLID_TILE_COST, |cell| cell.traversal_cost())
            }
        };

        let mut frontier = BinaryHeap::new();
        for &exit in exits {
            if is_blocked(grid, exit, blocked) {
                continue;
            }
            let Some(index) = grid.index(exit) else {
                continue;
            };
            if field.costs[index] == 0.0 {
                continue;
            }
            field.costs[index] = 0.0;
            frontier.push(Frontier {
                cost: 0.0,
                tile: exit,
            });
        }

        while let Some(Frontier { cost, tile }) = frontier.pop() {
            let Some(index) = grid.index(tile) else {
                continue;
            };
            if cost > field.costs[index] {
                continue;
            }

            for neighbor in neighbors(tile, width, height) {
                let Some(neighbor_index) = grid.index(neighbor) else {
                    continue;
                };
                let next = cost + step_cost(neighbor);
                if next < field.costs[neighbor_index] {
                    field.costs[neighbor_index] = next;
                    frontier.push(Frontier {
                        cost: next,
                        tile: neighbor,
                    });
                }
            }
        }

        field
    }

    /// Cost captured for the tile, if it lies within the field.
    #[must_use]
    pub(crate) fn cost(&self, tile: TileCoord) -> Option<f64> {
        if tile.x() >= self.width || tile.y() >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let index = usize::try_from(tile.y())
            .ok()?
            .checked_mul(width)?
            .checked_add(usize::try_from(tile.x()).ok()?)?;
        self.costs.get(index).copied()
    }

    /// Cost lookup for signed steering coordinates.
    #[must_use]
    pub(crate) fn cost_at(&self, tile: IVec2) -> Option<f64> {
        TileCoord::from_signed(tile.x, tile.y).and_then(|coord| self.cost(coord))
    }

    /// Reports whether an enemy on the tile can still reach an exit.
    #[must_use]
    pub(crate) fn can_reach_exit(&self, tile: TileCoord) -> bool {
        self.cost(tile).is_some_and(|cost| cost < SOLID_TILE_COST)
    }

    /// Checks the map's reachability rules against this field.
    ///
    /// Every spawnpoint must reach an exit and, when the map asks for it,
    /// every exit must be reachable from the first one over open ground.
    #[must_use]
    pub(crate) fn satisfies(&self, grid: &TileGrid, map: &GameMap, blocked: Option<TileCoord>) -> bool {
        if !map
            .spawnpoints
            .iter()
            .all(|spawnpoint| self.can_reach_exit(spawnpoint.location))
        {
            return false;
        }

        if map.is_all_exits_must_be_reachable && map.exits.len() > 1 {
            return exits_connected(grid, &map.exits, blocked);
        }
        true
    }
}

#[derive(Clone, Copy, Debug)]
struct Frontier {
    cost: f64,
    tile: TileCoord,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    // Reversed so the max-heap pops the cheapest tile first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.tile.cmp(&self.tile))
    }
}

fn exits_connected(grid: &TileGrid, exits: &[TileCoord], blocked: Option<TileCoord>) -> bool {
    let Some(&start) = exits.first() else {
        return true;
    };
    if is_blocked(grid, start, blocked) {
        return false;
    }

    let mut visited = vec![false; cell_count(grid.width(), grid.height())];
    let mut queue = VecDeque::from([start]);
    if let Some(index) = grid.index(start) {
        visited[index] = true;
    }

    while let Some(tile) = queue.pop_front() {
        for neighbor in neighbors(tile, grid.width(), grid.height()) {
            let Some(index) = grid.index(neighbor) else {
                continue;
            };
            if visited[index] || is_blocked(grid, neighbor, blocked) {
                continue;
            }
            visited[index] = true;
            queue.push_back(neighbor);
        }
    }

    exits
        .iter()
        .all(|exit| grid.index(*exit).is_some_and(|index| visited[index]))
}

fn is_blocked(grid: &TileGrid, tile: TileCoord, blocked: Option<TileCoord>) -> bool {
    Some(tile) == blocked || grid.is_solid(tile)
}

fn cell_count(width: u32, height: u32) -> usize {
    usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0)
}

fn neighbors(tile: TileCoord, width: u32, height: u32) -> impl Iterator<Item = TileCoord> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(x) = tile.x().checked_add(1) {
        if x < width {
            candidates[count] = Some(TileCoord::new(x, tile.y()));
            count += 1;
        }
    }

    if let Some(x) = tile.x().checked_sub(1) {
        candidates[count] = Some(TileCoord::new(x, tile.y()));
        count += 1;
    }

    if let Some(y) = tile.y().checked_add(1) {
        if y < height {
            candidates[count] = Some(TileCoord::new(tile.x(), y));
            count += 1;
        }
    }

    if let Some(y) = tile.y().checked_sub(1) {
        candidates[count] = Some(TileCoord::new(tile.x(), y));
        count += 1;
    }

    candidates.into_iter().take(count).flatten()
}
