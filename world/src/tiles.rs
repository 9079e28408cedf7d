//! Dense tile storage for the map.

use bulwark_core::{TileCoord, TileType, TileTypeId};
use glam::IVec2;
use serde::Serialize;

use crate::towers::Tower;

/// Traversal cost assigned to solid tiles; anything at or above it is unreachable.
pub(crate) const SOLID_TILE_COST: f64 = 1e9;

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Terrain {
    solid: bool,
    placeable: bool,
    cost: f64,
}

impl Terrain {
    fn of(kind: &TileType) -> Self {
        Self {
            solid: kind.is_solid,
            placeable: kind.is_tower_placeable,
            cost: kind.traversal_cost(),
        }
    }
}

/// Single cell of the map.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MapTile {
    tile_type: TileTypeId,
    tower: Option<Tower>,
    #[serde(skip)]
    terrain: Terrain,
}

impl MapTile {
    fn new(tile_type: TileTypeId, kind: &TileType) -> Self {
        Self {
            tile_type,
            tower: None,
            terrain: Terrain::of(kind),
        }
    }

    pub(crate) fn tile_type(&self) -> &TileTypeId {
        &self.tile_type
    }

    /// Replaces the terrain, returning the previous type so callers can revert.
    pub(crate) fn retype(&mut self, tile_type: TileTypeId, kind: &TileType) -> (TileTypeId, Terrain) {
        let previous = (
            std::mem::replace(&mut self.tile_type, tile_type),
            self.terrain,
        );
        self.terrain = Terrain::of(kind);
        previous
    }

    pub(crate) fn restore(&mut self, (tile_type, terrain): (TileTypeId, Terrain)) {
        self.tile_type = tile_type;
        self.terrain = terrain;
    }

    pub(crate) fn tower(&self) -> Option<&Tower> {
        self.tower.as_ref()
    }

    pub(crate) fn tower_mut(&mut self) -> Option<&mut Tower> {
        self.tower.as_mut()
    }

    pub(crate) fn replace_tower(&mut self, tower: Option<Tower>) -> Option<Tower> {
        std::mem::replace(&mut self.tower, tower)
    }

    pub(crate) fn is_tower_placeable(&self) -> bool {
        self.terrain.placeable
    }

    /// Solid terrain or a solid tower.
    pub(crate) fn is_solid(&self) -> bool {
        self.terrain.solid || self.tower.as_ref().is_some_and(Tower::is_solid)
    }

    pub(crate) fn traversal_cost(&self) -> f64 {
        if self.is_solid() {
            SOLID_TILE_COST
        } else {
            self.terrain.cost
        }
    }
}

/// Row-major grid of map tiles.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TileGrid {
    width: u32,
    height: u32,
    tiles: Vec<MapTile>,
}

impl TileGrid {
    /// Creates a grid where every tile shares the same type.
    pub(crate) fn filled(width: u32, height: u32, tile_type: &TileTypeId, kind: &TileType) -> Self {
        let count = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            tiles: vec![MapTile::new(tile_type.clone(), kind); count],
        }
    }

    pub(crate) const fn width(&self) -> u32 {
        self.width
    }

    pub(crate) const fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn index(&self, tile: TileCoord) -> Option<usize> {
        if tile.x() >= self.width || tile.y() >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let x = usize::try_from(tile.x()).ok()?;
        let y = usize::try_from(tile.y()).ok()?;
        y.checked_mul(width)?.checked_add(x)
    }

    pub(crate) fn get(&self, tile: TileCoord) -> Option<&MapTile> {
        self.index(tile).and_then(|index| self.tiles.get(index))
    }

    pub(crate) fn get_mut(&mut self, tile: TileCoord) -> Option<&mut MapTile> {
        self.index(tile).and_then(|index| self.tiles.get_mut(index))
    }

    /// Converts a signed steering coordinate into an in-bounds tile.
    pub(crate) fn tile_at(&self, tile: IVec2) -> Option<TileCoord> {
        let coord = TileCoord::from_signed(tile.x, tile.y)?;
        self.index(coord).map(|_| coord)
    }

    /// All coordinates, column by column.
    pub(crate) fn coords(&self) -> impl Iterator<Item = TileCoord> {
        let height = self.height;
        (0..self.width).flat_map(move |x| (0..height).map(move |y| TileCoord::new(x, y)))
    }

    /// Out-of-bounds tiles count as solid.
    pub(crate) fn is_solid(&self, tile: TileCoord) -> bool {
        self.get(tile).map_or(true, MapTile::is_solid)
    }

    pub(crate) fn is_open_at(&self, tile: IVec2) -> bool {
        self.tile_at(tile).is_some_and(|coord| !self.is_solid(coord))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grass() -> TileType {
        TileType::default()
    }

    #[test]
    fn indices_are_row_major_and_bounded() {
        let grid = TileGrid::filled(4, 3, &TileTypeId::new("grass"), &grass());
        assert_eq!(grid.index(TileCoord::new(1, 2)), Some(9));
        assert_eq!(grid.index(TileCoord::new(4, 0)), None);
        assert_eq!(grid.tile_at(IVec2::new(-1, 0)), None);
        assert_eq!(grid.tile_at(IVec2::new(3, 2)), Some(TileCoord::new(3, 2)));
        assert!(grid.is_solid(TileCoord::new(0, 3)));
    }

    #[test]
    fn coords_walk_columns_first() {
        let grid = TileGrid::filled(2, 2, &TileTypeId::new("grass"), &grass());
        let coords: Vec<_> = grid.coords().collect();
        assert_eq!(
            coords,
            vec![
                TileCoord::new(0, 0),
                TileCoord::new(0, 1),
                TileCoord::new(1, 0),
                TileCoord::new(1, 1)
            ]
        );
    }

    #[test]
    fn retype_and_restore_round_trip() {
        let mut grid = TileGrid::filled(1, 1, &TileTypeId::new("grass"), &grass());
        let stone = TileType {
            is_solid: true,
            ..TileType::default()
        };
        let tile = grid.get_mut(TileCoord::new(0, 0)).expect("tile");
        let previous = tile.retype(TileTypeId::new("stone"), &stone);
        assert!(tile.is_solid());
        assert_eq!(tile.traversal_cost(), SOLID_TILE_COST);
        tile.restore(previous);
        assert!(!tile.is_solid());
        assert_eq!(tile.tile_type().as_str(), "grass");
    }
}
