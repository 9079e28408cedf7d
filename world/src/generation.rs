//! Seeded map generation that never produces an uncompletable layout.

use bulwark_core::{ContentRegistry, GameMap, MapId, SimRng, TileCoord};

use crate::{error::InvariantViolation, navigation::FlowField, tiles::TileGrid};

/// Fills the grid with the map's default tile type, then visits every tile in
/// shuffled order and tries a weighted random type on it.
///
/// A candidate type is kept only when the resulting flow field still
/// satisfies the map's reachability rules. Returns the grid together with the
/// field to install.
pub(crate) fn generate(
    map_id: &MapId,
    map: &GameMap,
    content: &ContentRegistry,
    rng: &mut SimRng,
) -> Result<(TileGrid, FlowField), InvariantViolation> {
    let default_kind = content
        .tile_type(&map.default_tile_type)
        .ok_or_else(|| InvariantViolation::missing("tile type", &map.default_tile_type))?;
    let mut grid = TileGrid::filled(map.width, map.height, &map.default_tile_type, default_kind);

    let total_weight: f64 = map.tile_type_weights.values().sum();
    if total_weight > 0.0 {
        let mut coords: Vec<TileCoord> = grid.coords().collect();
        rng.shuffle(&mut coords);

        let mut rejected = 0_usize;
        for coord in coords {
            let Some(tile_type) = rng.weighted(
                map.tile_type_weights
                    .iter()
                    .map(|(tile_type, weight)| (tile_type, *weight)),
            ) else {
                break;
            };
            let kind = content
                .tile_type(tile_type)
                .ok_or_else(|| InvariantViolation::missing("tile type", tile_type))?;
            let Some(tile) = grid.get_mut(coord) else {
                continue;
            };
            let previous = tile.retype(tile_type.clone(), kind);

            let field = FlowField::build(&grid, &map.exits, None);
            if !field.satisfies(&grid, map, None) {
                if let Some(tile) = grid.get_mut(coord) {
                    tile.restore(previous);
                }
                rejected += 1;
            }
        }
        log::debug!("map '{map_id}' generation reverted {rejected} tiles that blocked the path");
    }

    let field = FlowField::build(&grid, &map.exits, None);
    if !field.satisfies(&grid, map, None) {
        return Err(InvariantViolation::UnreachableLayout(map_id.to_string()));
    }
    Ok((grid, field))
}
