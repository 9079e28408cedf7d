//! Validation and application of player actions.

use bulwark_core::{Action, ActionRejection, Event, TileCoord, TowerType};

use crate::{
    error::InvariantViolation,
    navigation::FlowField,
    tiles::MapTile,
    towers::{self, Tower},
    World,
};

impl World {
    /// Checks an action against the current state without mutating anything.
    pub(crate) fn check_valid(&self, action: &Action) -> Result<(), ActionRejection> {
        match action {
            Action::PlaceTower {
                x,
                y,
                tower_type_id,
            } => {
                let (coord, tile) = self
                    .tile_at(*x, *y)
                    .ok_or(ActionRejection::InvalidCoordinates)?;
                let kind = self
                    .content
                    .tower_type(tower_type_id)
                    .ok_or_else(|| ActionRejection::UnknownTowerType(tower_type_id.to_string()))?;
                if tile.tower().is_some() {
                    return Err(ActionRejection::TileOccupied);
                }
                if !tile.is_tower_placeable() {
                    return Err(ActionRejection::NotPlaceable);
                }
                self.afford(kind.cost)?;
                if kind.is_solid && !self.can_block(coord) {
                    return Err(ActionRejection::BlocksPath);
                }
                Ok(())
            }
            Action::UpgradeTower { x, y } => {
                let (tower, kind) = self.tower_at(*x, *y)?;
                let max_level = self
                    .content
                    .rarity(&kind.rarity)
                    .map_or(1, |rarity| rarity.max_level);
                if tower.level() >= max_level {
                    return Err(ActionRejection::MaxLevel);
                }
                self.afford(towers::upgrade_cost(kind, tower.level()))
            }
            Action::RemoveTower { x, y } => self.tower_at(*x, *y).map(|_| ()),
        }
    }

    /// Applies an action that was just validated.
    pub(crate) fn perform(
        &mut self,
        action: &Action,
        out_events: &mut Vec<Event>,
    ) -> Result<(), InvariantViolation> {
        let (x, y) = action.position();
        let coord = TileCoord::from_signed(x, y).ok_or(InvariantViolation::FlowFieldRejected)?;
        let content = std::sync::Arc::clone(&self.content);

        match action {
            Action::PlaceTower { tower_type_id, .. } => {
                let kind = content
                    .tower_type(tower_type_id)
                    .ok_or_else(|| InvariantViolation::missing("tower type", tower_type_id))?;
                let tile = self.tile_mut(coord)?;
                let _ = tile.replace_tower(Some(Tower::new(tower_type_id.clone(), kind)));
                self.state.money -= kind.cost;
                self.update_pathfinding()?;
                out_events.push(Event::TowerPlaced {
                    tile: coord,
                    tower_type: tower_type_id.clone(),
                    cost: kind.cost,
                });
            }
            Action::UpgradeTower { .. } => {
                let tower = self
                    .tile_mut(coord)?
                    .tower_mut()
                    .ok_or_else(|| InvariantViolation::missing("tower at", coord_label(coord)))?;
                let kind = content
                    .tower_type(tower.tower_type())
                    .ok_or_else(|| InvariantViolation::missing("tower type", tower.tower_type()))?;
                let cost = towers::upgrade_cost(kind, tower.level());
                tower.level_up();
                let level = tower.level();
                self.state.money -= cost;
                out_events.push(Event::TowerUpgraded {
                    tile: coord,
                    level,
                    cost,
                });
            }
            Action::RemoveTower { .. } => {
                let tower = self
                    .tile_mut(coord)?
                    .replace_tower(None)
                    .ok_or_else(|| InvariantViolation::missing("tower at", coord_label(coord)))?;
                let kind = content
                    .tower_type(tower.tower_type())
                    .ok_or_else(|| InvariantViolation::missing("tower type", tower.tower_type()))?;
                let refund = towers::refund(kind, tower.level());
                self.state.money += refund;
                self.update_pathfinding()?;
                out_events.push(Event::TowerRemoved {
                    tile: coord,
                    refund,
                });
            }
        }
        Ok(())
    }

    /// Reports whether a solid tower on `coord` would leave the map completable.
    pub(crate) fn can_block(&self, coord: TileCoord) -> bool {
        let grid = &self.state.tiles;
        if grid.is_solid(coord) {
            return true;
        }
        FlowField::build(grid, &self.map.exits, Some(coord)).satisfies(grid, &self.map, Some(coord))
    }

    /// Rebuilds and installs the flow field after the grid changed.
    fn update_pathfinding(&mut self) -> Result<(), InvariantViolation> {
        let field = FlowField::build(&self.state.tiles, &self.map.exits, None);
        if !field.satisfies(&self.state.tiles, &self.map, None) {
            log::debug!("flow field rejected at tick {}", self.state.tick);
            return Err(InvariantViolation::FlowFieldRejected);
        }
        self.flow_field = field;
        Ok(())
    }

    fn afford(&self, cost: i64) -> Result<(), ActionRejection> {
        if self.state.money < cost {
            return Err(ActionRejection::InsufficientFunds {
                required: cost,
                available: self.state.money,
            });
        }
        Ok(())
    }

    fn tile_at(&self, x: i32, y: i32) -> Option<(TileCoord, &MapTile)> {
        let coord = TileCoord::from_signed(x, y)?;
        self.state.tiles.get(coord).map(|tile| (coord, tile))
    }

    fn tower_at(&self, x: i32, y: i32) -> Result<(&Tower, &TowerType), ActionRejection> {
        let tower = self
            .tile_at(x, y)
            .and_then(|(_, tile)| tile.tower())
            .ok_or(ActionRejection::NoTower)?;
        let kind = self
            .content
            .tower_type(tower.tower_type())
            .ok_or_else(|| ActionRejection::UnknownTowerType(tower.tower_type().to_string()))?;
        Ok((tower, kind))
    }

    fn tile_mut(&mut self, coord: TileCoord) -> Result<&mut MapTile, InvariantViolation> {
        self.state
            .tiles
            .get_mut(coord)
            .ok_or_else(|| InvariantViolation::missing("tile", coord_label(coord)))
    }
}

fn coord_label(coord: TileCoord) -> String {
    format!("({}, {})", coord.x(), coord.y())
}
