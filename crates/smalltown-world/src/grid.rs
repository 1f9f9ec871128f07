//! The town grid: terrain tiles plus occupancy references.
//!
//! Each tile stores at most one occupant as a bare [`AgentId`]. The id is a
//! lookup key into the agent roster, never an owning reference. Every
//! occupancy change goes through [`Grid::place`], [`Grid::vacate`], or
//! [`Grid::relocate`], which keep the "one agent per tile" invariant.

use serde::{Deserialize, Serialize};
use smalltown_types::{AgentId, Position, Terrain};

use crate::error::WorldError;

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Ground type.
    pub terrain: Terrain,
    /// Agent currently standing here.
    pub occupant: Option<AgentId>,
}

impl Tile {
    /// An unoccupied tile of the given terrain.
    pub const fn new(terrain: Terrain) -> Self {
        Self {
            terrain,
            occupant: None,
        }
    }

    /// Terrain allows standing here.
    pub const fn is_walkable(&self) -> bool {
        self.terrain.is_walkable()
    }

    /// Walkable and nobody is here.
    pub const fn is_free(&self) -> bool {
        self.is_walkable() && self.occupant.is_none()
    }
}

/// Fixed-size matrix of tiles, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl Grid {
    /// A `width` x `height` grid filled with `terrain`. Zero or negative
    /// dimensions produce an empty grid.
    pub fn filled(width: i32, height: i32, terrain: Terrain) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let cells = usize::try_from(width)
            .unwrap_or(0)
            .saturating_mul(usize::try_from(height).unwrap_or(0));
        Self {
            width,
            height,
            tiles: vec![Tile::new(terrain); cells],
        }
    }

    /// Build from rows of terrain. All rows must have the same length.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RaggedLayout`] if the rows are empty or uneven.
    pub fn from_terrain(rows: &[Vec<Terrain>]) -> Result<Self, WorldError> {
        let expected = rows.first().map_or(0, Vec::len);
        if expected == 0 {
            return Err(WorldError::RaggedLayout {
                row: 0,
                width: 0,
                expected: 1,
            });
        }
        let mut tiles = Vec::with_capacity(expected.saturating_mul(rows.len()));
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != expected {
                return Err(WorldError::RaggedLayout {
                    row,
                    width: cells.len(),
                    expected,
                });
            }
            tiles.extend(cells.iter().copied().map(Tile::new));
        }
        Ok(Self {
            width: i32::try_from(expected).unwrap_or(i32::MAX),
            height: i32::try_from(rows.len()).unwrap_or(i32::MAX),
            tiles,
        })
    }

    /// Number of columns.
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Number of rows.
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// True if `pos` lies on the grid.
    pub const fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if !self.contains(pos) {
            return None;
        }
        let row = usize::try_from(pos.y).ok()?;
        let col = usize::try_from(pos.x).ok()?;
        let width = usize::try_from(self.width).ok()?;
        row.checked_mul(width)?.checked_add(col)
    }

    /// The tile at `pos`, or `None` off-grid.
    pub fn tile(&self, pos: Position) -> Option<&Tile> {
        self.index(pos).and_then(|i| self.tiles.get(i))
    }

    fn tile_mut(&mut self, pos: Position) -> Result<&mut Tile, WorldError> {
        self.index(pos)
            .and_then(|i| self.tiles.get_mut(i))
            .ok_or(WorldError::OutOfBounds(pos))
    }

    /// Terrain at `pos`, or `None` off-grid.
    pub fn terrain_at(&self, pos: Position) -> Option<Terrain> {
        self.tile(pos).map(|t| t.terrain)
    }

    /// Terrain at `pos` allows standing there. False off-grid.
    pub fn is_walkable(&self, pos: Position) -> bool {
        self.tile(pos).is_some_and(Tile::is_walkable)
    }

    /// Walkable and unoccupied. False off-grid.
    pub fn is_free(&self, pos: Position) -> bool {
        self.tile(pos).is_some_and(Tile::is_free)
    }

    /// Who stands at `pos`.
    pub fn occupant(&self, pos: Position) -> Option<AgentId> {
        self.tile(pos).and_then(|t| t.occupant)
    }

    /// Iterate all positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position::new(x, y)))
    }

    /// Put `agent` on `pos`.
    ///
    /// # Errors
    ///
    /// Fails if the tile is off-grid, unwalkable, or held by another agent.
    /// Placing an agent on the tile it already holds succeeds.
    pub fn place(&mut self, agent: AgentId, pos: Position) -> Result<(), WorldError> {
        let tile = self.tile_mut(pos)?;
        if !tile.is_walkable() {
            return Err(WorldError::NotWalkable(pos));
        }
        match tile.occupant {
            Some(occupant) if occupant != agent => Err(WorldError::Occupied {
                position: pos,
                occupant,
            }),
            _ => {
                tile.occupant = Some(agent);
                Ok(())
            }
        }
    }

    /// Clear the occupant of `pos` if it is `agent`. Returns whether anything
    /// was cleared.
    pub fn vacate(&mut self, agent: AgentId, pos: Position) -> bool {
        match self.tile_mut(pos) {
            Ok(tile) if tile.occupant == Some(agent) => {
                tile.occupant = None;
                true
            }
            _ => false,
        }
    }

    /// Move `agent` from `from` to `to` as one step. On error nothing changes.
    ///
    /// # Errors
    ///
    /// Fails if `agent` does not hold `from`, or `to` cannot be placed on.
    pub fn relocate(&mut self, agent: AgentId, from: Position, to: Position) -> Result<(), WorldError> {
        if self.occupant(from) != Some(agent) {
            return Err(WorldError::NotOccupant {
                agent,
                position: from,
            });
        }
        if from == to {
            return Ok(());
        }
        self.place(agent, to)?;
        self.vacate(agent, from);
        Ok(())
    }

    /// Remove every occupant.
    pub fn clear_occupants(&mut self) {
        for tile in &mut self.tiles {
            tile.occupant = None;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn small_grid() -> Grid {
        use Terrain::{Ground as G, House as H};
        Grid::from_terrain(&[vec![G, G, H], vec![G, G, G]]).unwrap()
    }

    #[test]
    fn dimensions_follow_rows() {
        let grid = small_grid();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.positions().count(), 6);
    }

    #[test]
    fn ragged_layout_is_rejected() {
        let err = Grid::from_terrain(&[vec![Terrain::Ground], vec![]]).unwrap_err();
        assert!(matches!(err, WorldError::RaggedLayout { row: 1, .. }));
    }

    #[test]
    fn off_grid_queries_are_none() {
        let grid = small_grid();
        assert_eq!(grid.terrain_at(Position::new(-1, 0)), None);
        assert_eq!(grid.terrain_at(Position::new(3, 0)), None);
        assert!(!grid.is_walkable(Position::new(0, 2)));
    }

    #[test]
    fn one_agent_per_tile() {
        let mut grid = small_grid();
        let a = AgentId::new();
        let b = AgentId::new();
        let pos = Position::new(0, 0);
        grid.place(a, pos).unwrap();
        assert_eq!(grid.occupant(pos), Some(a));
        assert!(matches!(grid.place(b, pos), Err(WorldError::Occupied { .. })));
        assert!(grid.place(a, pos).is_ok());
    }

    #[test]
    fn cannot_stand_on_buildings() {
        let mut grid = small_grid();
        let err = grid.place(AgentId::new(), Position::new(2, 0)).unwrap_err();
        assert_eq!(err, WorldError::NotWalkable(Position::new(2, 0)));
    }

    #[test]
    fn relocate_moves_the_reference() {
        let mut grid = small_grid();
        let a = AgentId::new();
        grid.place(a, Position::new(0, 0)).unwrap();
        grid.relocate(a, Position::new(0, 0), Position::new(1, 0)).unwrap();
        assert_eq!(grid.occupant(Position::new(0, 0)), None);
        assert_eq!(grid.occupant(Position::new(1, 0)), Some(a));
    }

    #[test]
    fn failed_relocate_changes_nothing() {
        let mut grid = small_grid();
        let a = AgentId::new();
        grid.place(a, Position::new(1, 0)).unwrap();
        assert!(grid.relocate(a, Position::new(1, 0), Position::new(2, 0)).is_err());
        assert_eq!(grid.occupant(Position::new(1, 0)), Some(a));
    }

    #[test]
    fn vacate_ignores_other_agents() {
        let mut grid = small_grid();
        let a = AgentId::new();
        grid.place(a, Position::new(0, 0)).unwrap();
        assert!(!grid.vacate(AgentId::new(), Position::new(0, 0)));
        assert!(grid.vacate(a, Position::new(0, 0)));
        assert!(grid.is_free(Position::new(0, 0)));
    }
}
