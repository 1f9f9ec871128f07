//! Error types for the `smalltown-world` crate.

use smalltown_types::{AgentId, Position};

/// Errors that can occur while building or mutating the grid.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorldError {
    /// The position lies outside the grid.
    #[error("position {0} is outside the grid")]
    OutOfBounds(Position),

    /// The tile's terrain cannot be stood on.
    #[error("tile {0} is not walkable")]
    NotWalkable(Position),

    /// Another agent already stands on the tile.
    #[error("tile {position} is occupied by {occupant}")]
    Occupied {
        /// The contested tile.
        position: Position,
        /// Who is already there.
        occupant: AgentId,
    },

    /// The agent is not the occupant of the tile it claims to leave.
    #[error("agent {agent} does not occupy {position}")]
    NotOccupant {
        /// The agent trying to move.
        agent: AgentId,
        /// The tile it claimed to stand on.
        position: Position,
    },

    /// A layout row contained an unknown terrain symbol.
    #[error("unknown terrain symbol {symbol:?} at row {row}")]
    UnknownTerrain {
        /// The offending character.
        symbol: char,
        /// Zero-based row index.
        row: usize,
    },

    /// Layout rows have differing widths, or there are none.
    #[error("layout must be a non-empty rectangle (row {row} has width {width}, expected {expected})")]
    RaggedLayout {
        /// Zero-based row index.
        row: usize,
        /// Width of that row.
        width: usize,
        /// Width of the first row.
        expected: usize,
    },
}
