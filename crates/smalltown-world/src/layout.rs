//! Text layouts for building grids.
//!
//! A layout is a list of equal-length rows, one character per tile:
//!
//! | Symbol | Terrain |
//! |---|---|
//! | `.` | ground |
//! | `H` | house |
//! | `S` | shop |
//! | `P` | park |
//! | `#` | road |

use smalltown_types::Terrain;

use crate::error::WorldError;
use crate::grid::Grid;

/// The default 10x10 town: blocks of houses and shops separated by roads,
/// with a strip of park along the east edge and the south row.
pub const TOWN_LAYOUT: [&str; 10] = [
    "H#H#S#H#HP",
    "#.#.#.#.##",
    "H#H#H#S#HP",
    "#.#.#.#.##",
    "S#P#H#H#SP",
    "#.#.#.#.##",
    "H#H#S#H#HP",
    "#.#.#.#.##",
    "S#H#H#S#HP",
    "P#P#P#P#PP",
];

/// Map a layout symbol to terrain.
pub const fn terrain_for(symbol: char) -> Option<Terrain> {
    match symbol {
        '.' => Some(Terrain::Ground),
        'H' => Some(Terrain::House),
        'S' => Some(Terrain::Shop),
        'P' => Some(Terrain::Park),
        '#' => Some(Terrain::Road),
        _ => None,
    }
}

/// Build a grid from layout rows.
///
/// # Errors
///
/// Returns [`WorldError::UnknownTerrain`] on an unrecognized symbol and
/// [`WorldError::RaggedLayout`] if rows differ in width.
pub fn parse_layout<S: AsRef<str>>(rows: &[S]) -> Result<Grid, WorldError> {
    let terrain = rows
        .iter()
        .enumerate()
        .map(|(row, line)| {
            line.as_ref()
                .chars()
                .map(|symbol| terrain_for(symbol).ok_or(WorldError::UnknownTerrain { symbol, row }))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;
    Grid::from_terrain(&terrain)
}

/// The default town grid.
///
/// # Errors
///
/// Only fails if [`TOWN_LAYOUT`] itself is malformed.
pub fn town() -> Result<Grid, WorldError> {
    parse_layout(&TOWN_LAYOUT)
}
