//! The physical town for the Smalltown simulation.
//!
//! # Modules
//!
//! - [`grid`] -- Tiles, terrain, and the one-agent-per-tile occupancy model.
//! - [`layout`] -- Text layouts and the default 10x10 town.
//! - [`pathfinding`] -- A* search, single-step routing, and random-walk
//!   sampling for idle wandering.
//! - [`error`] -- Error types for grid construction and occupancy changes.

pub mod error;
pub mod grid;
pub mod layout;
pub mod pathfinding;

pub use error::WorldError;
pub use grid::{Grid, Tile};
pub use layout::{TOWN_LAYOUT, parse_layout, town};
pub use pathfinding::{find_path, next_step, random_walkable_position};
