//! A* path-finding and random-walk sampling over the grid.
//!
//! Movement is 4-connected with uniform step cost and a Manhattan-distance
//! heuristic. The start tile only needs walkable terrain since the mover is
//! standing on it. The goal and every intermediate tile must be walkable and
//! unoccupied.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use rand::Rng;
use rand::seq::IndexedRandom;
use smalltown_types::{Direction, Position};
use tracing::trace;

use crate::grid::Grid;

/// Neighbor expansion order. Earlier entries win ties.
const EXPANSION_ORDER: [Direction; 4] = [
    Direction::Up,
    Direction::Right,
    Direction::Down,
    Direction::Left,
];

/// Find a shortest 4-connected path from `start` to `goal`.
///
/// The returned sequence includes both endpoints. It is empty when either
/// endpoint is off-grid or unwalkable, when the goal is occupied, or when
/// occupancy blocks every route. Equal-cost frontier entries are expanded
/// in insertion order.
pub fn find_path(grid: &Grid, start: Position, goal: Position) -> Vec<Position> {
    if !grid.is_walkable(start) || !grid.is_walkable(goal) {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }
    if !grid.is_free(goal) {
        return Vec::new();
    }

    // Frontier keyed on (f, insertion sequence) so equal f pops FIFO.
    let mut open: BinaryHeap<Reverse<(u32, u64, Position)>> = BinaryHeap::new();
    let mut g_score: HashMap<Position, u32> = HashMap::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut closed: HashSet<Position> = HashSet::new();
    let mut sequence: u64 = 0;

    g_score.insert(start, 0);
    open.push(Reverse((start.manhattan(goal), sequence, start)));

    while let Some(Reverse((_, _, current))) = open.pop() {
        if current == goal {
            return reconstruct(&came_from, start, goal);
        }
        if !closed.insert(current) {
            continue;
        }
        let current_g = g_score.get(&current).copied().unwrap_or(u32::MAX);

        for direction in EXPANSION_ORDER {
            let next = current.step(direction);
            if closed.contains(&next) || !grid.is_free(next) {
                continue;
            }
            let tentative = current_g.saturating_add(1);
            if g_score.get(&next).is_some_and(|&known| known <= tentative) {
                continue;
            }
            g_score.insert(next, tentative);
            came_from.insert(next, current);
            sequence = sequence.saturating_add(1);
            open.push(Reverse((
                tentative.saturating_add(next.manhattan(goal)),
                sequence,
                next,
            )));
        }
    }

    trace!(%start, %goal, explored = closed.len(), "no path");
    Vec::new()
}

fn reconstruct(
    came_from: &HashMap<Position, Position>,
    start: Position,
    goal: Position,
) -> Vec<Position> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(&previous) => {
                path.push(previous);
                current = previous;
            }
            None => return Vec::new(),
        }
    }
    path.reverse();
    path
}

/// The first step from `current` toward `goal`.
///
/// Returns `current` unchanged when no path of length two or more exists.
/// Callers treat that as "blocked", not as an error.
pub fn next_step(grid: &Grid, current: Position, goal: Position) -> Position {
    find_path(grid, current, goal)
        .get(1)
        .copied()
        .unwrap_or(current)
}

/// A uniformly sampled free tile within Manhattan `radius` of `center`.
///
/// Returns `None` when no candidate exists.
pub fn random_walkable_position<R: Rng + ?Sized>(
    grid: &Grid,
    center: Position,
    radius: u32,
    rng: &mut R,
) -> Option<Position> {
    let reach = i32::try_from(radius).unwrap_or(i32::MAX);
    let min_x = center.x.saturating_sub(reach).max(0);
    let max_x = center.x.saturating_add(reach).min(grid.width().saturating_sub(1));
    let min_y = center.y.saturating_sub(reach).max(0);
    let max_y = center.y.saturating_add(reach).min(grid.height().saturating_sub(1));

    let candidates: Vec<Position> = (min_y..=max_y)
        .flat_map(|y| (min_x..=max_x).map(move |x| Position::new(x, y)))
        .filter(|&pos| pos.manhattan(center) <= radius && grid.is_free(pos))
        .collect();

    candidates.choose(rng).copied()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use smalltown_types::{AgentId, Terrain};

    use super::*;
    use crate::layout::parse_layout;

    fn assert_well_formed(grid: &Grid, path: &[Position]) {
        for pair in path.windows(2) {
            if let [a, b] = pair {
                assert!(a.is_adjacent(*b), "{a} -> {b} is not a single step");
            }
        }
        if path.len() > 2 {
            for pos in path.get(1..path.len() - 1).unwrap() {
                assert!(grid.is_free(*pos), "{pos} is blocked");
            }
        }
    }

    #[test]
    fn straight_line_path() {
        let grid = parse_layout(&["....."]).unwrap();
        let path = find_path(&grid, Position::new(0, 0), Position::new(4, 0));
        assert_eq!(path.len(), 5);
        assert_eq!(path.first(), Some(&Position::new(0, 0)));
        assert_eq!(path.last(), Some(&Position::new(4, 0)));
        assert_well_formed(&grid, &path);
    }

    #[test]
    fn routes_around_buildings() {
        let grid = parse_layout(&["...", ".H.", "..."]).unwrap();
        let path = find_path(&grid, Position::new(0, 1), Position::new(2, 1));
        assert_eq!(path.len(), 5);
        assert!(!path.contains(&Position::new(1, 1)));
        assert_well_formed(&grid, &path);
    }

    #[test]
    fn unwalkable_endpoints_yield_nothing() {
        let grid = parse_layout(&[".H."]).unwrap();
        assert!(find_path(&grid, Position::new(1, 0), Position::new(0, 0)).is_empty());
        assert!(find_path(&grid, Position::new(0, 0), Position::new(1, 0)).is_empty());
        assert!(find_path(&grid, Position::new(0, 0), Position::new(9, 9)).is_empty());
    }

    #[test]
    fn occupancy_can_block_every_route() {
        let mut grid = parse_layout(&["...", "H.H", "..."]).unwrap();
        grid.place(AgentId::new(), Position::new(1, 1)).unwrap();
        assert!(find_path(&grid, Position::new(0, 0), Position::new(0, 2)).is_empty());
    }

    #[test]
    fn occupied_goal_yields_nothing() {
        let mut grid = parse_layout(&["..."]).unwrap();
        grid.place(AgentId::new(), Position::new(2, 0)).unwrap();
        assert!(find_path(&grid, Position::new(0, 0), Position::new(2, 0)).is_empty());
    }

    #[test]
    fn mover_on_start_tile_does_not_block() {
        let mut grid = parse_layout(&["..."]).unwrap();
        let me = AgentId::new();
        grid.place(me, Position::new(0, 0)).unwrap();
        assert_eq!(
            next_step(&grid, Position::new(0, 0), Position::new(2, 0)),
            Position::new(1, 0)
        );
    }

    #[test]
    fn next_step_stays_put_when_blocked() {
        let grid = parse_layout(&[".H."]).unwrap();
        let here = Position::new(0, 0);
        assert_eq!(next_step(&grid, here, Position::new(2, 0)), here);
        assert_eq!(next_step(&grid, here, here), here);
    }

    #[test]
    fn path_through_town_is_well_formed() {
        let grid = crate::layout::town().unwrap();
        let path = find_path(&grid, Position::new(1, 1), Position::new(7, 7));
        assert_eq!(path.len(), 13);
        assert_well_formed(&grid, &path);
    }

    #[test]
    fn random_position_respects_radius_and_occupancy() {
        let mut grid = parse_layout(&[".....", ".....", ".....", ".....", "....."]).unwrap();
        let center = Position::new(2, 2);
        grid.place(AgentId::new(), center).unwrap();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..50 {
            let pos = random_walkable_position(&grid, center, 1, &mut rng).unwrap();
            assert_eq!(pos.manhattan(center), 1);
        }
    }

    #[test]
    fn random_position_none_without_candidates() {
        let mut grid = parse_layout(&["H.H"]).unwrap();
        grid.place(AgentId::new(), Position::new(1, 0)).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(
            random_walkable_position(&grid, Position::new(1, 0), 3, &mut rng),
            None
        );
    }

    #[test]
    fn random_position_clips_to_grid() {
        let grid = Grid::filled(2, 2, Terrain::Park);
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..20 {
            let pos = random_walkable_position(&grid, Position::new(0, 0), 5, &mut rng).unwrap();
            assert!(grid.contains(pos));
        }
    }
}
