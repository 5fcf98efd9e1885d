//! Breadth-first reachability checks over a finished layout.

use std::collections::{HashSet, VecDeque};

use crate::{Position, layout::MazeLayout, map::Grid, maze::Cell};

/// Acceptance gate used by the generator to judge an attempt.
pub trait SolvabilityCheck {
    /// Returns `true` if the layout can be completed. Must not have side effects.
    fn is_solvable(&self, layout: &MazeLayout) -> bool;
}

/// The standard gate: the start → keys → door → exit chain must be walkable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReachabilityCheck;

impl SolvabilityCheck for ReachabilityCheck {
    fn is_solvable(&self, layout: &MazeLayout) -> bool {
        is_solvable(layout)
    }
}

/// Every `Path` cell 4-connected to `origin`, including `origin` itself.
///
/// Returns an empty set when `origin` is not an open cell.
pub fn reachable_from(grid: &Grid<Cell>, origin: Position) -> HashSet<Position> {
    let mut visited = HashSet::new();
    if !grid.is_path(origin) {
        return visited;
    }

    let mut frontier = VecDeque::from([origin]);
    visited.insert(origin);
    while let Some(current) = frontier.pop_front() {
        for neighbor in grid.neighbors(current) {
            if grid.is_path(neighbor) && visited.insert(neighbor) {
                frontier.push_back(neighbor);
            }
        }
    }
    visited
}

/// Checks that the layout can be completed.
///
/// All keys and stair cells must be reachable from the start. With a door,
/// the door must be reachable from the start and the exit from the door;
/// without one, the exit must be reachable from the start.
///
/// The door leg is checked independently: this does not prove that every
/// route to the exit passes through the door.
pub fn is_solvable(layout: &MazeLayout) -> bool {
    let grid = layout.grid();
    let from_start = reachable_from(grid, layout.start());

    let collectibles_reachable = layout
        .get_key_positions()
        .iter()
        .chain(layout.get_stair_positions())
        .all(|position| from_start.contains(position));
    if !collectibles_reachable {
        return false;
    }

    match layout.get_door_position() {
        Some(door) => {
            from_start.contains(&door) && reachable_from(grid, door).contains(&layout.exit())
        }
        None => from_start.contains(&layout.exit()),
    }
}
