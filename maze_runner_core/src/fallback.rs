//! Deterministic construction of a maze that is solvable by construction.
//!
//! Used once randomized attempts are exhausted. A single horizontal-then-vertical
//! corridor joins start and exit; keys and the door sit on that corridor in
//! order, so the start → keys → door → exit chain always holds.

use rand::Rng;
use tracing::warn;

use crate::{
    Position,
    carve::braid,
    layout::MazeLayout,
    map::Grid,
    maze::Cell,
    placement::{FeatureRequest, KEY_CLEARANCE, place_stairs_and_hazards},
};

/// Picks the fallback exit for `start`.
///
/// The lower-right interior corner is used when it is far enough; otherwise
/// the interior corner farthest from `start`, which is the most the grid allows.
pub fn fallback_exit(width: usize, height: usize, start: Position, min_distance: usize) -> Position {
    let preferred = Position::new(width - 2, height - 2);
    if preferred != start && preferred.manhattan_distance(&start) >= min_distance {
        return preferred;
    }

    let corners = [
        preferred,
        Position::new(1, height - 2),
        Position::new(width - 2, 1),
        Position::new(1, 1),
    ];
    let mut farthest = preferred;
    for corner in corners {
        if corner.manhattan_distance(&start) > farthest.manhattan_distance(&start) {
            farthest = corner;
        }
    }
    if farthest.manhattan_distance(&start) < min_distance {
        warn!(
            min_distance,
            achieved = farthest.manhattan_distance(&start),
            "grid too small for the minimum exit distance"
        );
    }
    farthest
}

/// Cells of the horizontal-then-vertical corridor from `from` to `to`, both ends included.
pub fn corridor(from: Position, to: Position) -> Vec<Position> {
    let mut cells = Vec::with_capacity(from.manhattan_distance(&to) + 1);
    let mut current = from;
    cells.push(current);
    while current.x != to.x {
        current.x = if current.x < to.x { current.x + 1 } else { current.x - 1 };
        cells.push(current);
    }
    while current.y != to.y {
        current.y = if current.y < to.y { current.y + 1 } else { current.y - 1 };
        cells.push(current);
    }
    cells
}

/// Corridor indices for `keys` keys and the door on a corridor of length `distance`.
///
/// Keys are spread evenly over the corridor past the key clearance (or over the
/// whole corridor when it is too short for that); the door sits halfway between
/// the last key and the exit. Fewer keys are returned when the corridor is too
/// short to keep every index distinct, and no door without keys.
pub fn waypoint_indices(distance: usize, keys: usize) -> (Vec<usize>, Option<usize>) {
    let fitted = if distance >= keys + 2 {
        keys
    } else {
        distance.saturating_sub(2)
    };
    let offset = if distance >= KEY_CLEARANCE + fitted + 2 {
        KEY_CLEARANCE
    } else {
        0
    };
    let span = distance - offset;
    let key_indices: Vec<usize> = (0..fitted)
        .map(|j| offset + (j + 1) * span / (fitted + 2))
        .collect();
    let door_index = key_indices.last().map(|last| (last + distance) / 2);
    (key_indices, door_index)
}

/// Builds the fallback layout, reusing `grid`'s allocation.
pub fn build<R: Rng + ?Sized>(
    mut grid: Grid<Cell>,
    start: Position,
    min_exit_distance: usize,
    features: &FeatureRequest,
    rng: &mut R,
) -> MazeLayout {
    grid.reset_walls();
    // Leave room for every key past the clearance, plus the door.
    let needed = if features.keys > 0 {
        min_exit_distance.max(KEY_CLEARANCE + features.keys + 2)
    } else {
        min_exit_distance
    };
    let exit = fallback_exit(grid.width(), grid.height(), start, needed);

    let path = corridor(start, exit);
    for cell in &path {
        grid[*cell] = Cell::Path;
    }

    let (key_indices, door_index) = waypoint_indices(path.len() - 1, features.keys);
    if key_indices.len() < features.keys {
        warn!(
            requested = features.keys,
            placed = key_indices.len(),
            "fallback corridor too short for every key"
        );
    }

    braid(&mut grid, rng);

    let mut layout = MazeLayout::new(grid, start, exit);
    layout.keys = key_indices.iter().map(|&index| path[index]).collect();
    layout.door = door_index.map(|index| path[index]);
    place_stairs_and_hazards(&mut layout, features, rng);
    layout
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::verify::is_solvable;

    #[test]
    fn corridor_turns_once() {
        let cells = corridor(Position::new(1, 1), Position::new(3, 4));
        assert_eq!(
            cells,
            vec![
                Position::new(1, 1),
                Position::new(2, 1),
                Position::new(3, 1),
                Position::new(3, 2),
                Position::new(3, 3),
                Position::new(3, 4),
            ]
        );
        assert_eq!(corridor(Position::new(2, 2), Position::new(2, 2)).len(), 1);
    }

    #[test]
    fn waypoints_are_ordered_and_distinct() {
        assert_eq!(waypoint_indices(24, 2), (vec![9, 14], Some(19)));
        // Too short to skip the clearance.
        assert_eq!(waypoint_indices(6, 2), (vec![1, 3], Some(4)));
        assert_eq!(waypoint_indices(24, 0), (vec![], None));
        // Only two keys fit between index 0 and index 4.
        assert_eq!(waypoint_indices(4, 5), (vec![1, 2], Some(3)));
        assert_eq!(waypoint_indices(2, 1), (vec![], None));

        for distance in 2..40 {
            for keys in 0..6 {
                let (indices, door) = waypoint_indices(distance, keys);
                let mut chain: Vec<usize> = vec![0];
                chain.extend(&indices);
                chain.extend(door);
                chain.push(distance);
                assert!(chain.windows(2).all(|pair| pair[0] < pair[1]), "{distance} {keys}");
            }
        }
    }

    #[test]
    fn exit_prefers_lower_right_corner() {
        assert_eq!(fallback_exit(15, 15, Position::new(1, 1), 7), Position::new(13, 13));
        // Start in the lower right: the opposite corner is the farthest.
        assert_eq!(fallback_exit(15, 15, Position::new(13, 13), 7), Position::new(1, 1));
        assert_eq!(fallback_exit(5, 5, Position::new(3, 3), 2), Position::new(1, 1));
    }

    #[test]
    fn build_is_solvable_with_every_feature() {
        let request = FeatureRequest {
            keys: 3,
            stairs: true,
            enemies: 4,
            traps: 4,
        };
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let grid = Grid::<Cell>::with_odd_dimensions(21, 21);
            let layout = build(grid, Position::new(1, 1), 10, &request, &mut rng);
            assert!(is_solvable(&layout));
            assert!(layout.grid().border_is_closed());
            assert_eq!(layout.get_key_positions().len(), 3);
            assert!(layout.get_door_position().is_some());
        }
    }
}
