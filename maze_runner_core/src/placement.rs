//! Exit selection and feature placement on a carved grid.
//!
//! Features are placed in priority order (keys, door, stairs, enemies, traps)
//! and every later feature excludes the cells taken by earlier ones.

use std::collections::HashSet;

use rand::{Rng, seq::IndexedRandom};
use tracing::{debug, warn};

use crate::{Position, Trap, TrapKind, layout::MazeLayout, map::Grid, maze::Cell};

/// Keys and stairs must be strictly farther than this from the start.
pub const KEY_CLEARANCE: usize = 5;

/// Enemies and traps must be strictly farther than this from the start.
pub const HAZARD_CLEARANCE: usize = 3;

/// Default minimum start-to-exit distance: half the larger side.
pub fn default_min_exit_distance(width: usize, height: usize) -> usize {
    width.max(height) / 2
}

/// What the feature pass should try to place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureRequest {
    pub keys: usize,
    pub stairs: bool,
    pub enemies: usize,
    pub traps: usize,
}

/// Chooses an exit among the farthest open cells from `start`.
///
/// Cells at least `min_distance` away are preferred; the constraint is dropped
/// when none qualify. The result is drawn from the top quarter by distance.
/// If the grid has no open cell besides the start, one is carved.
pub fn place_exit<R: Rng + ?Sized>(
    grid: &mut Grid<Cell>,
    start: Position,
    min_distance: usize,
    rng: &mut R,
) -> Position {
    let open: Vec<(Position, usize)> = grid
        .interior_paths()
        .filter(|position| *position != start)
        .map(|position| (position, position.manhattan_distance(&start)))
        .collect();

    let mut candidates: Vec<(Position, usize)> = open
        .iter()
        .copied()
        .filter(|(_, distance)| *distance >= min_distance)
        .collect();
    if candidates.is_empty() {
        warn!(min_distance, "no open cell meets the minimum exit distance, relaxing");
        candidates = open;
    }

    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    let top = (candidates.len() / 4).max(1).min(candidates.len());
    if let Some(&(exit, _)) = candidates[..top].choose(rng) {
        return exit;
    }

    // Empty only when the start is the sole open interior cell.
    carve_exit(grid, start)
}

/// Opens `(width-2, height-2)`, or `(1, 1)` when that is the start.
fn carve_exit(grid: &mut Grid<Cell>, start: Position) -> Position {
    let mut forced = Position::new(grid.width() - 2, grid.height() - 2);
    if forced == start {
        forced = Position::new(1, 1);
    }
    warn!(x = forced.x, y = forced.y, "no open cell besides the start, carving an exit cell");
    grid[forced] = Cell::Path;
    forced
}

/// Open interior cells farther than `clearance` from `start` that are not reserved.
fn open_cells(
    grid: &Grid<Cell>,
    start: Position,
    clearance: usize,
    reserved: &HashSet<Position>,
) -> Vec<Position> {
    grid.interior_paths()
        .filter(|position| position.manhattan_distance(&start) > clearance)
        .filter(|position| !reserved.contains(position))
        .collect()
}

fn sample<R: Rng + ?Sized>(candidates: &[Position], count: usize, rng: &mut R) -> Vec<Position> {
    candidates.choose_multiple(rng, count).copied().collect()
}

/// Places keys, door, stairs, enemies and traps on `layout`, replacing any
/// previously placed features.
pub fn place_features<R: Rng + ?Sized>(layout: &mut MazeLayout, request: &FeatureRequest, rng: &mut R) {
    layout.clear_features();

    if request.keys > 0 {
        let mut reserved = HashSet::from([layout.start, layout.exit]);
        let keys = sample(
            &open_cells(&layout.grid, layout.start, KEY_CLEARANCE, &reserved),
            request.keys,
            rng,
        );
        if keys.len() < request.keys {
            warn!(requested = request.keys, placed = keys.len(), "not enough room for keys");
        }
        layout.keys = keys;

        // A door with nothing to unlock it is never placed.
        if !layout.keys.is_empty() {
            reserved.extend(layout.keys.iter().copied());
            layout.door = place_door(&layout.grid, &reserved, rng);
        }
    }

    place_stairs_and_hazards(layout, request, rng);
}

/// Places stairs, enemies and traps around the keys and door already on `layout`.
pub fn place_stairs_and_hazards<R: Rng + ?Sized>(
    layout: &mut MazeLayout,
    request: &FeatureRequest,
    rng: &mut R,
) {
    let start = layout.start;
    let mut reserved: HashSet<Position> = HashSet::from([start, layout.exit]);
    reserved.extend(layout.keys.iter().copied());
    reserved.extend(layout.door);

    layout.stairs.clear();
    layout.enemies.clear();
    layout.traps.clear();

    if request.stairs {
        let stairs = sample(
            &open_cells(&layout.grid, start, KEY_CLEARANCE, &reserved),
            1,
            rng,
        );
        if stairs.is_empty() {
            warn!("no room for stairs");
        }
        reserved.extend(stairs.iter().copied());
        layout.stairs = stairs;
    }

    if request.enemies > 0 {
        let enemies = sample(
            &open_cells(&layout.grid, start, HAZARD_CLEARANCE, &reserved),
            request.enemies,
            rng,
        );
        reserved.extend(enemies.iter().copied());
        layout.enemies = enemies;
    }

    if request.traps > 0 {
        let positions = sample(
            &open_cells(&layout.grid, start, HAZARD_CLEARANCE, &reserved),
            request.traps,
            rng,
        );
        layout.traps = positions
            .into_iter()
            .map(|position| Trap {
                position,
                kind: TrapKind::ALL[rng.random_range(0..TrapKind::ALL.len())],
            })
            .collect();
    }

    debug!(
        keys = layout.keys.len(),
        door = layout.door.is_some(),
        stairs = layout.stairs.len(),
        enemies = layout.enemies.len(),
        traps = layout.traps.len(),
        "features placed"
    );
}

/// Picks a door cell in the far region of the grid (`x > width/2`, `y > height/4`).
fn place_door<R: Rng + ?Sized>(
    grid: &Grid<Cell>,
    reserved: &HashSet<Position>,
    rng: &mut R,
) -> Option<Position> {
    let (half_width, quarter_height) = (grid.width() / 2, grid.height() / 4);
    let candidates: Vec<Position> = grid
        .interior_paths()
        .filter(|position| position.x > half_width && position.y > quarter_height)
        .filter(|position| !reserved.contains(position))
        .collect();
    candidates.choose(rng).copied()
}
