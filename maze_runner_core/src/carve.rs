//! Wall removal: the random-walk carve and the braiding pass.
//!
//! Carving runs on the lattice of odd-coordinate cells. Walks step two cells
//! at a time and open the wall cell in between, so even rows and columns stay
//! walls unless a walk passes through them and the border is never touched.

use rand::{Rng, seq::IndexedRandom};
use tracing::debug;

use crate::{Position, map::Grid, maze::Cell};

/// Braiding opens one extra wall per this many grid cells.
pub const BRAID_DIVISOR: usize = 30;

/// Random samples allowed per requested braid opening before giving up.
const BRAID_SAMPLES_PER_OPENING: usize = 100;

/// Absolute iteration counts derived from the `complexity` and `density` knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarveBudget {
    /// Maximum steps of a single walk.
    pub walk_steps: usize,
    /// Number of walks.
    pub walks: usize,
}

impl CarveBudget {
    /// Scales `complexity` and `density` (clamped to `[0, 1]`) to the grid size.
    pub fn scaled(complexity: f64, density: f64, width: usize, height: usize) -> Self {
        let complexity = clamp_unit(complexity);
        let density = clamp_unit(density);
        CarveBudget {
            walk_steps: (complexity * (5 * (width + height)) as f64) as usize,
            walks: (density * ((height / 2) * (width / 2)) as f64) as usize,
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// Picks a uniformly random cell with odd `x` and odd `y`.
pub fn random_lattice_cell<R: Rng + ?Sized>(grid: &Grid<Cell>, rng: &mut R) -> Position {
    let x = rng.random_range(0..grid.width() / 2) * 2 + 1;
    let y = rng.random_range(0..grid.height() / 2) * 2 + 1;
    Position::new(x, y)
}

/// Lattice moves out of `head` as `(wall_between, destination)` pairs that stay inside the border.
fn lattice_moves(grid: &Grid<Cell>, head: Position) -> Vec<(Position, Position)> {
    let mut moves = Vec::with_capacity(4);
    if head.x >= 3 {
        moves.push((
            Position::new(head.x - 1, head.y),
            Position::new(head.x - 2, head.y),
        ));
    }
    if head.x + 3 < grid.width() {
        moves.push((
            Position::new(head.x + 1, head.y),
            Position::new(head.x + 2, head.y),
        ));
    }
    if head.y >= 3 {
        moves.push((
            Position::new(head.x, head.y - 1),
            Position::new(head.x, head.y - 2),
        ));
    }
    if head.y + 3 < grid.height() {
        moves.push((
            Position::new(head.x, head.y + 1),
            Position::new(head.x, head.y + 2),
        ));
    }
    moves
}

/// Carves the maze structure into `grid`, which is expected to be all walls.
///
/// `start` is opened first. Each walk starts from a random lattice cell and
/// keeps stepping into uncarved neighbours. A walk that gets boxed in by
/// carved cells opens the wall to one of them and stops; this is what joins
/// separate walks and introduces loops.
pub fn carve<R: Rng + ?Sized>(grid: &mut Grid<Cell>, start: Position, budget: CarveBudget, rng: &mut R) {
    grid[start] = Cell::Path;

    for _ in 0..budget.walks {
        let mut head = random_lattice_cell(grid, rng);
        grid[head] = Cell::Path;

        for _ in 0..budget.walk_steps {
            let moves = lattice_moves(grid, head);
            let fresh: Vec<(Position, Position)> = moves
                .iter()
                .copied()
                .filter(|(_, next)| grid.is_wall(*next))
                .collect();

            if let Some(&(wall, next)) = fresh.choose(rng) {
                grid[wall] = Cell::Path;
                grid[next] = Cell::Path;
                head = next;
                continue;
            }

            let closed: Vec<Position> = moves
                .iter()
                .filter(|(wall, next)| grid.is_wall(*wall) && grid.is_path(*next))
                .map(|(wall, _)| *wall)
                .collect();
            if let Some(&wall) = closed.choose(rng) {
                grid[wall] = Cell::Path;
            }
            break;
        }
    }
}

/// Opens extra walls to add loops. Returns how many cells were opened.
///
/// Only interior walls with exactly two `Path` neighbours are opened, so the
/// pass never creates open rooms from dead space and never disconnects anything.
pub fn braid<R: Rng + ?Sized>(grid: &mut Grid<Cell>, rng: &mut R) -> usize {
    let (width, height) = (grid.width(), grid.height());
    if width < 3 || height < 3 {
        return 0;
    }

    let target = (width * height) / BRAID_DIVISOR;
    let budget = target * BRAID_SAMPLES_PER_OPENING;
    let mut opened = 0;
    let mut samples = 0;

    while opened < target && samples < budget {
        samples += 1;
        let candidate = Position::new(
            rng.random_range(1..width - 1),
            rng.random_range(1..height - 1),
        );
        if grid.is_wall(candidate) && grid.open_neighbors(candidate) == 2 {
            grid[candidate] = Cell::Path;
            opened += 1;
        }
    }

    if opened < target {
        debug!(opened, target, samples, "braiding stopped early");
    }
    opened
}
