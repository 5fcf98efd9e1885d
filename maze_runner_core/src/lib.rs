use serde::{Deserialize, Serialize};

pub mod carve;
pub mod fallback;
pub mod generator;
pub mod hazard;
pub mod layout;
pub mod level;
pub mod map;
pub mod maze;
pub mod placement;
pub mod verify;

pub use generator::{GenerationParams, GenerationReport, GenerationResult, MazeGenerator};
pub use layout::MazeLayout;
pub use map::Grid;
pub use maze::Cell;
pub use verify::is_solvable;

/// Represents a 2D coordinate. `x` is the column, `y` is the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Returns the Manhattan distance between two positions.
    pub fn manhattan_distance(&self, other: &Position) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// The kind of a timed hazard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrapKind {
    Spike,
    Fire,
}

impl TrapKind {
    pub const ALL: [TrapKind; 2] = [TrapKind::Spike, TrapKind::Fire];
}

/// A trap spawn cell together with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trap {
    pub position: Position,
    pub kind: TrapKind,
}
