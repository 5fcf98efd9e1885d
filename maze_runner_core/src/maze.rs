use serde::{Deserialize, Serialize};

use crate::{Position, map::Grid};

/// Smallest side length a maze is generated with (a 3x3 interior).
pub const MIN_DIMENSION: usize = 5;

/// A single maze cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Wall,
    Path,
}

/// Rounds `n` up to the next odd value.
#[inline]
pub fn odd_dimension(n: usize) -> usize {
    if n % 2 == 1 { n } else { n + 1 }
}

impl Grid<Cell> {
    /// Creates an all-wall maze grid with both dimensions rounded up to odd values.
    ///
    /// Odd sides put every odd coordinate on the carving lattice and keep the
    /// border on even coordinates.
    pub fn with_odd_dimensions(width: usize, height: usize) -> Self {
        Grid::new(odd_dimension(width), odd_dimension(height))
    }

    #[inline]
    pub fn is_path(&self, position: Position) -> bool {
        self.get(position.x, position.y) == Some(&Cell::Path)
    }

    #[inline]
    pub fn is_wall(&self, position: Position) -> bool {
        self.get(position.x, position.y) == Some(&Cell::Wall)
    }

    /// Resets every cell, border included, to `Wall`.
    pub fn reset_walls(&mut self) {
        self.fill(Cell::Wall);
    }

    /// True when the whole outer ring is `Wall`.
    pub fn border_is_closed(&self) -> bool {
        self.enumerate()
            .filter(|(position, _)| self.is_border(*position))
            .all(|(_, cell)| *cell == Cell::Wall)
    }

    /// Interior `Path` cells in row-major order.
    pub fn interior_paths(&self) -> impl Iterator<Item = Position> + '_ {
        self.enumerate()
            .filter(move |(position, cell)| **cell == Cell::Path && !self.is_border(*position))
            .map(|(position, _)| position)
    }

    /// Number of orthogonal neighbours of `position` that are `Path`.
    pub fn open_neighbors(&self, position: Position) -> usize {
        self.neighbors(position).filter(|n| self.is_path(*n)).count()
    }
}
