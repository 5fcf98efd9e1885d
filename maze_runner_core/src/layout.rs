use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Position, Trap, TrapKind, map::Grid, maze::Cell};

/// A finished maze: the grid plus every placed feature.
///
/// Layouts handed out by the generator are read-only; a new generation
/// replaces the whole composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeLayout {
    pub(crate) grid: Grid<Cell>,
    pub(crate) start: Position,
    pub(crate) exit: Position,
    pub(crate) keys: Vec<Position>,
    pub(crate) door: Option<Position>,
    pub(crate) stairs: Vec<Position>,
    pub(crate) enemies: Vec<Position>,
    pub(crate) traps: Vec<Trap>,
}

impl MazeLayout {
    /// Creates a layout with no features.
    pub fn new(grid: Grid<Cell>, start: Position, exit: Position) -> Self {
        MazeLayout {
            grid,
            start,
            exit,
            keys: Vec::new(),
            door: None,
            stairs: Vec::new(),
            enemies: Vec::new(),
            traps: Vec::new(),
        }
    }

    pub(crate) fn clear_features(&mut self) {
        self.keys.clear();
        self.door = None;
        self.stairs.clear();
        self.enemies.clear();
        self.traps.clear();
    }

    pub fn grid(&self) -> &Grid<Cell> {
        &self.grid
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn exit(&self) -> Position {
        self.exit
    }

    pub fn get_key_positions(&self) -> &[Position] {
        &self.keys
    }

    pub fn get_door_position(&self) -> Option<Position> {
        self.door
    }

    pub fn get_stair_positions(&self) -> &[Position] {
        &self.stairs
    }

    pub fn get_enemy_positions(&self) -> &[Position] {
        &self.enemies
    }

    pub fn get_trap_positions(&self) -> &[Trap] {
        &self.traps
    }

    /// Every key, door, stair, enemy and trap position, in that order.
    pub fn feature_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.keys
            .iter()
            .copied()
            .chain(self.door)
            .chain(self.stairs.iter().copied())
            .chain(self.enemies.iter().copied())
            .chain(self.traps.iter().map(|trap| trap.position))
    }

    /// Splits off the `(grid, start, exit)` triple.
    pub fn into_parts(self) -> (Grid<Cell>, Position, Position) {
        (self.grid, self.start, self.exit)
    }

    /// The map token for the cell at `position`. Start and exit take
    /// precedence over features.
    fn token_at(&self, position: Position) -> &'static str {
        if position == self.start {
            return "ST";
        }
        if position == self.exit {
            return "EX";
        }
        if self.door == Some(position) {
            return "DR";
        }
        if self.keys.contains(&position) {
            return "KY";
        }
        if self.stairs.contains(&position) {
            return "SR";
        }
        if self.enemies.contains(&position) {
            return "EN";
        }
        if let Some(trap) = self.traps.iter().find(|trap| trap.position == position) {
            return match trap.kind {
                TrapKind::Spike => "TS",
                TrapKind::Fire => "TF",
            };
        }
        match self.grid[position] {
            Cell::Wall => "WL",
            Cell::Path => "BL",
        }
    }
}

/// Writes the layout in the two-letter token map format.
impl fmt::Display for MazeLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.grid.height() {
            for x in 0..self.grid.width() {
                if x > 0 {
                    f.write_str(" ")?;
                }
                f.write_str(self.token_at(Position::new(x, y)))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Errors produced while parsing a token map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutParseError {
    #[error("Map string is empty.")]
    Empty,
    #[error("Map has zero width.")]
    ZeroWidth,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    InconsistentWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown map code '{code}' at position ({x}, {y}).")]
    UnknownCode { code: String, x: usize, y: usize },
    #[error("Multiple {0} markers found.")]
    Duplicate(&'static str),
    #[error("No {0} marker found in map.")]
    Missing(&'static str),
}

/// Parses a layout from whitespace-separated tokens, one grid row per line.
///
/// `WL` is a wall and `BL` an open cell. `ST`, `EX`, `KY`, `DR`, `SR`, `EN`,
/// `TS` and `TF` mark the start, exit, keys, door, stairs, enemies and
/// spike/fire traps; all of them sit on open cells.
pub fn load_layout_from_string(map_string: &str) -> Result<MazeLayout, LayoutParseError> {
    let lines: Vec<&str> = map_string.trim().lines().collect();
    if lines.is_empty() {
        return Err(LayoutParseError::Empty);
    }

    let mut width = 0;
    let mut rows: Vec<Vec<&str>> = Vec::with_capacity(lines.len());
    for (y, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if y == 0 {
            width = tokens.len();
            if width == 0 {
                return Err(LayoutParseError::ZeroWidth);
            }
        } else if tokens.len() != width {
            return Err(LayoutParseError::InconsistentWidth {
                row: y,
                expected: width,
                found: tokens.len(),
            });
        }
        rows.push(tokens);
    }

    let mut grid = Grid::<Cell>::new(width, rows.len());
    let mut start = None;
    let mut exit = None;
    let mut layout_features = MazeLayout::new(Grid::new(0, 0), Position::new(0, 0), Position::new(0, 0));

    for (y, tokens) in rows.iter().enumerate() {
        for (x, token) in tokens.iter().enumerate() {
            let position = Position::new(x, y);
            match *token {
                "WL" => continue,
                "BL" => {}
                "ST" => {
                    if start.replace(position).is_some() {
                        return Err(LayoutParseError::Duplicate("start ('ST')"));
                    }
                }
                "EX" => {
                    if exit.replace(position).is_some() {
                        return Err(LayoutParseError::Duplicate("exit ('EX')"));
                    }
                }
                "DR" => {
                    if layout_features.door.replace(position).is_some() {
                        return Err(LayoutParseError::Duplicate("door ('DR')"));
                    }
                }
                "KY" => layout_features.keys.push(position),
                "SR" => layout_features.stairs.push(position),
                "EN" => layout_features.enemies.push(position),
                "TS" | "TF" => layout_features.traps.push(Trap {
                    position,
                    kind: if *token == "TS" {
                        TrapKind::Spike
                    } else {
                        TrapKind::Fire
                    },
                }),
                unknown => {
                    return Err(LayoutParseError::UnknownCode {
                        code: unknown.to_string(),
                        x,
                        y,
                    });
                }
            }
            grid[position] = Cell::Path;
        }
    }

    Ok(MazeLayout {
        grid,
        start: start.ok_or(LayoutParseError::Missing("start ('ST')"))?,
        exit: exit.ok_or(LayoutParseError::Missing("exit ('EX')"))?,
        ..layout_features
    })
}
