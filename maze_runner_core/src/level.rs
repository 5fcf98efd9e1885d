//! Difficulty tiers and the generation parameters derived from them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{generator::GenerationParams, hazard::TrapCycle, maze::MIN_DIMENSION};

/// Errors raised while loading or validating a level table.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read level file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse level table: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Level table contains no levels.")]
    Empty,
    #[error("Level {level} is invalid: {reason}")]
    Invalid { level: usize, reason: String },
}

fn default_floors() -> usize {
    1
}

fn default_theme() -> String {
    "dungeon".to_string()
}

fn default_enemy_speed() -> f64 {
    0.5
}

fn default_trap_activation_time() -> f64 {
    3.0
}

fn default_knob() -> f64 {
    0.75
}

/// One difficulty tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// `(width, height)` in cells.
    pub size: (usize, usize),
    #[serde(default)]
    pub enemies: usize,
    #[serde(default)]
    pub traps: usize,
    #[serde(default)]
    pub keys_required: usize,
    /// Seconds; `0` means no limit.
    #[serde(default)]
    pub time_limit: u32,
    #[serde(default = "default_floors")]
    pub floors: usize,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub description: String,
    /// Cells per second.
    #[serde(default = "default_enemy_speed")]
    pub enemy_speed: f64,
    /// Seconds between trap activations.
    #[serde(default = "default_trap_activation_time")]
    pub trap_activation_time: f64,
    #[serde(default)]
    pub min_exit_distance: Option<usize>,
    #[serde(default = "default_knob")]
    pub complexity: f64,
    #[serde(default = "default_knob")]
    pub density: f64,
}

impl LevelConfig {
    /// Generation parameters for `floor` (1-based, clamped to the level's floors).
    ///
    /// Keys and the door only appear on the first floor. Enemies and traps are
    /// split evenly across floors.
    pub fn params_for_floor(&self, floor: usize) -> GenerationParams {
        let floors = self.floors.max(1);
        let floor = floor.clamp(1, floors);
        GenerationParams {
            keys_required: if floor == 1 { self.keys_required } else { 0 },
            num_enemies: self.enemies / floors,
            num_traps: self.traps / floors,
            num_floors: floors,
            current_floor: floor,
            complexity: self.complexity,
            density: self.density,
            start_pos: None,
            min_exit_distance: self.min_exit_distance,
        }
    }

    pub fn trap_cycle(&self) -> TrapCycle {
        TrapCycle::new(self.trap_activation_time)
    }

    fn validate(&self, level: usize) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::Invalid { level, reason });
        let (width, height) = self.size;
        if width < MIN_DIMENSION || height < MIN_DIMENSION {
            return invalid(format!("size {width}x{height} is below {MIN_DIMENSION}x{MIN_DIMENSION}"));
        }
        if self.floors == 0 {
            return invalid("floors must be at least 1".to_string());
        }
        for (name, value) in [("complexity", self.complexity), ("density", self.density)] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{name} {value} is outside [0, 1]"));
            }
        }
        if self.trap_activation_time.is_nan() || self.trap_activation_time <= 0.0 {
            return invalid("trap_activation_time must be positive".to_string());
        }
        Ok(())
    }
}

/// An ordered set of difficulty tiers, level 1 first. Never empty.
///
/// Deserializing goes through the same validation as [`LevelTable::from_toml_str`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLevelTable")]
pub struct LevelTable {
    levels: Vec<LevelConfig>,
}

/// A level table as written, before validation.
#[derive(Deserialize)]
struct RawLevelTable {
    levels: Vec<LevelConfig>,
}

impl TryFrom<RawLevelTable> for LevelTable {
    type Error = ConfigError;

    fn try_from(raw: RawLevelTable) -> Result<Self, Self::Error> {
        let table = LevelTable { levels: raw.levels };
        table.validate()?;
        Ok(table)
    }
}

impl LevelTable {
    /// Parses a table from TOML with one `[[levels]]` entry per tier.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let raw: RawLevelTable = toml::from_str(source)?;
        LevelTable::try_from(raw)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.levels.is_empty() {
            return Err(ConfigError::Empty);
        }
        for (index, level) in self.levels.iter().enumerate() {
            level.validate(index + 1)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// The tier for `level` (1-based); out-of-range numbers are clamped.
    pub fn get(&self, level: usize) -> &LevelConfig {
        let index = level.clamp(1, self.levels.len()) - 1;
        &self.levels[index]
    }

    /// Clamps a level number into this table's range.
    pub fn clamp_level(&self, level: usize) -> usize {
        level.clamp(1, self.levels.len())
    }
}

#[allow(clippy::too_many_arguments)]
fn tier(
    size: usize,
    enemies: usize,
    traps: usize,
    keys_required: usize,
    time_limit: u32,
    floors: usize,
    theme: &str,
    description: &str,
    enemy_speed: f64,
    trap_activation_time: f64,
    min_exit_distance: usize,
) -> LevelConfig {
    LevelConfig {
        size: (size, size),
        enemies,
        traps,
        keys_required,
        time_limit,
        floors,
        theme: theme.to_string(),
        description: description.to_string(),
        enemy_speed,
        trap_activation_time,
        min_exit_distance: Some(min_exit_distance),
        complexity: default_knob(),
        density: default_knob(),
    }
}

/// The ten built-in tiers.
impl Default for LevelTable {
    fn default() -> Self {
        LevelTable {
            levels: vec![
                tier(31, 1, 1, 0, 0, 1, "dungeon", "Find your way through a simple maze with a single enemy and trap.", 0.3, 5.0, 15),
                tier(31, 2, 2, 0, 0, 1, "dungeon", "More enemies and traps to avoid.", 0.4, 4.0, 18),
                tier(35, 3, 3, 1, 0, 1, "dungeon", "Find the key while avoiding enemies and traps.", 0.5, 3.5, 20),
                tier(35, 4, 4, 1, 180, 1, "dungeon", "Beat the clock while navigating through dangers.", 0.6, 3.0, 22),
                tier(41, 5, 6, 1, 210, 1, "forest", "Navigate through the forest maze with increased dangers.", 0.7, 2.5, 25),
                tier(31, 6, 8, 2, 240, 2, "dungeon", "Find the stairs while avoiding numerous enemies and traps.", 0.8, 2.0, 20),
                tier(41, 7, 10, 2, 300, 1, "space", "Navigate through the space station with fast enemies.", 0.9, 1.8, 28),
                tier(41, 8, 12, 3, 360, 2, "space", "A complex multi-floor space station with aggressive enemies.", 1.0, 1.5, 30),
                tier(45, 9, 15, 3, 420, 2, "forest", "A challenging forest maze with fast enemies and quick traps.", 1.1, 1.2, 32),
                tier(51, 10, 20, 4, 600, 3, "dungeon", "The ultimate maze challenge with deadly enemies and traps.", 1.2, 1.0, 35),
            ],
        }
    }
}
