//! The generate → verify → retry → fallback controller.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    Position, Trap,
    carve::{CarveBudget, braid, carve, random_lattice_cell},
    fallback,
    layout::MazeLayout,
    map::Grid,
    maze::{Cell, MIN_DIMENSION, odd_dimension},
    placement::{FeatureRequest, default_min_exit_distance, place_exit, place_features},
    verify::{ReachabilityCheck, SolvabilityCheck},
};

/// Randomized attempts made before falling back to the deterministic maze.
pub const MAX_ATTEMPTS: usize = 5;

/// Parameters of a single `generate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub keys_required: usize,
    pub num_enemies: usize,
    pub num_traps: usize,
    pub num_floors: usize,
    /// 1-based.
    pub current_floor: usize,
    /// Walk length knob in `[0, 1]`.
    pub complexity: f64,
    /// Walk count knob in `[0, 1]`.
    pub density: f64,
    pub start_pos: Option<Position>,
    /// Defaults to half the larger grid side.
    pub min_exit_distance: Option<usize>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        GenerationParams {
            keys_required: 0,
            num_enemies: 0,
            num_traps: 0,
            num_floors: 1,
            current_floor: 1,
            complexity: 0.75,
            density: 0.75,
            start_pos: None,
            min_exit_distance: None,
        }
    }
}

impl GenerationParams {
    pub fn with_keys(mut self, keys_required: usize) -> Self {
        self.keys_required = keys_required;
        self
    }

    pub fn with_enemies(mut self, num_enemies: usize) -> Self {
        self.num_enemies = num_enemies;
        self
    }

    pub fn with_traps(mut self, num_traps: usize) -> Self {
        self.num_traps = num_traps;
        self
    }

    pub fn with_floors(mut self, num_floors: usize, current_floor: usize) -> Self {
        self.num_floors = num_floors;
        self.current_floor = current_floor;
        self
    }

    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    pub fn with_start(mut self, start: Position) -> Self {
        self.start_pos = Some(start);
        self
    }

    pub fn with_min_exit_distance(mut self, distance: usize) -> Self {
        self.min_exit_distance = Some(distance);
        self
    }

    /// Stairs are placed on every floor except the last.
    pub fn has_stairs(&self) -> bool {
        self.num_floors > 1 && self.current_floor < self.num_floors
    }

    pub fn feature_request(&self) -> FeatureRequest {
        FeatureRequest {
            keys: self.keys_required,
            stairs: self.has_stairs(),
            enemies: self.num_enemies,
            traps: self.num_traps,
        }
    }
}

/// How a generation call went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Randomized attempts made, accepted one included.
    pub attempts: usize,
    pub used_fallback: bool,
}

/// A finished layout together with its [`GenerationReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub layout: MazeLayout,
    pub report: GenerationReport,
}

impl GenerationResult {
    pub fn grid(&self) -> &Grid<Cell> {
        self.layout.grid()
    }

    pub fn start(&self) -> Position {
        self.layout.start()
    }

    pub fn exit(&self) -> Position {
        self.layout.exit()
    }

    /// Splits off the `(grid, start, exit)` triple.
    pub fn into_parts(self) -> (Grid<Cell>, Position, Position) {
        self.layout.into_parts()
    }
}

/// Resolved inputs shared by every attempt of one `generate` call.
#[derive(Debug, Clone)]
struct AttemptPlan {
    start: Position,
    min_exit_distance: usize,
    budget: CarveBudget,
    features: FeatureRequest,
}

/// States of the controller. Grids of rejected attempts are carried along and
/// reset rather than reallocated.
#[derive(Debug)]
enum GenerationState {
    Generating { attempt: usize, grid: Grid<Cell> },
    Verifying { attempt: usize, layout: MazeLayout },
    Retrying { attempt: usize, grid: Grid<Cell> },
    Accepted { attempt: usize, layout: MazeLayout },
    FallbackRequired { grid: Grid<Cell> },
}

/// Generates mazes of a fixed size and remembers the last result.
///
/// The solvability gate is a type parameter so tests can substitute it; the
/// deterministic fallback is solvable regardless of the gate.
#[derive(Debug)]
pub struct MazeGenerator<C = ReachabilityCheck> {
    width: usize,
    height: usize,
    check: C,
    last: Option<GenerationResult>,
}

impl MazeGenerator<ReachabilityCheck> {
    /// Creates a generator. Both sides are rounded up to odd values, and raised
    /// to at least [`MIN_DIMENSION`].
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_check(width, height, ReachabilityCheck)
    }
}

impl<C: SolvabilityCheck> MazeGenerator<C> {
    pub fn with_check(width: usize, height: usize, check: C) -> Self {
        if width < MIN_DIMENSION || height < MIN_DIMENSION {
            warn!(width, height, min = MIN_DIMENSION, "maze dimensions raised to the minimum");
        }
        MazeGenerator {
            width: odd_dimension(width.max(MIN_DIMENSION)),
            height: odd_dimension(height.max(MIN_DIMENSION)),
            check,
            last: None,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Generates a new maze, replacing the previous result.
    ///
    /// Never fails: unsolvable attempts are retried up to [`MAX_ATTEMPTS`]
    /// times and then replaced by the deterministic fallback.
    pub fn generate<R: Rng + ?Sized>(&mut self, params: &GenerationParams, rng: &mut R) -> &GenerationResult {
        let grid = Grid::<Cell>::with_odd_dimensions(self.width, self.height);
        let plan = AttemptPlan {
            start: self.resolve_start(&grid, params.start_pos, rng),
            min_exit_distance: params
                .min_exit_distance
                .unwrap_or_else(|| default_min_exit_distance(self.width, self.height)),
            budget: CarveBudget::scaled(params.complexity, params.density, self.width, self.height),
            features: params.feature_request(),
        };
        debug!(?plan, "starting generation");

        let mut state = GenerationState::Generating { attempt: 1, grid };
        let result = loop {
            state = match state {
                GenerationState::Generating { attempt, grid } => GenerationState::Verifying {
                    attempt,
                    layout: Self::attempt(&plan, grid, rng),
                },
                GenerationState::Verifying { attempt, layout } => {
                    let gated = plan.features.keys == 0
                        || (!layout.get_key_positions().is_empty() && layout.get_door_position().is_some());
                    if gated && self.check.is_solvable(&layout) {
                        GenerationState::Accepted { attempt, layout }
                    } else if attempt < MAX_ATTEMPTS {
                        warn!(attempt, max = MAX_ATTEMPTS, "generated maze is not solvable, regenerating");
                        GenerationState::Retrying {
                            attempt,
                            grid: layout.into_parts().0,
                        }
                    } else {
                        GenerationState::FallbackRequired {
                            grid: layout.into_parts().0,
                        }
                    }
                }
                GenerationState::Retrying { attempt, grid } => GenerationState::Generating {
                    attempt: attempt + 1,
                    grid,
                },
                GenerationState::Accepted { attempt, layout } => {
                    break GenerationResult {
                        layout,
                        report: GenerationReport {
                            attempts: attempt,
                            used_fallback: false,
                        },
                    };
                }
                GenerationState::FallbackRequired { grid } => {
                    warn!(
                        attempts = MAX_ATTEMPTS,
                        "no solvable maze after maximum attempts, building fallback maze"
                    );
                    break GenerationResult {
                        layout: fallback::build(grid, plan.start, plan.min_exit_distance, &plan.features, rng),
                        report: GenerationReport {
                            attempts: MAX_ATTEMPTS,
                            used_fallback: true,
                        },
                    };
                }
            };
        };

        info!(
            width = self.width,
            height = self.height,
            attempts = result.report.attempts,
            fallback = result.report.used_fallback,
            "maze generated"
        );
        self.last.insert(result)
    }

    /// One randomized attempt: reset, carve, braid, pick the exit, place features.
    fn attempt<R: Rng + ?Sized>(plan: &AttemptPlan, mut grid: Grid<Cell>, rng: &mut R) -> MazeLayout {
        grid.reset_walls();
        carve(&mut grid, plan.start, plan.budget, rng);
        braid(&mut grid, rng);
        let exit = place_exit(&mut grid, plan.start, plan.min_exit_distance, rng);
        let mut layout = MazeLayout::new(grid, plan.start, exit);
        place_features(&mut layout, &plan.features, rng);
        layout
    }

    /// Uses the requested start if it lies inside the border, otherwise a random lattice cell.
    fn resolve_start<R: Rng + ?Sized>(
        &self,
        grid: &Grid<Cell>,
        requested: Option<Position>,
        rng: &mut R,
    ) -> Position {
        match requested {
            Some(start) if grid.is_interior(start) => start,
            Some(start) => {
                warn!(x = start.x, y = start.y, "invalid start position provided, using a random one");
                random_lattice_cell(grid, rng)
            }
            None => random_lattice_cell(grid, rng),
        }
    }

    pub fn last_result(&self) -> Option<&GenerationResult> {
        self.last.as_ref()
    }

    pub fn take_result(&mut self) -> Option<GenerationResult> {
        self.last.take()
    }

    fn last_layout(&self) -> Option<&MazeLayout> {
        self.last.as_ref().map(|result| &result.layout)
    }

    pub fn get_start_position(&self) -> Option<Position> {
        self.last_layout().map(MazeLayout::start)
    }

    pub fn get_exit_position(&self) -> Option<Position> {
        self.last_layout().map(MazeLayout::exit)
    }

    pub fn get_key_positions(&self) -> &[Position] {
        self.last_layout().map(MazeLayout::get_key_positions).unwrap_or_default()
    }

    pub fn get_door_position(&self) -> Option<Position> {
        self.last_layout().and_then(MazeLayout::get_door_position)
    }

    pub fn get_stair_positions(&self) -> &[Position] {
        self.last_layout().map(MazeLayout::get_stair_positions).unwrap_or_default()
    }

    pub fn get_enemy_positions(&self) -> &[Position] {
        self.last_layout().map(MazeLayout::get_enemy_positions).unwrap_or_default()
    }

    pub fn get_trap_positions(&self) -> &[Trap] {
        self.last_layout().map(MazeLayout::get_trap_positions).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::verify::is_solvable;

    #[test]
    fn dimensions_are_odd_and_at_least_minimum() {
        let generator = MazeGenerator::new(10, 3);
        assert_eq!((generator.width(), generator.height()), (11, 5));
    }

    #[test]
    fn accessors_are_empty_before_generation() {
        let generator = MazeGenerator::new(11, 11);
        assert!(generator.get_key_positions().is_empty());
        assert!(generator.get_door_position().is_none());
        assert!(generator.get_start_position().is_none());
    }

    #[test]
    fn out_of_bounds_start_is_replaced() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut generator = MazeGenerator::new(11, 11);
        let params = GenerationParams::default().with_start(Position::new(0, 40));
        let result = generator.generate(&params, &mut rng);
        let start = result.start();
        assert!(start.x % 2 == 1 && start.y % 2 == 1);
        assert!(result.grid().is_path(start));
    }

    #[test]
    fn zero_density_falls_back() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut generator = MazeGenerator::new(15, 15);
        let params = GenerationParams::default()
            .with_density(0.0)
            .with_start(Position::new(1, 1));
        let result = generator.generate(&params, &mut rng);
        assert!(result.report.used_fallback);
        assert_eq!(result.report.attempts, MAX_ATTEMPTS);
        assert_eq!(result.exit(), Position::new(13, 13));
        assert!(is_solvable(&result.layout));
    }

    #[test]
    fn tiny_grid_with_keys_gets_a_key_and_a_door() {
        // No cell of a 5x5 maze is far enough for a key, so every attempt fails
        // and the corridor maze supplies both.
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut generator = MazeGenerator::new(5, 5);
            let result = generator.generate(&GenerationParams::default().with_keys(2), &mut rng);
            let layout = &result.layout;
            assert!(result.report.used_fallback, "seed {seed}");
            assert!(!layout.get_key_positions().is_empty());
            assert!(layout.get_door_position().is_some());
            assert!(is_solvable(layout));
        }
    }

    #[test]
    fn stairs_only_before_the_last_floor() {
        assert!(GenerationParams::default().with_floors(3, 2).has_stairs());
        assert!(!GenerationParams::default().with_floors(3, 3).has_stairs());
        assert!(!GenerationParams::default().has_stairs());
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let params: GenerationParams = toml::from_str("keys_required = 2\ndensity = 0.5").unwrap();
        assert_eq!(params.keys_required, 2);
        assert_eq!(params.density, 0.5);
        assert_eq!(params.complexity, 0.75);
        assert_eq!(params.num_floors, 1);
    }
}
