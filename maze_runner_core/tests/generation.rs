//! End-to-end behaviour of `MazeGenerator::generate`.

use std::{cell::Cell as Counter, collections::HashSet, rc::Rc};

use maze_runner_core::{
    GenerationParams, MazeGenerator, MazeLayout, Position, TrapKind,
    fallback::corridor,
    generator::MAX_ATTEMPTS,
    is_solvable,
    verify::{SolvabilityCheck, reachable_from},
};
use rand::{SeedableRng, rngs::StdRng};
use rstest::rstest;

/// Every feature position, start and exit, asserting none repeats.
fn assert_disjoint(layout: &MazeLayout) {
    let mut seen = HashSet::from([layout.start()]);
    assert!(seen.insert(layout.exit()), "exit equals start");
    for position in layout.feature_positions() {
        assert!(seen.insert(position), "{position:?} used twice");
    }
}

#[rstest]
#[case(11, 11, (11, 11))]
#[case(10, 10, (11, 11))]
#[case(20, 13, (21, 13))]
#[case(2, 8, (5, 9))]
fn grid_sides_are_odd(#[case] width: usize, #[case] height: usize, #[case] expected: (usize, usize)) {
    let mut rng = StdRng::seed_from_u64(0);
    let mut generator = MazeGenerator::new(width, height);
    let result = generator.generate(&GenerationParams::default(), &mut rng);
    assert_eq!((result.grid().width(), result.grid().height()), expected);
    assert!(result.grid().border_is_closed());
}

#[rstest]
fn small_maze_without_features() {
    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut generator = MazeGenerator::new(11, 11);
        let result = generator.generate(&GenerationParams::default(), &mut rng);
        let layout = &result.layout;

        assert_eq!(layout.grid().width(), 11);
        assert_eq!(layout.grid().height(), 11);
        assert!(layout.grid().is_path(layout.start()));
        assert!(layout.grid().is_path(layout.exit()));
        assert!(layout.start().manhattan_distance(&layout.exit()) >= 5, "seed {seed}");
        assert!(is_solvable(layout));

        assert!(layout.get_key_positions().is_empty());
        assert!(layout.get_door_position().is_none());
        assert!(layout.get_stair_positions().is_empty());
        assert!(layout.get_enemy_positions().is_empty());
        assert!(layout.get_trap_positions().is_empty());
        assert!(reachable_from(layout.grid(), layout.start()).contains(&layout.exit()));
    }
}

#[rstest]
fn two_keys_gate_the_exit() {
    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut generator = MazeGenerator::new(15, 15);
        let result = generator.generate(&GenerationParams::default().with_keys(2), &mut rng);
        let layout = &result.layout;
        let start = layout.start();

        let keys = layout.get_key_positions();
        assert_eq!(keys.len(), 2);
        assert_ne!(keys[0], keys[1]);
        assert!(keys.iter().all(|key| key.manhattan_distance(&start) > 5), "seed {seed}");

        let door = layout.get_door_position().expect("door placed");
        // The fallback puts the door on its corridor instead of the far region.
        if !result.report.used_fallback {
            assert!(door.x > 7 && door.y > 3, "seed {seed}: door at {door:?}");
        }

        let from_start = reachable_from(layout.grid(), start);
        assert!(keys.iter().all(|key| from_start.contains(key)));
        assert!(from_start.contains(&door));
        assert!(reachable_from(layout.grid(), door).contains(&layout.exit()));
        assert_disjoint(layout);
    }
}

/// Rejects every attempt and counts how often it was asked.
#[derive(Default)]
struct RejectEverything {
    calls: Rc<Counter<usize>>,
}

impl SolvabilityCheck for RejectEverything {
    fn is_solvable(&self, _layout: &MazeLayout) -> bool {
        self.calls.set(self.calls.get() + 1);
        false
    }
}

#[rstest]
fn exhausted_attempts_use_the_fallback() {
    let start = Position::new(1, 1);
    let params = GenerationParams::default()
        .with_keys(2)
        .with_enemies(3)
        .with_start(start);

    let mut shapes = Vec::new();
    for seed in [7, 8, 9] {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut generator = MazeGenerator::with_check(21, 21, RejectEverything::default());
        let result = generator.generate(&params, &mut rng).clone();

        assert!(result.report.used_fallback);
        assert_eq!(result.report.attempts, MAX_ATTEMPTS);
        assert!(is_solvable(&result.layout));
        assert!(result.grid().border_is_closed());
        assert_disjoint(&result.layout);

        let path = corridor(result.start(), result.exit());
        assert!(path.iter().all(|cell| result.grid().is_path(*cell)));
        shapes.push((
            result.exit(),
            path.len(),
            result.layout.get_key_positions().to_vec(),
            result.layout.get_door_position(),
        ));
    }

    assert!(shapes.windows(2).all(|pair| pair[0] == pair[1]));
    let (exit, length, keys, door) = &shapes[0];
    assert_eq!(*exit, Position::new(19, 19));
    assert_eq!(*length, 37);
    assert_eq!(keys, &vec![Position::new(13, 1), Position::new(19, 3)]);
    assert_eq!(*door, Some(Position::new(19, 11)));
}

#[rstest]
fn verifier_is_consulted_once_per_attempt() {
    let check = RejectEverything::default();
    let calls = Rc::clone(&check.calls);
    let mut generator = MazeGenerator::with_check(11, 11, check);
    let mut rng = StdRng::seed_from_u64(1);
    generator.generate(&GenerationParams::default(), &mut rng);
    assert_eq!(calls.get(), MAX_ATTEMPTS);
    assert!(generator.last_result().is_some_and(|r| r.report.used_fallback));
}

#[rstest]
fn hazards_never_overlap() {
    let params = GenerationParams::default().with_enemies(5).with_traps(8);
    let mut kinds = HashSet::new();
    for seed in 0..100 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut generator = MazeGenerator::new(31, 31);
        let result = generator.generate(&params, &mut rng);
        let layout = &result.layout;

        assert_eq!(layout.get_enemy_positions().len(), 5);
        assert_eq!(layout.get_trap_positions().len(), 8);
        assert_disjoint(layout);
        for trap in layout.get_trap_positions() {
            assert!(layout.grid().is_path(trap.position));
            kinds.insert(trap.kind);
        }
    }
    assert_eq!(kinds, HashSet::from(TrapKind::ALL));
}

#[rstest]
#[case(1, 1, false)]
#[case(2, 1, true)]
#[case(3, 2, true)]
#[case(3, 3, false)]
fn stairs_follow_the_floor(#[case] floors: usize, #[case] current: usize, #[case] expected: bool) {
    let mut rng = StdRng::seed_from_u64(floors as u64 * 10 + current as u64);
    let mut generator = MazeGenerator::new(25, 25);
    let params = GenerationParams::default()
        .with_keys(1)
        .with_floors(floors, current);
    let result = generator.generate(&params, &mut rng);
    assert_eq!(!result.layout.get_stair_positions().is_empty(), expected);
    assert!(result.layout.get_stair_positions().len() <= 1);
    assert!(is_solvable(&result.layout));
    assert_disjoint(&result.layout);
}

#[rstest]
fn verification_does_not_mutate() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut generator = MazeGenerator::new(21, 21);
    let params = GenerationParams::default().with_keys(3).with_traps(4);
    let layout = generator.generate(&params, &mut rng).layout.clone();
    let snapshot = layout.clone();

    let first = is_solvable(&layout);
    let second = is_solvable(&layout);
    assert_eq!(first, second);
    assert!(first);
    assert_eq!(layout, snapshot);
}

#[rstest]
fn same_seed_same_maze() {
    let params = GenerationParams::default().with_keys(2).with_enemies(4).with_traps(4);
    let mut first = MazeGenerator::new(25, 19);
    let mut second = MazeGenerator::new(25, 19);
    let a = first.generate(&params, &mut StdRng::seed_from_u64(42)).clone();
    let b = second.generate(&params, &mut StdRng::seed_from_u64(42)).clone();
    assert_eq!(a.layout, b.layout);
    assert_eq!(a.report, b.report);
}

#[rstest]
fn accessors_follow_the_latest_generation() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut generator = MazeGenerator::new(21, 21);

    generator.generate(&GenerationParams::default().with_keys(2).with_traps(3), &mut rng);
    assert_eq!(generator.get_key_positions().len(), 2);
    assert!(generator.get_door_position().is_some());
    assert_eq!(generator.get_trap_positions().len(), 3);

    generator.generate(&GenerationParams::default(), &mut rng);
    assert!(generator.get_key_positions().is_empty());
    assert!(generator.get_door_position().is_none());
    assert!(generator.get_trap_positions().is_empty());

    let (grid, start, exit) = generator.take_result().expect("generated").into_parts();
    assert!(grid.is_path(start) && grid.is_path(exit));
    assert!(generator.get_exit_position().is_none());
}

#[rstest]
fn provided_start_is_kept() {
    let start = Position::new(5, 3);
    let mut rng = StdRng::seed_from_u64(8);
    let mut generator = MazeGenerator::new(21, 21);
    let result = generator.generate(&GenerationParams::default().with_start(start), &mut rng);
    assert_eq!(result.start(), start);
    assert!(is_solvable(&result.layout));
}
