//! Property checks over generated boards and random intent streams

use glam::IVec2;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use rock_reactor::audio::CueRecorder;
use rock_reactor::consts::*;
use rock_reactor::sim::{
    GameState, Intent, MatchGrid, PieceStack, RockKind, RotateDir, TickInput, tick,
};
use rock_reactor::{RunMeta, RunReporter};

#[derive(Default)]
struct CountingReporter(usize);

impl RunReporter for CountingReporter {
    fn report_run(&mut self, _final_score: u64, _meta: RunMeta) {
        self.0 += 1;
    }
}

fn arb_kind() -> impl Strategy<Value = RockKind> {
    prop::sample::select(RockKind::ALL.to_vec())
}

fn arb_intent() -> impl Strategy<Value = Intent> {
    prop_oneof![
        4 => (0..MATCH_SIZE, 0..MATCH_SIZE).prop_map(|(x, y)| Intent::SelectCell { x, y }),
        2 => (-1..=1i32).prop_map(|dx| Intent::Move { dx }),
        1 => prop_oneof![Just(RotateDir::Cw), Just(RotateDir::Ccw)].prop_map(Intent::Rotate),
        1 => Just(Intent::SoftDrop),
        2 => Just(Intent::HardDrop),
        1 => Just(Intent::ToggleEmpowerMode),
        1 => Just(Intent::ToggleRouteMode),
        2 => (0..40usize).prop_map(|index| Intent::PlaceOrSelectFlowNode { index }),
        1 => Just(Intent::StabilizeRoute),
        1 => Just(Intent::TriggerShift),
    ]
}

fn arb_frames() -> impl Strategy<Value = Vec<(Vec<Intent>, u64)>> {
    prop::collection::vec(
        (prop::collection::vec(arb_intent(), 0..3), 0..400u64),
        1..120,
    )
}

/// Random debris in the lower half of the stack
fn arb_debris() -> impl Strategy<Value = Vec<(i32, i32, RockKind)>> {
    prop::collection::vec(
        (0..STACK_WIDTH, STACK_HEIGHT / 2..STACK_HEIGHT, arb_kind()),
        0..60,
    )
}

proptest! {
    #[test]
    fn prop_generated_board_has_no_runs(seed in any::<u64>()) {
        let mut rng = Pcg32::seed_from_u64(seed);
        let grid = MatchGrid::generate(&mut rng);
        prop_assert!(grid.find_runs().is_empty());
        prop_assert!(grid.rows().flatten().all(Option::is_some));
    }

    #[test]
    fn prop_rotation_is_all_or_nothing(
        kind in arb_kind(),
        debris in arb_debris(),
        lift in 0..12i32,
        dx in -3..=5i32,
        cw in any::<bool>(),
    ) {
        let mut stack = PieceStack::new(INITIAL_DROP_MS);
        for (x, y, k) in debris {
            stack.set(IVec2::new(x, y), Some(k));
        }
        stack.enqueue(kind, 0);
        stack.spawn_next(0);
        prop_assume!(stack.active.is_some());
        let _ = stack.move_by(dx);
        for _ in 0..lift {
            if stack.soft_drop(0).is_err() || stack.active.is_none() {
                break;
            }
        }
        prop_assume!(stack.active.is_some());

        let before = stack.active;
        let board: Vec<Vec<Option<RockKind>>> = stack.rows().map(<[_]>::to_vec).collect();
        let dir = if cw { RotateDir::Cw } else { RotateDir::Ccw };
        match stack.rotate(dir) {
            Ok(_) => {
                let piece = stack.active.unwrap();
                prop_assert_eq!(piece.rotation, dir.apply(before.unwrap().rotation));
                prop_assert!(!stack.collides(&piece));
            }
            Err(_) => prop_assert_eq!(stack.active, before),
        }
        let after: Vec<Vec<Option<RockKind>>> = stack.rows().map(<[_]>::to_vec).collect();
        prop_assert_eq!(board, after);
    }

    #[test]
    fn prop_bounds_hold_under_random_play(seed in any::<u64>(), frames in arb_frames()) {
        let mut state = GameState::new(seed);
        let mut audio = CueRecorder::default();
        let mut reporter = CountingReporter::default();
        let mut last_score = 0;
        let mut last_now = 0;

        for (intents, dt) in frames {
            tick(&mut state, &TickInput::new(intents), dt);
            state.dispatch(&mut audio, &mut reporter);

            for (_, level) in state.economy.levels() {
                prop_assert!(level <= METER_MAX);
            }
            let integrity = state.integrity.value();
            prop_assert!((0.0..=INTEGRITY_MAX).contains(&integrity));
            prop_assert!(state.run.score >= last_score);
            prop_assert!(state.now() >= last_now);
            prop_assert!(state.feed.len() <= EVENT_FEED_CAPACITY);
            prop_assert!(state.combo.multiplier <= COMBO_MAX_MULTIPLIER);
            last_score = state.run.score;
            last_now = state.now();
        }
        prop_assert_eq!(reporter.0, usize::from(state.is_game_over()));
    }
}
