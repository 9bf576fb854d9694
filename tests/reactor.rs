//! End-to-end reactor behaviour driven through `tick` and intents

use glam::IVec2;

use rock_reactor::audio::{AudioCue, CueRecorder};
use rock_reactor::consts::*;
use rock_reactor::sim::flow::{FlowNetwork, NodeKind};
use rock_reactor::sim::{
    GameSnapshot, GameState, Infusion, IntegrityModel, Intent, MatchGrid, Meter, Rejection,
    RockKind, RunPhase, StackPhase, TickInput, apply_intent, tick,
};
use rock_reactor::{RunMeta, RunReporter};

#[derive(Default)]
struct Reports(Vec<(u64, RunMeta)>);

impl RunReporter for Reports {
    fn report_run(&mut self, final_score: u64, meta: RunMeta) {
        self.0.push((final_score, meta));
    }
}

fn staged_state(seed: u64) -> GameState {
    use RockKind::{Crystal as C, Igneous as I, Metamorphic as M, Sedimentary as S};
    let mut state = GameState::new(seed);
    state.match_grid = MatchGrid::from_kinds([
        [S, S, I, M, C, I],
        [I, M, S, C, I, M],
        [M, C, I, S, M, C],
        [C, I, M, C, S, I],
        [S, M, C, I, C, M],
        [I, C, S, M, I, S],
    ]);
    state
}

/// Spawn a crystal and wedge it so its next downward step collides
fn crystal_resting_on_blockers(state: &mut GameState) {
    state.stack.set(IVec2::new(SPAWN_X + 1, 2), Some(RockKind::Igneous));
    state.stack.set(IVec2::new(SPAWN_X + 2, 2), Some(RockKind::Igneous));
    state.stack.enqueue(RockKind::Crystal, 0);
    tick(state, &TickInput::idle(), 0);
    assert_eq!(state.stack.phase, StackPhase::PieceActive);
}

#[test]
fn test_integrity_six_empty_lock_ends_run_and_halts_gravity() {
    let mut state = GameState::new(21);
    crystal_resting_on_blockers(&mut state);
    state.integrity = IntegrityModel::with_value(6.0);

    tick(&mut state, &TickInput::new([Intent::SoftDrop]), 16);
    assert_eq!(state.integrity.value(), 0.0);
    assert_eq!(state.phase, RunPhase::GameOver);

    // Nothing moves any more
    state.stack.enqueue(RockKind::Igneous, 0);
    let before = GameSnapshot::capture(&state);
    for _ in 0..200 {
        tick(&mut state, &TickInput::idle(), 50);
    }
    let after = GameSnapshot::capture(&state);
    assert_eq!(before.stack_board, after.stack_board);
    assert_eq!(before.active, after.active);
    assert_eq!(before.now_ms, after.now_ms);
    assert!(state.stack.active.is_none());
}

#[test]
fn test_stack_overflow_ends_run() {
    let mut state = GameState::new(22);
    state
        .stack
        .set(IVec2::new(SPAWN_X + 1, SPAWN_Y + 1), Some(RockKind::Sedimentary));
    state.stack.enqueue(RockKind::Crystal, 0);
    tick(&mut state, &TickInput::idle(), 16);
    assert!(state.is_game_over());
    assert!(state.outbox.report.is_some());
}

#[test]
fn test_report_delivered_exactly_once() {
    let mut state = GameState::new(23);
    crystal_resting_on_blockers(&mut state);
    state.integrity = IntegrityModel::with_value(1.0);
    state.run.score = 480;

    let mut audio = CueRecorder::default();
    let mut reports = Reports::default();
    for i in 0..50 {
        let input = if i == 0 {
            TickInput::new([Intent::HardDrop])
        } else {
            TickInput::new([Intent::HardDrop, Intent::SoftDrop, Intent::TriggerShift])
        };
        tick(&mut state, &input, 16);
        state.dispatch(&mut audio, &mut reports);
    }
    assert_eq!(reports.0.len(), 1);
    assert_eq!(reports.0[0].0, 480);
    assert_eq!(
        audio.played.iter().filter(|c| **c == AudioCue::GameOver).count(),
        1
    );
}

#[test]
fn test_empower_at_earth_nineteen_is_rejected() {
    let mut state = staged_state(24);
    state.economy.credit(Meter::Earth, 19);
    state.economy.credit(Meter::Water, 30);

    let result = apply_intent(&mut state, Intent::ToggleEmpowerMode);
    assert!(matches!(
        result,
        Err(Rejection::InsufficientFunds {
            meter: Meter::Earth,
            needed: EMPOWER_EARTH_COST,
            available: 19
        })
    ));
    assert!(!state.empower_mode);
    assert_eq!(state.economy.level(Meter::Earth), 19);
    assert_eq!(state.economy.level(Meter::Water), 30);
    assert!(state.match_grid.rows().flatten().flatten().all(|t| !t.empowered));
}

#[test]
fn test_lock_clearing_rows_drafts_matching_schematics() {
    let mut state = GameState::new(25);
    state.integrity = IntegrityModel::with_value(40.0);
    let bottom = STACK_HEIGHT - 1;
    for y in [bottom - 1, bottom] {
        for x in 0..STACK_WIDTH {
            if x != SPAWN_X + 1 && x != SPAWN_X + 2 {
                state.stack.set(IVec2::new(x, y), Some(RockKind::Metamorphic));
            }
        }
    }
    state.stack.enqueue(RockKind::Crystal, 0);
    tick(&mut state, &TickInput::idle(), 0);

    let score_before = state.run.score;
    let integrity_before = state.integrity.value();
    tick(&mut state, &TickInput::new([Intent::HardDrop]), 0);

    assert_eq!(state.schematics.len(), 2);
    assert!(state.schematics.iter().all(|s| s.kind == RockKind::Crystal));
    assert_eq!(state.combo.streak, 2);
    assert!(state.run.score > score_before);
    assert!(state.integrity.value() > integrity_before);

    // Rows stay marked until the settle window closes
    assert_eq!(state.stack.marked_rows(), &[bottom - 1, bottom]);
    tick(&mut state, &TickInput::idle(), LINE_SETTLE_MS);
    assert!(state.stack.marked_rows().is_empty());
    assert!((0..STACK_WIDTH).all(|x| state.stack.get(IVec2::new(x, bottom)).is_none()));
}

#[test]
fn test_circuit_credits_and_infuses() {
    let mut state = GameState::new(26);
    state.schematics.draft(RockKind::Igneous, 0, 1);

    // The T footprint at node 3 joins well 2 to conduit 9
    tick(
        &mut state,
        &TickInput::new([Intent::PlaceOrSelectFlowNode { index: 3 }]),
        16,
    );
    assert_eq!(state.run.circuits_completed, 1);
    assert_eq!(state.economy.level(Meter::Fire), CIRCUIT_CREDIT + CIRCUIT_FIRE_CREDIT);
    assert_eq!(state.run.score, CIRCUIT_SCORE);
    assert!(state.pending_infusions.is_empty());
    let volcanic = state
        .match_grid
        .rows()
        .flatten()
        .flatten()
        .filter(|t| t.infusion == Some(Infusion::Volcanic))
        .count();
    assert_eq!(volcanic, 1);
    for i in [3, 4, 5, 10] {
        assert_eq!(state.flow.node(i).unwrap().kind, NodeKind::Bridge);
    }
}

/// Infusions stamped on the board plus those still waiting for a tile
fn infusions_issued(state: &GameState) -> usize {
    let stamped = state
        .match_grid
        .rows()
        .flatten()
        .flatten()
        .filter(|t| t.infusion.is_some())
        .count();
    stamped + state.pending_infusions.len()
}

#[test]
fn test_bridge_to_two_conduits_is_a_single_circuit() {
    let mut state = GameState::new(30);
    state.flow = FlowNetwork::with_layout(&[6], &[3, 14]);
    state.schematics.draft(RockKind::Crystal, 0, 1);

    tick(
        &mut state,
        &TickInput::new([Intent::PlaceOrSelectFlowNode { index: 1 }]),
        16,
    );
    assert_eq!(state.run.circuits_completed, 1);
    assert_eq!(infusions_issued(&state), 1);
    assert_eq!(state.run.score, CIRCUIT_SCORE);
    assert_eq!(state.economy.level(Meter::Shift), CIRCUIT_CREDIT);
}

#[test]
fn test_isolated_well_joining_live_network_is_a_single_circuit() {
    let mut state = GameState::new(31);
    state.flow = FlowNetwork::with_layout(&[0, 35], &[14]);
    state.schematics.draft(RockKind::Crystal, 0, 3);

    let place = |state: &mut GameState, index| {
        tick(
            state,
            &TickInput::new([Intent::PlaceOrSelectFlowNode { index }]),
            16,
        );
    };
    place(&mut state, 1);
    place(&mut state, 20);
    assert_eq!(state.run.circuits_completed, 1);
    assert_eq!(infusions_issued(&state), 1);

    place(&mut state, 22);
    assert_eq!(state.run.circuits_completed, 2);
    assert_eq!(infusions_issued(&state), 2);
    assert!(state.schematics.is_empty());
}

#[test]
fn test_rejected_placement_leaves_economy_and_run_untouched() {
    let mut state = GameState::new(27);
    state.schematics.draft(RockKind::Crystal, 0, 1);
    state.economy.credit(Meter::Water, 33);
    let meters = state.economy.levels();
    let run = state.run;

    let result = apply_intent(&mut state, Intent::PlaceOrSelectFlowNode { index: 35 });
    assert_eq!(result, Err(Rejection::PlacementOutOfBounds));
    assert_eq!(state.economy.levels(), meters);
    assert_eq!(state.run, run);
    assert_eq!(state.schematics.len(), 1);
}

#[test]
fn test_match_feeds_the_stack() {
    let mut state = staged_state(28);
    tick(
        &mut state,
        &TickInput::new([
            Intent::SelectCell { x: 2, y: 0 },
            Intent::SelectCell { x: 2, y: 1 },
        ]),
        16,
    );
    // The enqueued piece spawned in the same tick
    assert_eq!(state.stack.active.map(|p| p.kind), Some(RockKind::Sedimentary));
    assert!(state.match_grid.is_resolving());

    // Swaps are refused until the board settles
    assert_eq!(
        apply_intent(&mut state, Intent::SelectCell { x: 0, y: 0 })
            .and_then(|_| apply_intent(&mut state, Intent::SelectCell { x: 1, y: 0 })),
        Err(Rejection::MatchResolving)
    );
    tick(&mut state, &TickInput::idle(), MATCH_SETTLE_MS);
    assert!(!state.match_grid.is_resolving());
}

#[test]
fn test_restart_after_game_over() {
    let mut state = GameState::new(29);
    crystal_resting_on_blockers(&mut state);
    state.integrity = IntegrityModel::with_value(2.0);
    tick(&mut state, &TickInput::new([Intent::SoftDrop]), 16);
    assert!(state.is_game_over());

    tick(&mut state, &TickInput::new([Intent::Restart]), 16);
    assert_eq!(state.phase, RunPhase::Playing);
    assert_eq!(state.integrity.value(), INTEGRITY_MAX);
    assert!(state.stack.active.is_none());
    assert!(state.schematics.is_empty());
}

#[test]
fn test_same_seed_and_intents_replay_identically() {
    let script = [
        Intent::SelectCell { x: 0, y: 0 },
        Intent::SelectCell { x: 1, y: 0 },
        Intent::SelectCell { x: 3, y: 3 },
        Intent::SelectCell { x: 3, y: 4 },
        Intent::HardDrop,
        Intent::ToggleRouteMode,
    ];
    let run = |seed| {
        let mut state = GameState::new(seed);
        for intent in script {
            tick(&mut state, &TickInput::new([intent]), 300);
        }
        for _ in 0..100 {
            tick(&mut state, &TickInput::idle(), 100);
        }
        GameSnapshot::capture(&state)
    };
    assert_eq!(run(99), run(99));
}
