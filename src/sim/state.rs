//! Reactor state: the orchestrator that owns every grid and meter
//!
//! Nothing outside `GameState` holds a reference into the grids. Components
//! are driven through method calls that return reports, and the state routes
//! those reports to the other components (see `routing.rs`).

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::clock::Clock;
use super::combo::ComboEngine;
use super::economy::Economy;
use super::flow::{FlowNetwork, SchematicQueue};
use super::integrity::IntegrityModel;
use super::kinds::Infusion;
use super::match_grid::MatchGrid;
use super::piece_stack::PieceStack;
use super::rejection::Rejection;
use crate::audio::{AudioCue, CueSink};
use crate::highscores::{RunMeta, RunReporter};
use crate::settings::Settings;

/// Run-level phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    /// Accepting input and advancing timers
    Playing,
    /// Run ended; only restart is honoured
    GameOver,
}

/// Inputs to the run phase table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTransition {
    /// Integrity depleted or stack overflow
    Fatal,
    Restart,
}

impl RunPhase {
    pub fn next(self, event: RunTransition) -> Option<RunPhase> {
        match (self, event) {
            (RunPhase::Playing, RunTransition::Fatal) => Some(RunPhase::GameOver),
            (_, RunTransition::Restart) => Some(RunPhase::Playing),
            (RunPhase::GameOver, RunTransition::Fatal) => None,
        }
    }
}

/// Run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub score: u64,
    pub lines_cleared: u32,
    pub circuits_completed: u32,
}

/// Feed entry tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedTone {
    Info,
    Rejected,
}

/// User-facing feed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    pub at_ms: u64,
    pub tone: FeedTone,
    pub message: String,
}

/// Bounded message feed, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFeed {
    entries: VecDeque<GameEvent>,
    capacity: usize,
}

impl EventFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, at_ms: u64, tone: FeedTone, message: impl Into<String>) {
        self.entries.push_front(GameEvent {
            at_ms,
            tone,
            message: message.into(),
        });
        self.entries.truncate(self.capacity);
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&GameEvent> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Final result waiting for the scoring collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub final_score: u64,
    pub meta: RunMeta,
}

/// Collaborator-bound output, drained by [`GameState::dispatch`]
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    pub cues: Vec<AudioCue>,
    pub report: Option<RunReport>,
}

/// Complete reactor state (deterministic for a given seed and intent stream)
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub(crate) rng: Pcg32,
    pub clock: Clock,
    pub phase: RunPhase,
    pub run: RunState,
    pub match_grid: MatchGrid,
    pub stack: PieceStack,
    pub flow: FlowNetwork,
    pub schematics: SchematicQueue,
    pub economy: Economy,
    pub combo: ComboEngine,
    pub integrity: IntegrityModel,
    /// Next cell selection empowers instead of selecting
    pub empower_mode: bool,
    /// Infusions still looking for a tile
    pub pending_infusions: Vec<Infusion>,
    pub feed: EventFeed,
    pub outbox: Outbox,
    settings: Settings,
}

impl GameState {
    /// Create a new run with default settings
    pub fn new(seed: u64) -> Self {
        Self::with_settings(seed, &Settings::default())
    }

    pub fn with_settings(seed: u64, settings: &Settings) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let match_grid = MatchGrid::generate(&mut rng);
        log::info!("New reactor run (seed {})", seed);
        Self {
            seed,
            rng,
            clock: Clock::new(),
            phase: RunPhase::Playing,
            run: RunState::default(),
            match_grid,
            stack: PieceStack::new(settings.initial_drop_ms),
            flow: FlowNetwork::new(settings.stabilize_cooldown_ms),
            schematics: SchematicQueue::new(),
            economy: Economy::new(),
            combo: ComboEngine::new(settings.combo_decay_ms),
            integrity: IntegrityModel::new(),
            empower_mode: false,
            pending_infusions: Vec::new(),
            feed: EventFeed::new(settings.feed_capacity),
            outbox: Outbox::default(),
            settings: settings.clone(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.phase == RunPhase::GameOver
    }

    /// Rejects every mutating intent once the run has ended
    pub(crate) fn ensure_playing(&self) -> Result<(), Rejection> {
        if self.is_game_over() {
            Err(Rejection::GameOver)
        } else {
            Ok(())
        }
    }

    pub(crate) fn cue(&mut self, cue: AudioCue) {
        if self.settings.cues_enabled {
            self.outbox.cues.push(cue);
        }
    }

    pub(crate) fn note(&mut self, message: impl Into<String>) {
        let now = self.now();
        self.feed.push(now, FeedTone::Info, message);
    }

    /// Surface a refused intent to the player
    pub fn note_rejection(&mut self, reason: &Rejection) {
        log::debug!("rejected ({}): {}", reason.code(), reason);
        let now = self.now();
        self.feed.push(now, FeedTone::Rejected, reason.to_string());
    }

    pub fn run_meta(&self) -> RunMeta {
        RunMeta {
            lines: self.run.lines_cleared,
            circuits: self.run.circuits_completed,
            max_combo: self.combo.max_streak,
        }
    }

    /// Enter game over. Halts every timer and queues the run report. Calling
    /// it again in the same run does nothing.
    pub(crate) fn end_run(&mut self, cause: &str) {
        let Some(next) = self.phase.next(RunTransition::Fatal) else {
            return;
        };
        self.phase = next;
        self.stack.halt();
        self.empower_mode = false;
        self.outbox.report = Some(RunReport {
            final_score: self.run.score,
            meta: self.run_meta(),
        });
        self.cue(AudioCue::GameOver);
        self.note(format!("Reactor critical: {}. Final score {}.", cause, self.run.score));
        log::info!(
            "Run over ({}): score {}, {} lines, {} circuits",
            cause,
            self.run.score,
            self.run.lines_cleared,
            self.run.circuits_completed
        );
    }

    /// Rebuild every component from scratch with a fresh seed drawn from the
    /// current stream. Undelivered collaborator output is kept.
    pub fn restart(&mut self) {
        let seed: u64 = self.rng.random();
        let outbox = std::mem::take(&mut self.outbox);
        let settings = self.settings.clone();
        *self = Self::with_settings(seed, &settings);
        self.outbox = outbox;
        if let Some(next) = self.phase.next(RunTransition::Restart) {
            self.phase = next;
        }
        self.note("Reactor restarted.");
    }

    /// Hand queued cues and the run report to the collaborators. The report
    /// is delivered at most once per run.
    pub fn dispatch(&mut self, audio: &mut dyn CueSink, scores: &mut dyn RunReporter) {
        for cue in self.outbox.cues.drain(..) {
            audio.play(cue);
        }
        if let Some(report) = self.outbox.report.take() {
            scores.report_run(report.final_score, report.meta);
        }
    }
}
