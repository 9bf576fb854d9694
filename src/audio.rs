//! Audio cue interface
//!
//! The engine never plays sound itself. It emits named cues and the host
//! hands them to whatever player it has.

use serde::{Deserialize, Serialize};

/// Sound cue types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioCue {
    /// Swap formed one or more runs
    Match,
    /// Swap formed nothing and was undone
    Dud,
    /// Piece locked without clearing a row
    Lock,
    /// Piece locked and cleared rows
    LineClear,
    /// Streak reset
    ComboBreak,
    /// A well reached a conduit
    Circuit,
    /// An infusion landed on a rock
    Infusion,
    /// Tile empowered
    Empower,
    /// Shift actuated
    Shift,
    /// Route stabilized
    Stabilize,
    /// Run ended
    GameOver,
}

impl AudioCue {
    /// Event name handed to the audio player
    pub fn name(&self) -> &'static str {
        match self {
            AudioCue::Match => "match",
            AudioCue::Dud => "dud",
            AudioCue::Lock => "lock",
            AudioCue::LineClear => "lineClear",
            AudioCue::ComboBreak => "comboBreak",
            AudioCue::Circuit => "circuit",
            AudioCue::Infusion => "infusion",
            AudioCue::Empower => "empower",
            AudioCue::Shift => "shift",
            AudioCue::Stabilize => "stabilize",
            AudioCue::GameOver => "gameOver",
        }
    }
}

/// Receives cues in the order they were raised
pub trait CueSink {
    fn play(&mut self, cue: AudioCue);
}

/// Sink that writes cues to the log
#[derive(Debug, Default)]
pub struct LogSink {
    muted: bool,
}

impl LogSink {
    pub fn new(muted: bool) -> Self {
        Self { muted }
    }
}

impl CueSink for LogSink {
    fn play(&mut self, cue: AudioCue) {
        if !self.muted {
            log::info!("cue: {}", cue.name());
        }
    }
}

/// Sink that keeps every cue it receives
#[derive(Debug, Default, Clone)]
pub struct CueRecorder {
    pub played: Vec<AudioCue>,
}

impl CueSink for CueRecorder {
    fn play(&mut self, cue: AudioCue) {
        self.played.push(cue);
    }
}
