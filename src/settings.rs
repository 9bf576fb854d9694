//! Engine settings
//!
//! Persisted as JSON next to the high score file. Every field falls back to
//! its default when missing, so older files keep loading.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{COMBO_DECAY_MS, EVENT_FEED_CAPACITY, INITIAL_DROP_MS, STABILIZE_COOLDOWN_MS};

/// Errors reading or writing settings and other engine JSON files
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Engine settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fixed run seed; `None` lets the host pick one
    pub seed: Option<u64>,

    // === Timing ===
    /// Gravity interval at run start (ms)
    pub initial_drop_ms: u64,
    /// Combo decay window (ms)
    pub combo_decay_ms: u64,
    /// Route stabilizer cooldown (ms)
    pub stabilize_cooldown_ms: u64,

    // === Feedback ===
    /// Entries kept in the event feed
    pub feed_capacity: usize,
    /// Forward audio cues to the sink
    pub cues_enabled: bool,

    /// Leaderboard file
    pub high_score_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: None,
            initial_drop_ms: INITIAL_DROP_MS,
            combo_decay_ms: COMBO_DECAY_MS,
            stabilize_cooldown_ms: STABILIZE_COOLDOWN_MS,
            feed_capacity: EVENT_FEED_CAPACITY,
            cues_enabled: true,
            high_score_path: PathBuf::from("rock_reactor_scores.json"),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path.as_ref())?;
        let settings = serde_json::from_str(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Read settings, falling back to defaults on any failure
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load_from(path.as_ref()) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Using default settings: {}", e);
                Self::default()
            }
        }
    }

    /// Write settings as pretty JSON
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rock_reactor_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_defaults_match_consts() {
        let s = Settings::default();
        assert_eq!(s.initial_drop_ms, INITIAL_DROP_MS);
        assert_eq!(s.feed_capacity, EVENT_FEED_CAPACITY);
        assert!(s.cues_enabled);
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("settings_roundtrip");
        let settings = Settings {
            seed: Some(42),
            initial_drop_ms: 700,
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_path("settings_partial");
        fs::write(&path, r#"{ "combo_decay_ms": 2500 }"#).unwrap();
        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.combo_decay_ms, 2500);
        assert_eq!(loaded.stabilize_cooldown_ms, STABILIZE_COOLDOWN_MS);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        let path = temp_path("settings_bad");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(SettingsError::Json(_))));
        assert_eq!(Settings::load_or_default(&path), Settings::default());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = temp_path("settings_missing_never_written");
        assert!(matches!(Settings::load_from(&path), Err(SettingsError::Io(_))));
    }
}
