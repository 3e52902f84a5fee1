//! Core types for the playback engine

use aria_core::{PlaybackSettings, RepeatMode, Track};
use aria_effects::EffectsState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EngineState {
    /// No decoder, or the last one failed
    #[default]
    Idle,
    /// Decoder opened, waiting for it to report ready
    Preparing,
    /// Audio is playing
    Playing,
    /// Paused mid-track, or stopped at the end of the queue
    Paused,
}

impl EngineState {
    /// Short lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Preparing => "preparing",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Progress sampling period while playing (default: 100 ms)
    pub progress_interval_ms: u64,

    /// Shuffle anti-repetition window (default: 3)
    pub shuffle_history: usize,

    /// Past this position, "previous" restarts the track (default: 3000 ms)
    pub restart_threshold_ms: u64,

    /// Tracks remembered for "previous" while shuffling (default: 50)
    pub play_history_size: usize,

    /// Volume used when none is stored (default: 1.0)
    pub initial_volume: f32,

    /// Fixed shuffle seed, random when unset
    pub shuffle_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: 100,
            shuffle_history: 3,
            restart_threshold_ms: 3000,
            play_history_size: 50,
            initial_volume: 1.0,
            shuffle_seed: None,
        }
    }
}

impl EngineConfig {
    /// Progress interval as a duration
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Check value ranges
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.progress_interval_ms == 0 {
            return Err("progress_interval_ms must be greater than 0".to_string());
        }
        if self.play_history_size == 0 {
            return Err("play_history_size must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(format!(
                "initial_volume must be within 0.0..=1.0, got {}",
                self.initial_volume
            ));
        }
        Ok(())
    }
}

/// Published engine state
///
/// One immutable value is broadcast after every change; subscribers never
/// see a partially applied command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    /// Track loaded in the decoder (kept after a failed preparation)
    pub current_track: Option<Arc<Track>>,

    /// Lifecycle state
    pub state: EngineState,

    /// Audio is audible right now
    pub is_playing: bool,

    /// Last sampled or requested position
    pub position_ms: u64,

    /// Duration reported by the decoder, 0 until known
    pub duration_ms: u64,

    /// Repeat policy
    pub repeat_mode: RepeatMode,

    /// Shuffle policy
    pub shuffle_enabled: bool,

    /// Output volume handed to the decoder
    pub volume: f32,

    /// Effect settings
    pub effects: EffectsState,

    /// Persisted playback settings
    pub settings: PlaybackSettings,

    /// Time left on the sleep timer, `None` when unarmed
    pub sleep_timer_remaining_ms: Option<u64>,

    /// Tracks in the queue
    pub queue_length: usize,

    /// Queue position of the current track
    pub queue_index: Option<usize>,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            current_track: None,
            state: EngineState::Idle,
            is_playing: false,
            position_ms: 0,
            duration_ms: 0,
            repeat_mode: RepeatMode::Off,
            shuffle_enabled: false,
            volume: 1.0,
            effects: EffectsState::default(),
            settings: PlaybackSettings::default(),
            sleep_timer_remaining_ms: None,
            queue_length: 0,
            queue_index: None,
        }
    }
}

impl PlaybackSnapshot {
    /// Playback progress in `0.0..=1.0`, 0 when the duration is unknown
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.position_ms as f32 / self.duration_ms as f32).clamp(0.0, 1.0)
    }
}
