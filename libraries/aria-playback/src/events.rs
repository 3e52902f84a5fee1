//! Playback Events
//!
//! Event stream for observers that need edges rather than state:
//! - State changes (idle/preparing/playing/paused)
//! - Track changes
//! - Position updates (every progress tick)
//! - Natural track completion
//! - Queue replacement
//! - Errors absorbed by the engine

use crate::types::EngineState;
use aria_core::TrackId;
use serde::{Deserialize, Serialize};

/// Events emitted by the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Engine state changed
    StateChanged {
        /// The new state
        state: EngineState,
    },

    /// A different track was loaded
    TrackChanged {
        /// ID of the new track
        track_id: TrackId,
        /// ID of the track it replaced
        previous_track_id: Option<TrackId>,
    },

    /// Position update
    PositionUpdate {
        /// Current position
        position_ms: u64,
        /// Total duration
        duration_ms: u64,
    },

    /// Track played to its end
    TrackCompleted {
        /// ID of the finished track
        track_id: TrackId,
    },

    /// Queue replaced
    QueueChanged {
        /// New queue length
        length: usize,
        /// Index of the current track
        current_index: Option<usize>,
    },

    /// Error absorbed by the engine
    Error {
        /// Error message
        message: String,
    },
}

impl PlaybackEvent {
    /// Short event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::StateChanged { .. } => "state_changed",
            Self::TrackChanged { .. } => "track_changed",
            Self::PositionUpdate { .. } => "position_update",
            Self::TrackCompleted { .. } => "track_completed",
            Self::QueueChanged { .. } => "queue_changed",
            Self::Error { .. } => "error",
        }
    }
}
