//! Error types for the playback engine

use thiserror::Error;

/// Playback errors
///
/// These never cross [`PlaybackHandle`](crate::PlaybackHandle): the engine
/// logs them and turns them into state changes and events.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    /// Decoder could not be opened or prepared
    #[error("Preparation failed: {0}")]
    Preparation(String),

    /// Decoder failed after preparation
    #[error("Decoder error: {0}")]
    Decoder(String),

    /// Operation needs a decoder and none is loaded
    #[error("No decoder loaded")]
    NoDecoder,

    /// Engine loop has stopped
    #[error("Playback engine is closed")]
    EngineClosed,
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
