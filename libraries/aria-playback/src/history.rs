//! Play history tracking
//!
//! Bounded stack of previously played tracks, used by "previous" while
//! shuffling so the user walks back through what they actually heard.

use aria_core::TrackId;
use std::collections::VecDeque;

/// Play history with bounded size
///
/// Oldest entries are discarded once the history is full.
#[derive(Debug, Clone)]
pub struct PlayHistory {
    /// History buffer (most recent = back)
    tracks: VecDeque<TrackId>,

    /// Maximum history size
    max_size: usize,
}

impl PlayHistory {
    /// Create new history with specified maximum size
    pub fn new(max_size: usize) -> Self {
        Self {
            tracks: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Record a track that was left behind
    ///
    /// If history is full, oldest track is discarded
    pub fn push(&mut self, track: TrackId) {
        if self.max_size == 0 {
            return;
        }
        if self.tracks.len() >= self.max_size {
            self.tracks.pop_front();
        }
        self.tracks.push_back(track);
    }

    /// Most recent track, without removing it
    pub fn peek(&self) -> Option<&TrackId> {
        self.tracks.back()
    }

    /// Pop most recent track for "previous"
    pub fn pop(&mut self) -> Option<TrackId> {
        self.tracks.pop_back()
    }

    /// Number of tracks in history
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if history is empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Maximum history size
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Default for PlayHistory {
    fn default() -> Self {
        Self::new(50)
    }
}
