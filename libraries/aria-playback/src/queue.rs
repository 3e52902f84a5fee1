//! Track queue and next/previous resolution
//!
//! Holds the playlist and the current index, and decides which track comes
//! next according to the repeat and shuffle policy. The queue never plays
//! anything itself; the engine asks it for a track and loads it.
//!
//! ```text
//! shuffle off:  next = i + 1, wrapping for All (and One on manual skips)
//!               Off at the last index: no next track
//! shuffle on:   next = ShuffleQueue::next(), never exhausted
//!               previous walks back through PlayHistory
//! ```

use crate::history::PlayHistory;
use crate::shuffle::ShuffleQueue;
use crate::types::EngineConfig;
use aria_core::{RepeatMode, Track, TrackId};
use std::sync::Arc;

/// Why the engine is moving to another track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// User pressed next/previous
    Manual,
    /// The current track finished
    Completion,
}

/// Playlist with a cursor, a shuffle order and a play history
#[derive(Debug, Clone)]
pub struct QueueManager {
    tracks: Vec<Arc<Track>>,
    current_index: Option<usize>,
    shuffle: ShuffleQueue<TrackId>,
    history: PlayHistory,
}

impl QueueManager {
    /// Create an empty queue sized from the engine configuration
    pub fn new(config: &EngineConfig) -> Self {
        let shuffle = match config.shuffle_seed {
            Some(seed) => ShuffleQueue::with_seed(config.shuffle_history, seed),
            None => ShuffleQueue::new(config.shuffle_history),
        };
        Self {
            tracks: Vec::new(),
            current_index: None,
            shuffle,
            history: PlayHistory::new(config.play_history_size),
        }
    }

    /// Replace the playlist and select the start track
    ///
    /// An out-of-range `start_index` selects the first track. Returns the
    /// selected track, `None` for an empty playlist.
    pub fn set_playlist(&mut self, tracks: Vec<Arc<Track>>, start_index: usize) -> Option<Arc<Track>> {
        self.shuffle
            .set_catalog(tracks.iter().map(|track| track.id.clone()));
        self.history.clear();
        self.tracks = tracks;

        if self.tracks.is_empty() {
            self.current_index = None;
            return None;
        }

        let index = if start_index < self.tracks.len() {
            start_index
        } else {
            0
        };
        self.current_index = Some(index);

        let track = Arc::clone(&self.tracks[index]);
        self.shuffle.mark_played(&track.id);
        Some(track)
    }

    /// Point the cursor at a track started directly
    ///
    /// Tracks outside the playlist leave the cursor where it is.
    pub fn select(&mut self, track: &Track) {
        let Some(index) = self.position_of(&track.id) else {
            return;
        };
        if self.current_index == Some(index) {
            return;
        }
        self.leave_current();
        self.current_index = Some(index);
        self.shuffle.mark_played(&track.id);
    }

    /// Move to the next track, `None` when there is none
    pub fn next(&mut self, repeat: RepeatMode, shuffle: bool, advance: Advance) -> Option<Arc<Track>> {
        if self.tracks.is_empty() {
            return None;
        }

        let index = if shuffle {
            let id = self.shuffle.next()?;
            self.position_of(&id)?
        } else {
            let len = self.tracks.len();
            let current = self.current_index.unwrap_or(0);
            let wraps = match repeat {
                RepeatMode::All => true,
                RepeatMode::One => advance == Advance::Manual,
                RepeatMode::Off => false,
            };
            if current + 1 < len {
                current + 1
            } else if wraps {
                0
            } else {
                return None;
            }
        };

        self.leave_current();
        self.current_index = Some(index);
        Some(Arc::clone(&self.tracks[index]))
    }

    /// Move to the previous track, `None` when there is none
    pub fn previous(&mut self, repeat: RepeatMode, shuffle: bool) -> Option<Arc<Track>> {
        if self.tracks.is_empty() {
            return None;
        }

        if shuffle {
            while let Some(id) = self.history.pop() {
                // Entries for tracks that left the playlist are skipped
                if let Some(index) = self.position_of(&id) {
                    self.current_index = Some(index);
                    return Some(Arc::clone(&self.tracks[index]));
                }
            }
        }

        let len = self.tracks.len();
        let current = self.current_index.unwrap_or(0);
        let index = if current > 0 {
            current - 1
        } else if repeat == RepeatMode::Off {
            return None;
        } else {
            len - 1
        };

        self.current_index = Some(index);
        Some(Arc::clone(&self.tracks[index]))
    }

    /// Called when shuffle is switched on
    ///
    /// Starts a fresh cycle that still avoids recently heard tracks.
    pub fn shuffle_enabled(&mut self) {
        self.shuffle.reshuffle();
        if let Some(track) = self.current() {
            self.shuffle.mark_played(&track.id);
        }
    }

    /// Track under the cursor
    pub fn current(&self) -> Option<Arc<Track>> {
        self.current_index
            .and_then(|index| self.tracks.get(index))
            .cloned()
    }

    /// Cursor position
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Check if the cursor is on the last track
    pub fn is_last(&self) -> bool {
        match self.current_index {
            Some(index) => index + 1 >= self.tracks.len(),
            None => true,
        }
    }

    /// Playlist
    pub fn tracks(&self) -> &[Arc<Track>] {
        &self.tracks
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if the playlist is empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Play history used while shuffling
    pub fn history(&self) -> &PlayHistory {
        &self.history
    }

    fn leave_current(&mut self) {
        if let Some(track) = self.current() {
            self.history.push(track.id.clone());
        }
    }

    fn position_of(&self, id: &TrackId) -> Option<usize> {
        self.tracks.iter().position(|track| &track.id == id)
    }
}
