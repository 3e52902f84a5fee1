//! Aria Playback - single-session playback engine
//!
//! This crate provides:
//! - [`PlaybackEngine`]: the transport state machine (play, pause, seek,
//!   next/previous, completion handling) running as one tokio task
//! - [`PlaybackHandle`]: the cloneable caller API, with snapshots published
//!   on a watch channel and discrete [`PlaybackEvent`]s on a broadcast channel
//! - [`QueueManager`] and [`ShuffleQueue`]: repeat/shuffle track resolution
//!   with a bounded anti-repetition window
//! - The [`Decoder`] / [`DecoderBackend`] boundary that platform audio output
//!   plugs into
//!
//! # Example
//!
//! ```rust,ignore
//! use aria_playback::{EngineConfig, PlaybackEngine};
//!
//! let handle = PlaybackEngine::start(config, backend, effects, prefs);
//! handle.set_playlist(tracks, 0).await;
//!
//! let mut snapshots = handle.subscribe();
//! while snapshots.changed().await.is_ok() {
//!     let snapshot = snapshots.borrow().clone();
//!     println!("{} {:.0}%", snapshot.state, snapshot.progress() * 100.0);
//! }
//! ```

mod decoder;
mod engine;
mod error;
mod events;
mod handle;
mod history;
mod progress;
mod queue;
mod shuffle;
mod types;

pub use decoder::{Decoder, DecoderBackend, DecoderEvent, DecoderEvents};
pub use engine::PlaybackEngine;
pub use error::{PlaybackError, Result};
pub use events::PlaybackEvent;
pub use handle::PlaybackHandle;
pub use history::PlayHistory;
pub use progress::ProgressReporter;
pub use queue::{Advance, QueueManager};
pub use shuffle::{ShuffleQueue, DEFAULT_SHUFFLE_HISTORY};
pub use types::{EngineConfig, EngineState, PlaybackSnapshot};
