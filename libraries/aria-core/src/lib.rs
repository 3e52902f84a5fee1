//! Aria Core
//!
//! Platform-agnostic core types and the preferences boundary shared by the
//! Aria playback and effects crates.
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `TrackId`, `AudioLocator`, `RepeatMode`
//! - **Settings**: `PlaybackSettings`, `AudioQuality`
//! - **Preferences**: the `Preferences` trait plus in-memory and JSON file stores
//!
//! # Example
//!
//! ```rust
//! use aria_core::preferences::{keys, MemoryPreferences, PreferencesExt};
//! use aria_core::types::{AudioLocator, Track};
//!
//! let track = Track::new("t1", "Blue in Green", "Miles Davis", AudioLocator::path("/music/blue.flac"));
//! assert_eq!(track.id.as_str(), "t1");
//!
//! let prefs = MemoryPreferences::new();
//! prefs.put(keys::EFFECTS_BASS_LEVEL, &4.0_f32).unwrap();
//! assert_eq!(prefs.fetch::<f32>(keys::EFFECTS_BASS_LEVEL), Some(4.0));
//! ```

mod error;
pub mod preferences;
pub mod types;

pub use error::{PreferencesError, Result};
pub use preferences::{Preferences, PreferencesExt};
pub use types::{AudioLocator, AudioQuality, PlaybackSettings, RepeatMode, Track, TrackId};
