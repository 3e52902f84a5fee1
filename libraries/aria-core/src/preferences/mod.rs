//! Preferences boundary
//!
//! The engine reads effect and playback settings on init and writes them on
//! every mutation. Values are stored as JSON keyed by string, so any store
//! (in-memory, file, database) can back it.
//!
//! # Example
//!
//! ```rust
//! use aria_core::preferences::{keys, MemoryPreferences, PreferencesExt};
//!
//! let prefs = MemoryPreferences::new();
//! prefs.put(keys::PLAYBACK_GAPLESS, &false).unwrap();
//! assert_eq!(prefs.fetch::<bool>(keys::PLAYBACK_GAPLESS), Some(false));
//! ```

mod file;
mod memory;

pub use file::JsonFilePreferences;
pub use memory::MemoryPreferences;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Setting key constants
pub mod keys {
    /// Bass level in dB (-10..=10)
    pub const EFFECTS_BASS_LEVEL: &str = "effects.bass_level";

    /// Treble level in dB (-10..=10)
    pub const EFFECTS_TREBLE_LEVEL: &str = "effects.treble_level";

    /// Reverb on/off
    pub const EFFECTS_REVERB_ENABLED: &str = "effects.reverb_enabled";

    /// Reverb amount (0..=100)
    pub const EFFECTS_REVERB_LEVEL: &str = "effects.reverb_level";

    /// Name of the last applied equalizer preset
    pub const EFFECTS_EQUALIZER_PRESET: &str = "effects.equalizer_preset";

    /// Five-element equalizer band array in dB
    pub const EFFECTS_EQUALIZER_BANDS: &str = "effects.equalizer_bands";

    /// Audio quality ("low", "normal", "high", "lossless")
    pub const PLAYBACK_AUDIO_QUALITY: &str = "playback.audio_quality";

    /// Crossfade length in seconds
    pub const PLAYBACK_CROSSFADE_SECONDS: &str = "playback.crossfade_seconds";

    /// Gapless playback flag
    pub const PLAYBACK_GAPLESS: &str = "playback.gapless";

    /// Sleep timer length in minutes
    pub const PLAYBACK_SLEEP_TIMER_MINUTES: &str = "playback.sleep_timer_minutes";

    /// Output volume (0.0..=1.0)
    pub const PLAYBACK_VOLUME: &str = "playback.volume";

    /// Repeat mode ("off", "all", "one")
    pub const PLAYBACK_REPEAT_MODE: &str = "playback.repeat_mode";

    /// Shuffle flag
    pub const PLAYBACK_SHUFFLE_ENABLED: &str = "playback.shuffle_enabled";
}

/// Key/value preferences store
///
/// Implementations must be cheap to call from the engine loop; writes happen
/// on every setting change.
pub trait Preferences: Send + Sync {
    /// Read a raw value, `None` if the key was never written
    fn get_value(&self, key: &str) -> Option<Value>;

    /// Write a raw value
    fn set_value(&self, key: &str, value: Value) -> crate::Result<()>;
}

/// Typed helpers over any [`Preferences`] store
pub trait PreferencesExt {
    /// Read and decode a value; undecodable values read as missing
    fn fetch<T: DeserializeOwned>(&self, key: &str) -> Option<T>;

    /// Encode and write a value
    fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> crate::Result<()>;
}

impl<P: Preferences + ?Sized> PreferencesExt for P {
    fn fetch<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::debug!("Ignoring unreadable preference {}: {}", key, e);
                None
            }
        }
    }

    fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> crate::Result<()> {
        self.set_value(key, serde_json::to_value(value)?)
    }
}
