//! Persisted playback settings

use crate::preferences::{keys, Preferences, PreferencesExt};
use serde::{Deserialize, Serialize};

/// Streaming/decoding quality preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    Low,
    #[default]
    Normal,
    High,
    Lossless,
}

/// Playback settings mirrored to the preferences store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// Preferred audio quality (default: Normal)
    pub audio_quality: AudioQuality,

    /// Crossfade length in seconds, 0 disables (default: 0)
    pub crossfade_seconds: u32,

    /// Gapless playback enabled (default: true)
    pub gapless: bool,

    /// Sleep timer length in minutes, 0 disables (default: 0)
    pub sleep_timer_minutes: u32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            audio_quality: AudioQuality::Normal,
            crossfade_seconds: 0,
            gapless: true,
            sleep_timer_minutes: 0,
        }
    }
}

impl PlaybackSettings {
    /// Read settings from the store, falling back to defaults per key
    pub fn load(prefs: &dyn Preferences) -> Self {
        let defaults = Self::default();
        Self {
            audio_quality: prefs
                .fetch(keys::PLAYBACK_AUDIO_QUALITY)
                .unwrap_or(defaults.audio_quality),
            crossfade_seconds: prefs
                .fetch(keys::PLAYBACK_CROSSFADE_SECONDS)
                .unwrap_or(defaults.crossfade_seconds),
            gapless: prefs
                .fetch(keys::PLAYBACK_GAPLESS)
                .unwrap_or(defaults.gapless),
            sleep_timer_minutes: prefs
                .fetch(keys::PLAYBACK_SLEEP_TIMER_MINUTES)
                .unwrap_or(defaults.sleep_timer_minutes),
        }
    }

    /// Write every setting to the store
    pub fn save(&self, prefs: &dyn Preferences) -> crate::Result<()> {
        prefs.put(keys::PLAYBACK_AUDIO_QUALITY, &self.audio_quality)?;
        prefs.put(keys::PLAYBACK_CROSSFADE_SECONDS, &self.crossfade_seconds)?;
        prefs.put(keys::PLAYBACK_GAPLESS, &self.gapless)?;
        prefs.put(keys::PLAYBACK_SLEEP_TIMER_MINUTES, &self.sleep_timer_minutes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::MemoryPreferences;

    #[test]
    fn default_settings() {
        let settings = PlaybackSettings::default();
        assert_eq!(settings.audio_quality, AudioQuality::Normal);
        assert_eq!(settings.crossfade_seconds, 0);
        assert!(settings.gapless);
        assert_eq!(settings.sleep_timer_minutes, 0);
    }

    #[test]
    fn save_then_load() {
        let prefs = MemoryPreferences::new();
        let settings = PlaybackSettings {
            audio_quality: AudioQuality::Lossless,
            crossfade_seconds: 4,
            gapless: false,
            sleep_timer_minutes: 30,
        };

        settings.save(&prefs).unwrap();
        assert_eq!(PlaybackSettings::load(&prefs), settings);
    }

    #[test]
    fn load_tolerates_wrong_types() {
        let prefs = MemoryPreferences::new();
        prefs
            .set_value(keys::PLAYBACK_GAPLESS, serde_json::json!("yes"))
            .unwrap();

        // Unreadable values fall back to defaults instead of failing
        assert!(PlaybackSettings::load(&prefs).gapless);
    }
}
