//! Effects chain bound to the active audio session
//!
//! The chain owns the user-facing effect settings (bass, treble, reverb and a
//! five-band equalizer), mirrors them to the preferences store, and applies
//! them to native effect handles for whatever session is currently bound.
//!
//! Handles are created lazily on first use and dropped on rebind. Backend
//! failures never surface to callers: an effect the platform cannot provide
//! simply has no audible result while its setting is still tracked.

use crate::error::EffectError;
use crate::native::{BassBoost, EffectsFactory, Equalizer, PresetReverb, ReverbPreset, SessionId};
use crate::preset::{EqualizerPreset, PRESET_BAND_COUNT};
use aria_core::preferences::{keys, Preferences, PreferencesExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Native effect a handle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EffectKind {
    Equalizer,
    BassBoost,
    Reverb,
}

impl std::fmt::Display for EffectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Equalizer => "equalizer",
            Self::BassBoost => "bass boost",
            Self::Reverb => "reverb",
        })
    }
}

/// Band count reported when no equalizer is available
pub const FALLBACK_BAND_COUNT: u16 = 5;

/// Center frequencies (Hz) reported when no equalizer is available
pub const FALLBACK_BAND_FREQUENCIES: [u32; 5] = [60, 230, 910, 3600, 14000];

/// Level range for bass, treble and equalizer bands (dB)
pub const LEVEL_RANGE: (f32, f32) = (-10.0, 10.0);

/// Highest reverb level
pub const MAX_REVERB_LEVEL: u8 = 100;

/// Map a bass level in dB to a bass boost strength in `0..=1000`
pub fn bass_strength(level: f32) -> u16 {
    let strength = ((level + 10.0) / 20.0 * 1000.0).round();
    strength.clamp(0.0, 1000.0) as u16
}

/// Map a level in dB onto a native band level in millibels
///
/// `max_level` is the top of the backend's band range; the result is scaled
/// so that 10 dB reaches it.
pub fn native_band_level(level: f32, max_level: i16) -> i16 {
    let target = (level / 10.0 * f32::from(max_level)).round();
    target.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

fn clamp_level(level: f32) -> f32 {
    if level.is_nan() {
        return 0.0;
    }
    level.clamp(LEVEL_RANGE.0, LEVEL_RANGE.1)
}

/// Current effect settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectsState {
    /// Bass level in dB
    pub bass_level: f32,

    /// Treble level in dB
    pub treble_level: f32,

    /// Reverb on/off
    pub reverb_enabled: bool,

    /// Reverb amount, `0..=100`
    pub reverb_level: u8,

    /// Last applied preset, `None` once a band is edited by hand
    pub equalizer_preset: Option<EqualizerPreset>,

    /// Equalizer band levels in dB
    pub equalizer_bands: [f32; PRESET_BAND_COUNT],
}

impl Default for EffectsState {
    fn default() -> Self {
        Self {
            bass_level: 0.0,
            treble_level: 0.0,
            reverb_enabled: false,
            reverb_level: 0,
            equalizer_preset: Some(EqualizerPreset::Flat),
            equalizer_bands: [0.0; PRESET_BAND_COUNT],
        }
    }
}

impl EffectsState {
    /// Read settings from the store, falling back to defaults per key
    pub fn load(prefs: &dyn Preferences) -> Self {
        let defaults = Self::default();
        let equalizer_preset = match prefs.fetch::<Option<String>>(keys::EFFECTS_EQUALIZER_PRESET) {
            Some(Some(name)) => name.parse().ok(),
            Some(None) => None,
            None => defaults.equalizer_preset,
        };

        let mut bands = prefs
            .fetch::<[f32; PRESET_BAND_COUNT]>(keys::EFFECTS_EQUALIZER_BANDS)
            .unwrap_or(defaults.equalizer_bands);
        for band in &mut bands {
            *band = clamp_level(*band);
        }

        Self {
            bass_level: clamp_level(
                prefs
                    .fetch(keys::EFFECTS_BASS_LEVEL)
                    .unwrap_or(defaults.bass_level),
            ),
            treble_level: clamp_level(
                prefs
                    .fetch(keys::EFFECTS_TREBLE_LEVEL)
                    .unwrap_or(defaults.treble_level),
            ),
            reverb_enabled: prefs
                .fetch(keys::EFFECTS_REVERB_ENABLED)
                .unwrap_or(defaults.reverb_enabled),
            reverb_level: prefs
                .fetch::<u8>(keys::EFFECTS_REVERB_LEVEL)
                .unwrap_or(defaults.reverb_level)
                .min(MAX_REVERB_LEVEL),
            equalizer_preset,
            equalizer_bands: bands,
        }
    }
}

/// Effects applied to the active session
pub struct EffectsChain {
    factory: Arc<dyn EffectsFactory>,
    prefs: Arc<dyn Preferences>,
    state: EffectsState,
    session: Option<SessionId>,

    equalizer: Option<Box<dyn Equalizer>>,
    bass_boost: Option<Box<dyn BassBoost>>,
    reverb: Option<Box<dyn PresetReverb>>,
}

impl EffectsChain {
    /// Create an unbound chain with settings read from `prefs`
    pub fn new(factory: Arc<dyn EffectsFactory>, prefs: Arc<dyn Preferences>) -> Self {
        let state = EffectsState::load(prefs.as_ref());
        debug!("Loaded effect settings: {:?}", state);
        Self {
            factory,
            prefs,
            state,
            session: None,
            equalizer: None,
            bass_boost: None,
            reverb: None,
        }
    }

    /// Current settings
    pub fn state(&self) -> &EffectsState {
        &self.state
    }

    /// Session the chain is bound to
    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    // ===== Session lifecycle =====

    /// Bind to a new session and re-apply every setting
    pub fn bind(&mut self, session: SessionId) {
        if self.session == Some(session) {
            return;
        }
        self.release();
        self.session = Some(session);
        debug!("Effects bound to session {}", session);
        self.reapply();
    }

    /// Release every native handle and unbind
    pub fn release(&mut self) {
        if let Some(mut eq) = self.equalizer.take() {
            eq.release();
        }
        if let Some(mut bass) = self.bass_boost.take() {
            bass.release();
        }
        if let Some(mut reverb) = self.reverb.take() {
            reverb.release();
        }
        if let Some(session) = self.session.take() {
            debug!("Effects released from session {}", session);
        }
    }

    fn reapply(&mut self) {
        let bands = self.state.equalizer_bands;
        for (band, level) in bands.iter().enumerate() {
            self.apply_band(band as u16, *level);
        }

        // Treble beyond the stored bands is only reachable by re-applying it
        if self.state.treble_level != 0.0 && self.number_of_bands() as usize != PRESET_BAND_COUNT {
            self.apply_treble(self.state.treble_level);
        }

        self.apply_bass(self.state.bass_level);
        self.apply_reverb_preset(ReverbPreset::from_level(self.state.reverb_level));
        self.apply_reverb_enabled(self.state.reverb_enabled);
    }

    // ===== Settings =====

    /// Set the bass level in dB (clamped to `-10..=10`)
    pub fn set_bass_level(&mut self, level: f32) {
        let level = clamp_level(level);
        self.state.bass_level = level;
        self.persist(keys::EFFECTS_BASS_LEVEL, &level);
        self.apply_bass(level);
    }

    /// Set the treble level in dB (clamped to `-10..=10`)
    ///
    /// Drives the upper half of the equalizer bands; the stored band levels
    /// follow so a later rebind reproduces the same curve.
    pub fn set_treble_level(&mut self, level: f32) {
        let level = clamp_level(level);
        self.state.treble_level = level;

        let count = usize::from(self.number_of_bands());
        for band in (count / 2)..count.min(PRESET_BAND_COUNT) {
            self.state.equalizer_bands[band] = level;
        }
        self.state.equalizer_preset = None;

        self.persist(keys::EFFECTS_TREBLE_LEVEL, &level);
        self.persist_equalizer();
        self.apply_treble(level);
    }

    /// Turn reverb on or off
    pub fn set_reverb_enabled(&mut self, enabled: bool) {
        self.state.reverb_enabled = enabled;
        self.persist(keys::EFFECTS_REVERB_ENABLED, &enabled);
        self.apply_reverb_enabled(enabled);
    }

    /// Set the reverb amount (clamped to `0..=100`)
    pub fn set_reverb_level(&mut self, level: u8) {
        let level = level.min(MAX_REVERB_LEVEL);
        self.state.reverb_level = level;
        self.persist(keys::EFFECTS_REVERB_LEVEL, &level);
        self.apply_reverb_preset(ReverbPreset::from_level(level));
    }

    /// Set one equalizer band in dB (clamped to `-10..=10`)
    ///
    /// Bands past the five stored ones are applied natively but not stored.
    pub fn set_equalizer_band(&mut self, band: u16, level: f32) {
        let level = clamp_level(level);
        if let Some(slot) = self.state.equalizer_bands.get_mut(usize::from(band)) {
            *slot = level;
            self.state.equalizer_preset = None;
            self.persist_equalizer();
        }
        self.apply_band(band, level);
    }

    /// Apply a named curve to the first five bands
    pub fn apply_equalizer_preset(&mut self, preset: EqualizerPreset) {
        let gains = preset.gains();
        self.state.equalizer_bands = gains;
        self.state.equalizer_preset = Some(preset);

        self.persist_equalizer();

        for (band, level) in gains.iter().enumerate() {
            self.apply_band(band as u16, *level);
        }
    }

    // ===== Capability queries =====

    /// Bands the equalizer exposes, 5 when unavailable
    pub fn number_of_bands(&mut self) -> u16 {
        let Some(eq) = self.equalizer() else {
            return FALLBACK_BAND_COUNT;
        };
        match eq.number_of_bands() {
            Ok(count) => count,
            Err(e) => {
                self.handle_failure(EffectKind::Equalizer, &e);
                FALLBACK_BAND_COUNT
            }
        }
    }

    /// Center frequency of a band in Hz
    ///
    /// Falls back to the default five-band layout; `None` for a band that
    /// exists in neither.
    pub fn band_frequency(&mut self, band: u16) -> Option<u32> {
        let fallback = FALLBACK_BAND_FREQUENCIES.get(usize::from(band)).copied();
        let Some(eq) = self.equalizer() else {
            return fallback;
        };
        match eq.center_frequency(band) {
            Ok(hz) => Some(hz),
            Err(e) => {
                self.handle_failure(EffectKind::Equalizer, &e);
                fallback
            }
        }
    }

    // ===== Native application =====

    fn apply_bass(&mut self, level: f32) {
        let strength = bass_strength(level);
        let Some(bass) = self.bass_boost() else {
            return;
        };
        if let Err(e) = bass.set_strength(strength) {
            self.handle_failure(EffectKind::BassBoost, &e);
        }
    }

    fn apply_treble(&mut self, level: f32) {
        let Some(eq) = self.equalizer() else {
            return;
        };
        let result = eq.number_of_bands().and_then(|count| {
            let (_, max) = eq.band_level_range()?;
            let target = native_band_level(level, max);
            for band in (count / 2)..count {
                eq.set_band_level(band, target)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            self.handle_failure(EffectKind::Equalizer, &e);
        }
    }

    fn apply_band(&mut self, band: u16, level: f32) {
        let Some(eq) = self.equalizer() else {
            return;
        };
        let result = eq.number_of_bands().and_then(|count| {
            if band >= count {
                return Err(EffectError::InvalidBand { band, count });
            }
            let (_, max) = eq.band_level_range()?;
            eq.set_band_level(band, native_band_level(level, max))
        });
        if let Err(e) = result {
            self.handle_failure(EffectKind::Equalizer, &e);
        }
    }

    fn apply_reverb_preset(&mut self, preset: ReverbPreset) {
        let Some(reverb) = self.reverb() else {
            return;
        };
        if let Err(e) = reverb.set_preset(preset) {
            self.handle_failure(EffectKind::Reverb, &e);
        }
    }

    fn apply_reverb_enabled(&mut self, enabled: bool) {
        let Some(reverb) = self.reverb() else {
            return;
        };
        if let Err(e) = reverb.set_enabled(enabled) {
            self.handle_failure(EffectKind::Reverb, &e);
        }
    }

    // ===== Lazy handles =====

    fn equalizer(&mut self) -> Option<&mut Box<dyn Equalizer>> {
        if self.equalizer.is_none() {
            let session = self.session?;
            match self.factory.equalizer(session) {
                Ok(mut eq) => {
                    if let Err(e) = eq.set_enabled(true) {
                        debug!("Equalizer could not be enabled: {}", e);
                    }
                    self.equalizer = Some(eq);
                }
                Err(e) => {
                    debug!("Equalizer unavailable for session {}: {}", session, e);
                    return None;
                }
            }
        }
        self.equalizer.as_mut()
    }

    fn bass_boost(&mut self) -> Option<&mut Box<dyn BassBoost>> {
        if self.bass_boost.is_none() {
            let session = self.session?;
            match self.factory.bass_boost(session) {
                Ok(mut bass) => {
                    if let Err(e) = bass.set_enabled(true) {
                        debug!("Bass boost could not be enabled: {}", e);
                    }
                    self.bass_boost = Some(bass);
                }
                Err(e) => {
                    debug!("Bass boost unavailable for session {}: {}", session, e);
                    return None;
                }
            }
        }
        self.bass_boost.as_mut()
    }

    fn reverb(&mut self) -> Option<&mut Box<dyn PresetReverb>> {
        if self.reverb.is_none() {
            let session = self.session?;
            match self.factory.preset_reverb(session) {
                // Enabled state follows the user setting, applied by the caller
                Ok(reverb) => self.reverb = Some(reverb),
                Err(e) => {
                    debug!("Reverb unavailable for session {}: {}", session, e);
                    return None;
                }
            }
        }
        self.reverb.as_mut()
    }

    /// Log a backend failure; a stale handle is released so the next use
    /// recreates it
    fn handle_failure(&mut self, kind: EffectKind, error: &EffectError) {
        debug!("Ignoring {} failure: {}", kind, error);
        if !matches!(error, EffectError::StaleSession(_)) {
            return;
        }
        match kind {
            EffectKind::Equalizer => {
                if let Some(mut eq) = self.equalizer.take() {
                    eq.release();
                }
            }
            EffectKind::BassBoost => {
                if let Some(mut bass) = self.bass_boost.take() {
                    bass.release();
                }
            }
            EffectKind::Reverb => {
                if let Some(mut reverb) = self.reverb.take() {
                    reverb.release();
                }
            }
        }
    }

    fn persist_equalizer(&self) {
        let preset = self.state.equalizer_preset.map(|p| p.name());
        self.persist(keys::EFFECTS_EQUALIZER_PRESET, &preset);
        self.persist(keys::EFFECTS_EQUALIZER_BANDS, &self.state.equalizer_bands);
    }

    fn persist<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = self.prefs.put(key, value) {
            warn!("Failed to persist {}: {}", key, e);
        }
    }
}

impl Drop for EffectsChain {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for EffectsChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectsChain")
            .field("session", &self.session)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noop::NoopEffects;
    use aria_core::preferences::MemoryPreferences;

    fn chain() -> (EffectsChain, Arc<MemoryPreferences>) {
        let prefs = Arc::new(MemoryPreferences::new());
        let chain = EffectsChain::new(Arc::new(NoopEffects), prefs.clone());
        (chain, prefs)
    }

    #[test]
    fn bass_strength_mapping() {
        assert_eq!(bass_strength(-10.0), 0);
        assert_eq!(bass_strength(0.0), 500);
        assert_eq!(bass_strength(10.0), 1000);
        assert_eq!(bass_strength(5.0), 750);
        assert_eq!(bass_strength(40.0), 1000);
    }

    #[test]
    fn band_level_mapping() {
        assert_eq!(native_band_level(10.0, 1500), 1500);
        assert_eq!(native_band_level(-10.0, 1500), -1500);
        assert_eq!(native_band_level(3.0, 1500), 450);
        assert_eq!(native_band_level(0.0, 1200), 0);
    }

    #[test]
    fn unavailable_effects_still_track_state() {
        let (mut chain, prefs) = chain();
        chain.bind(SessionId::new(1));

        chain.set_bass_level(4.0);
        chain.set_reverb_level(55);

        assert_eq!(chain.state().bass_level, 4.0);
        assert_eq!(chain.state().reverb_level, 55);
        assert_eq!(prefs.fetch::<f32>(keys::EFFECTS_BASS_LEVEL), Some(4.0));
    }

    #[test]
    fn capability_fallbacks() {
        let (mut chain, _) = chain();
        assert_eq!(chain.number_of_bands(), 5);
        assert_eq!(chain.band_frequency(0), Some(60));
        assert_eq!(chain.band_frequency(4), Some(14000));
        assert_eq!(chain.band_frequency(9), None);
    }

    #[test]
    fn levels_are_clamped() {
        let (mut chain, _) = chain();
        chain.set_bass_level(25.0);
        chain.set_treble_level(-30.0);
        chain.set_reverb_level(250);

        assert_eq!(chain.state().bass_level, 10.0);
        assert_eq!(chain.state().treble_level, -10.0);
        assert_eq!(chain.state().reverb_level, 100);
    }

    #[test]
    fn preset_then_band_edit_clears_preset() {
        let (mut chain, prefs) = chain();
        chain.apply_equalizer_preset(EqualizerPreset::Rock);
        assert_eq!(chain.state().equalizer_bands, EqualizerPreset::Rock.gains());
        assert_eq!(
            prefs.fetch::<String>(keys::EFFECTS_EQUALIZER_PRESET).as_deref(),
            Some("ROCK")
        );

        chain.set_equalizer_band(2, 7.0);
        assert_eq!(chain.state().equalizer_bands[2], 7.0);
        assert_eq!(chain.state().equalizer_preset, None);

        // Hand-edited curves reload without a preset name
        let reloaded = EffectsChain::new(Arc::new(NoopEffects), prefs);
        assert_eq!(reloaded.state().equalizer_preset, None);
    }

    #[test]
    fn state_reloads_from_preferences() {
        let (mut chain, prefs) = chain();
        chain.set_bass_level(-3.0);
        chain.set_reverb_enabled(true);
        chain.apply_equalizer_preset(EqualizerPreset::Jazz);

        let reloaded = EffectsChain::new(Arc::new(NoopEffects), prefs);
        assert_eq!(reloaded.state(), chain.state());
    }

    #[test]
    fn treble_mirrors_into_upper_bands() {
        let (mut chain, _) = chain();
        chain.set_treble_level(6.0);

        // Five fallback bands: the upper half starts at 5 / 2
        assert_eq!(chain.state().equalizer_bands, [0.0, 0.0, 6.0, 6.0, 6.0]);
    }
}
