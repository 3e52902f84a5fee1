//! Software effects backend
//!
//! A DSP rack shared between the factory and every handle it creates. The
//! rack is attached to one session at a time; requesting a handle for a new
//! session resets the rack and turns every older handle stale.
//!
//! Audio goes through [`SoftwareEffects::process`] as interleaved stereo
//! `f32` samples in `[-1.0, 1.0]`.

mod biquad;
mod reverb;

use crate::error::{EffectError, Result};
use crate::native::{BassBoost, EffectsFactory, Equalizer, PresetReverb, ReverbPreset, SessionId};
use biquad::{Biquad, Shape};
use reverb::Reverb;
use std::sync::{Arc, Mutex, MutexGuard};

/// Center frequencies of the software equalizer (Hz)
pub const SOFTWARE_BAND_FREQUENCIES: [u32; 5] = [60, 230, 910, 3600, 14000];

/// Band level range in millibels
pub const SOFTWARE_BAND_LEVEL_RANGE: (i16, i16) = (-1500, 1500);

const BAND_Q: f32 = 1.0;
const BASS_SHELF_HZ: f32 = 100.0;
const BASS_SHELF_Q: f32 = 0.707;
const MAX_BASS_GAIN_DB: f32 = 12.0;
const DEFAULT_SAMPLE_RATE: u32 = 44_100;

struct Rack {
    session: Option<SessionId>,
    sample_rate: u32,

    eq_bands: Vec<Biquad>,
    eq_enabled: bool,

    bass: Biquad,
    bass_enabled: bool,

    reverb: Reverb,
    reverb_enabled: bool,
}

impl Rack {
    fn new(session: Option<SessionId>) -> Self {
        Self {
            session,
            sample_rate: DEFAULT_SAMPLE_RATE,
            eq_bands: SOFTWARE_BAND_FREQUENCIES
                .iter()
                .map(|&hz| Biquad::new(Shape::Peaking, hz as f32, BAND_Q))
                .collect(),
            eq_enabled: false,
            bass: Biquad::new(Shape::LowShelf, BASS_SHELF_HZ, BASS_SHELF_Q),
            bass_enabled: false,
            reverb: Reverb::default(),
            reverb_enabled: false,
        }
    }

    fn attach(&mut self, session: SessionId) {
        if self.session != Some(session) {
            tracing::debug!("Software effects rack attached to session {}", session);
            *self = Self::new(Some(session));
        }
    }

    fn check(&self, session: SessionId) -> Result<()> {
        if self.session == Some(session) {
            Ok(())
        } else {
            Err(EffectError::StaleSession(session))
        }
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        if self.sample_rate == sample_rate {
            return;
        }
        self.sample_rate = sample_rate;
        let sr = sample_rate as f32;
        for band in &mut self.eq_bands {
            band.reset();
            band.update_coefficients(sr);
        }
        self.bass.reset();
        self.bass.update_coefficients(sr);
        self.reverb.reset();
    }

    fn process(&mut self, buffer: &mut [f32], sample_rate: u32) {
        if self.session.is_none() || sample_rate == 0 {
            return;
        }
        self.set_sample_rate(sample_rate);

        if self.eq_enabled || self.bass_enabled {
            for frame in buffer.chunks_exact_mut(2) {
                let (mut left, mut right) = (frame[0], frame[1]);
                if self.eq_enabled {
                    for band in &mut self.eq_bands {
                        (left, right) = band.process(left, right);
                    }
                }
                if self.bass_enabled {
                    (left, right) = self.bass.process(left, right);
                }
                frame[0] = left;
                frame[1] = right;
            }
        }

        if self.reverb_enabled {
            self.reverb.process(buffer, sample_rate);
        }
    }
}

fn lock(rack: &Mutex<Rack>) -> Result<MutexGuard<'_, Rack>> {
    rack.lock()
        .map_err(|_| EffectError::Backend("effects rack lock poisoned".to_string()))
}

/// In-process DSP implementation of the effect boundary
#[derive(Clone)]
pub struct SoftwareEffects {
    rack: Arc<Mutex<Rack>>,
}

impl SoftwareEffects {
    /// Create a detached rack
    pub fn new() -> Self {
        Self {
            rack: Arc::new(Mutex::new(Rack::new(None))),
        }
    }

    /// Session the rack is attached to
    pub fn session(&self) -> Option<SessionId> {
        lock(&self.rack).ok().and_then(|rack| rack.session)
    }

    /// Detach from the current session, staling every handle
    pub fn detach(&self) {
        if let Ok(mut rack) = lock(&self.rack) {
            *rack = Rack::new(None);
        }
    }

    /// Run interleaved stereo audio through the enabled effects
    ///
    /// A detached rack passes audio through untouched.
    pub fn process(&self, buffer: &mut [f32], sample_rate: u32) {
        match lock(&self.rack) {
            Ok(mut rack) => rack.process(buffer, sample_rate),
            Err(e) => tracing::warn!("Skipping effects: {}", e),
        }
    }

    fn handle(&self, session: SessionId) -> Result<Handle> {
        lock(&self.rack)?.attach(session);
        Ok(Handle {
            rack: Arc::clone(&self.rack),
            session,
            released: false,
        })
    }
}

impl Default for SoftwareEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SoftwareEffects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareEffects")
            .field("session", &self.session())
            .finish()
    }
}

impl EffectsFactory for SoftwareEffects {
    fn equalizer(&self, session: SessionId) -> Result<Box<dyn Equalizer>> {
        Ok(Box::new(SoftwareEqualizer(self.handle(session)?)))
    }

    fn bass_boost(&self, session: SessionId) -> Result<Box<dyn BassBoost>> {
        Ok(Box::new(SoftwareBassBoost(self.handle(session)?)))
    }

    fn preset_reverb(&self, session: SessionId) -> Result<Box<dyn PresetReverb>> {
        Ok(Box::new(SoftwareReverb(self.handle(session)?)))
    }
}

/// Session-checked access to the shared rack
struct Handle {
    rack: Arc<Mutex<Rack>>,
    session: SessionId,
    released: bool,
}

impl Handle {
    fn with_rack<T>(&self, f: impl FnOnce(&mut Rack) -> Result<T>) -> Result<T> {
        if self.released {
            return Err(EffectError::StaleSession(self.session));
        }
        let mut rack = lock(&self.rack)?;
        rack.check(self.session)?;
        f(&mut rack)
    }

    fn release(&mut self, f: impl FnOnce(&mut Rack)) {
        if self.released {
            return;
        }
        // Releasing a stale handle must not touch the new session's rack
        let _ = self.with_rack(|rack| {
            f(rack);
            Ok(())
        });
        self.released = true;
    }
}

struct SoftwareEqualizer(Handle);

impl Equalizer for SoftwareEqualizer {
    fn number_of_bands(&self) -> Result<u16> {
        self.0.with_rack(|rack| Ok(rack.eq_bands.len() as u16))
    }

    fn band_level_range(&self) -> Result<(i16, i16)> {
        self.0.with_rack(|_| Ok(SOFTWARE_BAND_LEVEL_RANGE))
    }

    fn center_frequency(&self, band: u16) -> Result<u32> {
        self.0.with_rack(|rack| {
            rack.eq_bands
                .get(usize::from(band))
                .map(|b| b.frequency() as u32)
                .ok_or(EffectError::InvalidBand {
                    band,
                    count: rack.eq_bands.len() as u16,
                })
        })
    }

    fn set_band_level(&mut self, band: u16, level: i16) -> Result<()> {
        self.0.with_rack(|rack| {
            let count = rack.eq_bands.len() as u16;
            let sr = rack.sample_rate as f32;
            let filter = rack
                .eq_bands
                .get_mut(usize::from(band))
                .ok_or(EffectError::InvalidBand { band, count })?;
            let (min, max) = SOFTWARE_BAND_LEVEL_RANGE;
            filter.set_gain(f32::from(level.clamp(min, max)) / 100.0, sr);
            Ok(())
        })
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        self.0.with_rack(|rack| {
            rack.eq_enabled = enabled;
            Ok(())
        })
    }

    fn release(&mut self) {
        self.0.release(|rack| {
            rack.eq_enabled = false;
            for band in &mut rack.eq_bands {
                band.reset();
            }
        });
    }
}

struct SoftwareBassBoost(Handle);

impl BassBoost for SoftwareBassBoost {
    fn set_strength(&mut self, strength: u16) -> Result<()> {
        self.0.with_rack(|rack| {
            let gain = f32::from(strength.min(1000)) / 1000.0 * MAX_BASS_GAIN_DB;
            let sr = rack.sample_rate as f32;
            rack.bass.set_gain(gain, sr);
            Ok(())
        })
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        self.0.with_rack(|rack| {
            rack.bass_enabled = enabled;
            Ok(())
        })
    }

    fn release(&mut self) {
        self.0.release(|rack| {
            rack.bass_enabled = false;
            rack.bass.reset();
        });
    }
}

struct SoftwareReverb(Handle);

impl PresetReverb for SoftwareReverb {
    fn set_preset(&mut self, preset: ReverbPreset) -> Result<()> {
        self.0.with_rack(|rack| {
            if rack.reverb.preset() != preset {
                rack.reverb.set_preset(preset);
            }
            Ok(())
        })
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        self.0.with_rack(|rack| {
            rack.reverb_enabled = enabled;
            Ok(())
        })
    }

    fn release(&mut self) {
        self.0.release(|rack| {
            rack.reverb_enabled = false;
            rack.reverb.reset();
        });
    }
}
