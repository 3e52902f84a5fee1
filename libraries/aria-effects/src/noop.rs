//! Backend for platforms without audio effects

use crate::error::{EffectError, Result};
use crate::native::{BassBoost, EffectsFactory, Equalizer, PresetReverb, SessionId};

/// Factory that supports no effects
///
/// The chain still tracks and persists settings; queries fall back to the
/// default five-band layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEffects;

impl EffectsFactory for NoopEffects {
    fn equalizer(&self, _session: SessionId) -> Result<Box<dyn Equalizer>> {
        Err(EffectError::Unsupported("equalizer"))
    }

    fn bass_boost(&self, _session: SessionId) -> Result<Box<dyn BassBoost>> {
        Err(EffectError::Unsupported("bass boost"))
    }

    fn preset_reverb(&self, _session: SessionId) -> Result<Box<dyn PresetReverb>> {
        Err(EffectError::Unsupported("preset reverb"))
    }
}
