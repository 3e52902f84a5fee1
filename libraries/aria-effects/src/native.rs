//! Native effect boundary
//!
//! Effects are attached to an audio session: the identifier of the decoder
//! instance that is currently producing sound. Every new decoder gets a new
//! session, and handles created for an older session stop working.
//!
//! Levels use the platform units: equalizer band levels in millibels,
//! bass boost strength in `0..=1000`.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Audio session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    /// Wrap a raw session number
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Allocate a process-unique session
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw session number
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reverb presets offered by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverbPreset {
    #[default]
    None,
    SmallRoom,
    MediumRoom,
    LargeRoom,
    Plate,
}

impl ReverbPreset {
    /// Quantize a `0..=100` reverb level into a preset
    pub fn from_level(level: u8) -> Self {
        match level {
            0..=20 => Self::None,
            21..=40 => Self::SmallRoom,
            41..=60 => Self::MediumRoom,
            61..=80 => Self::LargeRoom,
            _ => Self::Plate,
        }
    }
}

/// Multi-band equalizer attached to a session
pub trait Equalizer: Send {
    /// Number of bands the backend exposes
    fn number_of_bands(&self) -> Result<u16>;

    /// Supported band level range in millibels `(min, max)`
    fn band_level_range(&self) -> Result<(i16, i16)>;

    /// Center frequency of a band in Hz
    fn center_frequency(&self, band: u16) -> Result<u32>;

    /// Set a band level in millibels
    fn set_band_level(&mut self, band: u16, level: i16) -> Result<()>;

    /// Enable or bypass the effect
    fn set_enabled(&mut self, enabled: bool) -> Result<()>;

    /// Detach from the session; further calls fail
    fn release(&mut self);
}

/// Low-frequency boost attached to a session
pub trait BassBoost: Send {
    /// Set strength in `0..=1000`
    fn set_strength(&mut self, strength: u16) -> Result<()>;

    /// Enable or bypass the effect
    fn set_enabled(&mut self, enabled: bool) -> Result<()>;

    /// Detach from the session; further calls fail
    fn release(&mut self);
}

/// Preset-based reverb attached to a session
pub trait PresetReverb: Send {
    /// Select a preset
    fn set_preset(&mut self, preset: ReverbPreset) -> Result<()>;

    /// Enable or bypass the effect
    fn set_enabled(&mut self, enabled: bool) -> Result<()>;

    /// Detach from the session; further calls fail
    fn release(&mut self);
}

/// Creates effect handles for a session
///
/// Any method may fail with [`EffectError::Unsupported`](crate::EffectError)
/// when the platform lacks the effect.
pub trait EffectsFactory: Send + Sync {
    /// Create an equalizer for `session`
    fn equalizer(&self, session: SessionId) -> Result<Box<dyn Equalizer>>;

    /// Create a bass boost for `session`
    fn bass_boost(&self, session: SessionId) -> Result<Box<dyn BassBoost>>;

    /// Create a preset reverb for `session`
    fn preset_reverb(&self, session: SessionId) -> Result<Box<dyn PresetReverb>>;
}
