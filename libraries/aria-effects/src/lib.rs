//! Aria Effects - session-bound audio effects
//!
//! This crate provides:
//! - A native effect boundary (equalizer, bass boost, preset reverb) keyed by
//!   audio session
//! - [`EffectsChain`]: user settings mapped onto native handles and mirrored
//!   to preferences
//! - Equalizer presets
//! - Two backends: [`NoopEffects`] and the in-process [`SoftwareEffects`] rack
//!
//! # Example
//!
//! ```rust
//! use aria_core::preferences::MemoryPreferences;
//! use aria_effects::{EffectsChain, EqualizerPreset, SessionId, SoftwareEffects};
//! use std::sync::Arc;
//!
//! let rack = SoftwareEffects::new();
//! let mut chain = EffectsChain::new(Arc::new(rack.clone()), Arc::new(MemoryPreferences::new()));
//!
//! chain.bind(SessionId::new(1));
//! chain.apply_equalizer_preset(EqualizerPreset::Rock);
//! chain.set_bass_level(4.0);
//!
//! let mut buffer = vec![0.1_f32; 512];
//! rack.process(&mut buffer, 44_100);
//! ```

mod chain;
mod error;
mod native;
mod noop;
mod preset;
mod software;

pub use chain::{
    bass_strength, native_band_level, EffectsChain, EffectsState, FALLBACK_BAND_COUNT,
    FALLBACK_BAND_FREQUENCIES, LEVEL_RANGE, MAX_REVERB_LEVEL,
};
pub use error::{EffectError, Result};
pub use native::{BassBoost, EffectsFactory, Equalizer, PresetReverb, ReverbPreset, SessionId};
pub use noop::NoopEffects;
pub use preset::{EqualizerPreset, UnknownPreset, PRESET_BAND_COUNT};
pub use software::{SoftwareEffects, SOFTWARE_BAND_FREQUENCIES, SOFTWARE_BAND_LEVEL_RANGE};
