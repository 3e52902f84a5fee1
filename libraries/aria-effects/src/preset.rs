//! Equalizer presets
//!
//! Each preset is a five-band curve in dB, one value per band from lowest
//! to highest frequency.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of bands a preset curve describes
pub const PRESET_BAND_COUNT: usize = 5;

/// Named equalizer curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EqualizerPreset {
    /// All bands at 0 dB
    #[default]
    Flat,

    /// Enhanced low frequencies
    BassBoost,

    /// Enhanced high frequencies
    TrebleBoost,

    /// Scooped mids, lifted extremes
    Rock,

    /// Lifted mids
    Pop,

    /// Warm lows and airy highs
    Jazz,

    /// Wide and gentle V
    Classical,

    /// Presence range forward
    Vocal,
}

impl EqualizerPreset {
    /// Every preset, in display order
    pub const ALL: [Self; 8] = [
        Self::Flat,
        Self::BassBoost,
        Self::TrebleBoost,
        Self::Rock,
        Self::Pop,
        Self::Jazz,
        Self::Classical,
        Self::Vocal,
    ];

    /// Band gains in dB
    pub fn gains(&self) -> [f32; PRESET_BAND_COUNT] {
        match self {
            Self::Flat => [0.0; PRESET_BAND_COUNT],
            Self::BassBoost => [6.0, 4.0, 0.0, 0.0, 0.0],
            Self::TrebleBoost => [0.0, 0.0, 0.0, 4.0, 6.0],
            Self::Rock => [5.0, 3.0, -1.0, 3.0, 5.0],
            Self::Pop => [-1.0, 2.0, 4.0, 2.0, -1.0],
            Self::Jazz => [3.0, 2.0, -1.0, 2.0, 4.0],
            Self::Classical => [4.0, 3.0, -2.0, 3.0, 4.0],
            Self::Vocal => [-2.0, 0.0, 4.0, 3.0, 0.0],
        }
    }

    /// Stable name, used for persistence
    pub fn name(&self) -> &'static str {
        match self {
            Self::Flat => "FLAT",
            Self::BassBoost => "BASS_BOOST",
            Self::TrebleBoost => "TREBLE_BOOST",
            Self::Rock => "ROCK",
            Self::Pop => "POP",
            Self::Jazz => "JAZZ",
            Self::Classical => "CLASSICAL",
            Self::Vocal => "VOCAL",
        }
    }
}

impl fmt::Display for EqualizerPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown preset name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown equalizer preset: {0}")]
pub struct UnknownPreset(pub String);

impl FromStr for EqualizerPreset {
    type Err = UnknownPreset;

    /// Accepts `BASS_BOOST`, `bass_boost`, `bass-boost` and `bassboost`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_uppercase())
            .collect();

        Self::ALL
            .into_iter()
            .find(|preset| preset.name().replace('_', "") == normalized)
            .ok_or_else(|| UnknownPreset(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_is_zero() {
        assert_eq!(EqualizerPreset::Flat.gains(), [0.0; 5]);
    }

    #[test]
    fn curves_stay_within_range() {
        for preset in EqualizerPreset::ALL {
            for gain in preset.gains() {
                assert!((-10.0..=10.0).contains(&gain), "{preset} out of range");
            }
        }
    }

    #[test]
    fn parse_names() {
        assert_eq!("ROCK".parse(), Ok(EqualizerPreset::Rock));
        assert_eq!("bass_boost".parse(), Ok(EqualizerPreset::BassBoost));
        assert_eq!("Treble-Boost".parse(), Ok(EqualizerPreset::TrebleBoost));
        assert!("LOUDNESS".parse::<EqualizerPreset>().is_err());
    }

    #[test]
    fn names_parse_back() {
        for preset in EqualizerPreset::ALL {
            assert_eq!(preset.name().parse(), Ok(preset));
        }
    }
}
