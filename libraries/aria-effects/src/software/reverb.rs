//! Schroeder-style reverb for the software rack
//!
//! Four parallel feedback combs into two series allpasses, fed from the mono
//! sum and mixed back into both channels.

use crate::native::ReverbPreset;

const REFERENCE_RATE: f32 = 44_100.0;
const COMB_DELAYS: [usize; 4] = [1116, 1188, 1277, 1356];
const ALLPASS_DELAYS: [usize; 2] = [556, 441];
const ALLPASS_FEEDBACK: f32 = 0.5;

/// Tuning for a preset: (feedback, damping, wet)
fn tuning(preset: ReverbPreset) -> (f32, f32, f32) {
    match preset {
        ReverbPreset::None => (0.0, 0.0, 0.0),
        ReverbPreset::SmallRoom => (0.70, 0.40, 0.15),
        ReverbPreset::MediumRoom => (0.78, 0.35, 0.22),
        ReverbPreset::LargeRoom => (0.84, 0.30, 0.28),
        ReverbPreset::Plate => (0.88, 0.15, 0.33),
    }
}

#[derive(Debug, Clone)]
struct Comb {
    buffer: Vec<f32>,
    index: usize,
    store: f32,
}

impl Comb {
    fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len.max(1)],
            index: 0,
            store: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damping: f32) -> f32 {
        let out = self.buffer[self.index];
        self.store = out * (1.0 - damping) + self.store * damping;
        self.buffer[self.index] = input + self.store * feedback;
        self.index = (self.index + 1) % self.buffer.len();
        out
    }
}

#[derive(Debug, Clone)]
struct Allpass {
    buffer: Vec<f32>,
    index: usize,
}

impl Allpass {
    fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];
        self.buffer[self.index] = input + delayed * ALLPASS_FEEDBACK;
        self.index = (self.index + 1) % self.buffer.len();
        delayed - input
    }
}

/// Reverb with lazily sized delay lines
#[derive(Debug, Clone, Default)]
pub(crate) struct Reverb {
    preset: ReverbPreset,
    sample_rate: u32,
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
}

impl Reverb {
    pub(crate) fn preset(&self) -> ReverbPreset {
        self.preset
    }

    pub(crate) fn set_preset(&mut self, preset: ReverbPreset) {
        self.preset = preset;
    }

    /// Drop the tail
    pub(crate) fn reset(&mut self) {
        self.combs.clear();
        self.allpasses.clear();
        self.sample_rate = 0;
    }

    fn prepare(&mut self, sample_rate: u32) {
        if self.sample_rate == sample_rate && !self.combs.is_empty() {
            return;
        }
        let scale = sample_rate as f32 / REFERENCE_RATE;
        let scaled = |len: usize| (len as f32 * scale).round() as usize;

        self.combs = COMB_DELAYS.iter().map(|&d| Comb::new(scaled(d))).collect();
        self.allpasses = ALLPASS_DELAYS
            .iter()
            .map(|&d| Allpass::new(scaled(d)))
            .collect();
        self.sample_rate = sample_rate;
    }

    /// Process interleaved stereo in place
    pub(crate) fn process(&mut self, buffer: &mut [f32], sample_rate: u32) {
        let (feedback, damping, wet) = tuning(self.preset);
        if wet <= 0.0 || sample_rate == 0 {
            return;
        }
        self.prepare(sample_rate);

        let comb_gain = 1.0 / self.combs.len() as f32;
        for frame in buffer.chunks_exact_mut(2) {
            let input = (frame[0] + frame[1]) * 0.5;

            let mut tail = 0.0;
            for comb in &mut self.combs {
                tail += comb.process(input, feedback, damping);
            }
            tail *= comb_gain;
            for allpass in &mut self.allpasses {
                tail = allpass.process(tail);
            }

            frame[0] = frame[0] * (1.0 - wet) + tail * wet;
            frame[1] = frame[1] * (1.0 - wet) + tail * wet;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse_tail(preset: ReverbPreset) -> f32 {
        let mut reverb = Reverb::default();
        reverb.set_preset(preset);

        let mut buffer = vec![0.0_f32; 44_100 * 2];
        buffer[0] = 1.0;
        buffer[1] = 1.0;
        reverb.process(&mut buffer, 44_100);

        // Energy after the direct sound
        buffer[2..].iter().map(|s| s * s).sum()
    }

    #[test]
    fn none_preset_is_bypass() {
        assert_eq!(impulse_tail(ReverbPreset::None), 0.0);
    }

    #[test]
    fn presets_produce_a_tail() {
        assert!(impulse_tail(ReverbPreset::SmallRoom) > 0.0);
        assert!(impulse_tail(ReverbPreset::Plate) > impulse_tail(ReverbPreset::SmallRoom));
    }
}
