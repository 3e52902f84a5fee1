//! Stereo biquad sections for the software rack

use std::f32::consts::PI;

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Peaking,
    LowShelf,
}

/// Biquad filter with per-channel state
#[derive(Debug, Clone)]
pub(crate) struct Biquad {
    shape: Shape,
    frequency: f32,
    q: f32,
    gain_db: f32,

    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    // [left, right] history
    x1: [f32; 2],
    x2: [f32; 2],
    y1: [f32; 2],
    y2: [f32; 2],
}

impl Biquad {
    pub(crate) fn new(shape: Shape, frequency: f32, q: f32) -> Self {
        Self {
            shape,
            frequency,
            q,
            gain_db: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: [0.0; 2],
            x2: [0.0; 2],
            y1: [0.0; 2],
            y2: [0.0; 2],
        }
    }

    pub(crate) fn frequency(&self) -> f32 {
        self.frequency
    }

    pub(crate) fn gain_db(&self) -> f32 {
        self.gain_db
    }

    pub(crate) fn set_gain(&mut self, gain_db: f32, sample_rate: f32) {
        self.gain_db = gain_db;
        self.update_coefficients(sample_rate);
    }

    /// RBJ cookbook coefficients
    pub(crate) fn update_coefficients(&mut self, sample_rate: f32) {
        if sample_rate < 1.0 || self.gain_db.abs() < 0.01 {
            self.b0 = 1.0;
            self.b1 = 0.0;
            self.b2 = 0.0;
            self.a1 = 0.0;
            self.a2 = 0.0;
            return;
        }

        let a = 10.0_f32.powf(self.gain_db / 40.0);
        // Keep well below Nyquist
        let freq = self.frequency.min(sample_rate * 0.45);
        let omega = 2.0 * PI * freq / sample_rate;
        let (sin_w, cos_w) = omega.sin_cos();
        let alpha = sin_w / (2.0 * self.q);

        let (b0, b1, b2, a0, a1, a2) = match self.shape {
            Shape::Peaking => (
                1.0 + alpha * a,
                -2.0 * cos_w,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w,
                1.0 - alpha / a,
            ),
            Shape::LowShelf => {
                let sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w + sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w),
                    a * ((a + 1.0) - (a - 1.0) * cos_w - sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w + sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w),
                    (a + 1.0) + (a - 1.0) * cos_w - sqrt_a_alpha,
                )
            }
        };

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    #[inline]
    pub(crate) fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        (self.tick(0, left), self.tick(1, right))
    }

    #[inline]
    fn tick(&mut self, ch: usize, input: f32) -> f32 {
        let mut out = self.b0 * input + self.b1 * self.x1[ch] + self.b2 * self.x2[ch]
            - self.a1 * self.y1[ch]
            - self.a2 * self.y2[ch];

        // Flush denormals
        if out.abs() < 1e-15 {
            out = 0.0;
        }

        self.x2[ch] = self.x1[ch];
        self.x1[ch] = input;
        self.y2[ch] = self.y1[ch];
        self.y1[ch] = out;
        out
    }

    pub(crate) fn reset(&mut self) {
        self.x1 = [0.0; 2];
        self.x2 = [0.0; 2];
        self.y1 = [0.0; 2];
        self.y2 = [0.0; 2];
    }
}
