//! Resonant low-pass filter applied to each voice.

use super::tables::{attenuation_gain, sine};
use super::{FILTER_MAX_HZ, FILTER_MIN_HZ};

/// Cutoff changes smaller than this (Hz) keep the current coefficients.
const RETUNE_THRESHOLD_HZ: f32 = 1.0;

/// Two-pole low-pass biquad (RBJ cookbook form, transposed direct form II).
///
/// Coefficients are recomputed only through [`LowPass::set`], which the
/// voice calls at control rate; `process` is a handful of multiply-adds.
#[derive(Debug, Clone, Copy)]
pub struct LowPass {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
    cutoff: f32,
    resonance: f32,
    bypass: bool,
}

impl Default for LowPass {
    fn default() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            cutoff: -1.0,
            resonance: -1.0,
            bypass: true,
        }
    }
}

impl LowPass {
    /// Clears the filter history and forces the next `set` to recompute.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Updates the coefficients.
    ///
    /// # Arguments
    ///
    /// * `cutoff_hz` - Cutoff frequency in Hz
    /// * `resonance_cb` - Resonance peak above DC gain in centibels (0..=960)
    /// * `sample_rate` - Output sample rate in Hz
    pub fn set(&mut self, cutoff_hz: f32, resonance_cb: f32, sample_rate: f32) {
        let nyquist_limit = (sample_rate * 0.45).min(FILTER_MAX_HZ);
        let cutoff = cutoff_hz.clamp(FILTER_MIN_HZ, nyquist_limit);
        let resonance = resonance_cb.clamp(0.0, 960.0);

        if (cutoff - self.cutoff).abs() < RETUNE_THRESHOLD_HZ && resonance == self.resonance {
            return;
        }
        self.cutoff = cutoff;
        self.resonance = resonance;

        // A wide-open filter without resonance is inaudible; skip it.
        self.bypass = cutoff >= nyquist_limit && resonance <= 0.0;
        if self.bypass {
            return;
        }

        // Q in linear terms: the resonance is specified above a -3.01 dB
        // baseline, so subtract 30.1 cB before converting.
        let q = (1.0 / attenuation_gain(resonance - 30.1)).max(0.5);
        let omega = cutoff / sample_rate;
        let sin_w = sine(omega);
        let cos_w = sine(omega + 0.25);
        let alpha = sin_w / (2.0 * q);

        let a0 = 1.0 + alpha;
        let b1 = (1.0 - cos_w) / a0;
        self.b0 = b1 * 0.5;
        self.b1 = b1;
        self.b2 = b1 * 0.5;
        self.a1 = -2.0 * cos_w / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    /// Filters one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        if self.bypass {
            return input;
        }
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }
}
