//! Low-frequency sine oscillators for vibrato and modulation.

use crate::dsp::{absolute_cents_to_hz, tables, timecents_to_frames};

/// A free-running sine LFO with a start delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lfo {
    /// Phase in cycles, `[0, 1)`.
    phase: f32,
    /// Phase advance per frame.
    increment: f32,
    /// Frames left before the oscillator starts.
    delay: u32,
}

impl Lfo {
    /// Restarts the oscillator at phase zero.
    ///
    /// # Arguments
    ///
    /// * `frequency_cents` - Frequency in absolute cents
    /// * `delay_timecents` - Start delay in timecents
    /// * `sample_rate` - Output sample rate
    pub fn start(&mut self, frequency_cents: f32, delay_timecents: f32, sample_rate: f32) {
        self.phase = 0.0;
        self.delay = timecents_to_frames(delay_timecents, sample_rate);
        self.set_frequency(frequency_cents, sample_rate);
    }

    /// Changes the rate without resetting the phase.
    pub fn set_frequency(&mut self, frequency_cents: f32, sample_rate: f32) {
        self.increment = absolute_cents_to_hz(frequency_cents) / sample_rate;
    }

    /// Advances one frame and returns the output in `[-1, 1]`.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.delay > 0 {
            self.delay -= 1;
            return 0.0;
        }
        let value = tables::sine(self.phase);
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        value
    }
}
