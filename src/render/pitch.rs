//! Playback rate of a voice.
//!
//! The rate is the ratio between how fast the sample cursor moves and the
//! output rate: the sample's own rate relative to the output, scaled by the
//! pitch distance between the played key and the sample's root key plus all
//! tuning offsets. Cents become ratios through the lookup table, so no
//! `powf` runs per frame.

use super::modulation::Parameters;
use crate::bank::{GeneratorIndex as G, SampleHeader};
use crate::dsp::cents_ratio;

/// Root key used when the sample header carries an invalid one.
const FALLBACK_ROOT_KEY: u8 = 60;

/// The key a sample sounds at unshifted.
pub fn root_key(params: &Parameters, header: &SampleHeader) -> u8 {
    let overriding = params.raw(G::OverridingRootKey);
    if (0.0..=127.0).contains(&overriding) {
        overriding as u8
    } else if header.original_key <= 127 {
        header.original_key
    } else {
        FALLBACK_ROOT_KEY
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Pitch {
    /// Offset from the sample's native pitch in cents, before
    /// envelope and LFO contributions.
    cents: f32,
    /// Sample rate over output rate.
    rate_ratio: f32,
}

impl Pitch {
    /// Pitch for `key` played on a sample.
    ///
    /// # Arguments
    ///
    /// * `params` - Modulated generator values
    /// * `key` - Effective key (after any forced key)
    /// * `header` - The sample being played
    /// * `sample_rate` - Output sample rate
    pub fn new(params: &Parameters, key: u8, header: &SampleHeader, sample_rate: f32) -> Self {
        let mut pitch = Self {
            cents: 0.0,
            rate_ratio: header.sample_rate.max(1) as f32 / sample_rate,
        };
        pitch.update(params, key, header);
        pitch
    }

    /// Recomputes the tuning after a controller change.
    pub fn update(&mut self, params: &Parameters, key: u8, header: &SampleHeader) {
        let root = root_key(params, header) as f32;
        let scale = params.get(G::ScaleTuning);
        self.cents = (key as f32 - root) * scale
            + params.get(G::CoarseTune) * 100.0
            + params.get(G::FineTune)
            + header.pitch_correction as f32;
    }

    pub fn cents(&self) -> f32 {
        self.cents
    }

    /// Cursor increment per output frame with an extra offset in cents
    /// from envelopes and LFOs.
    #[inline]
    pub fn increment(&self, extra_cents: f32) -> f32 {
        self.rate_ratio * cents_ratio(self.cents + extra_cents)
    }
}
