//! Unit conversions and DSP building blocks shared by the voices.
//!
//! SoundFont generators are expressed in logarithmic units (cents,
//! timecents, centibels). These helpers turn them into the linear values
//! the render loop needs, using the tables in [`tables`] so no `pow`/`exp`
//! call happens per sample.

pub mod filter;
pub mod tables;

pub use filter::LowPass;
pub use tables::{attenuation_gain, cents_ratio, pan_gains, warm_up};

/// Frequency of MIDI key 0 (C-1) in Hz; the reference for absolute cents.
pub const LOWEST_NOTE_FREQUENCY: f32 = 8.175_798_9;

/// Envelope output below this level is treated as silence.
pub const NOISE_FLOOR: f32 = 2.0e-7;

/// Attenuation treated as full silence by envelopes, in centibels.
pub const SILENCE_CB: f32 = 960.0;

/// Lowest and highest usable filter cutoff in Hz.
pub const FILTER_MIN_HZ: f32 = 20.0;
pub const FILTER_MAX_HZ: f32 = 20_000.0;

/// Timecent values at or below this are treated as "instant".
pub const INSTANT_TIMECENTS: i32 = -12_000;

/// Converts absolute cents (relative to 8.176 Hz) to a frequency in Hz.
///
/// # Examples
///
/// ```
/// use sf2synth::dsp::absolute_cents_to_hz;
///
/// // 6900 absolute cents is A4.
/// assert!((absolute_cents_to_hz(6900.0) - 440.0).abs() < 0.05);
/// ```
#[inline]
pub fn absolute_cents_to_hz(cents: f32) -> f32 {
    LOWEST_NOTE_FREQUENCY * cents_ratio(cents)
}

/// Converts a timecent duration to a number of frames at `sample_rate`.
///
/// Values at or below [`INSTANT_TIMECENTS`] yield zero frames, which makes
/// the envelope skip the stage.
#[inline]
pub fn timecents_to_frames(timecents: f32, sample_rate: f32) -> u32 {
    if timecents <= INSTANT_TIMECENTS as f32 {
        return 0;
    }
    let seconds = cents_ratio(timecents.min(8_000.0));
    (seconds * sample_rate).round() as u32
}

/// Converts an `f32` sample in `[-1, 1]` to a 16-bit PCM value.
#[inline]
pub fn to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_cents() {
        assert!((absolute_cents_to_hz(0.0) - LOWEST_NOTE_FREQUENCY).abs() < 1e-4);
        assert!((absolute_cents_to_hz(6000.0) - 261.63).abs() < 0.05);
        // Default filter cutoff sits just under 20 kHz.
        let cutoff = absolute_cents_to_hz(13_500.0);
        assert!(cutoff > 19_000.0 && cutoff < 20_000.0);
    }

    #[test]
    fn test_timecents_to_frames() {
        assert_eq!(timecents_to_frames(-12_000.0, 44_100.0), 0);
        assert_eq!(timecents_to_frames(-32_768.0, 44_100.0), 0);
        assert_eq!(timecents_to_frames(0.0, 44_100.0), 44_100);
        assert_eq!(timecents_to_frames(1200.0, 48_000.0), 96_000);
        assert_eq!(timecents_to_frames(-1200.0, 44_100.0), 22_050);
    }

    #[test]
    fn test_to_i16() {
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(1.0), 32767);
        assert_eq!(to_i16(-2.0), -32768);
    }
}
