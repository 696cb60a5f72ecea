//! Precomputed lookup tables for the render path.
//!
//! Every curve the voices need per sample (interpolation weights, pan law,
//! cent ratios, centibel gains and the LFO sine) is computed once into a
//! single static table set. The render thread only ever indexes into it.

use std::f64::consts::PI;
use std::sync::LazyLock;

/// Number of fractional positions in the cubic interpolation table.
pub const CUBIC_RESOLUTION: usize = 1024;

/// Largest attenuation covered by the gain table, in centibels.
pub const MAX_ATTENUATION_CB: usize = 1440;

/// Pan positions span -500..=500 (tenths of a percent).
pub const PAN_RANGE: usize = 500;

/// Entries in one full cycle of the sine table.
pub const SINE_SIZE: usize = 2048;

const CENTS_PER_OCTAVE: usize = 1200;

/// All lookup tables, built together.
pub struct Tables {
    /// Catmull-Rom weights for x[-1], x[0], x[1], x[2].
    pub cubic: Box<[[f32; 4]; CUBIC_RESOLUTION]>,
    /// `sin(i * (pi / 2) / 1000)` for the constant-power pan law.
    pub pan: [f32; 2 * PAN_RANGE + 1],
    /// `2^(i / 1200)` for `i` in `0..=1200`.
    pub cents: [f32; CENTS_PER_OCTAVE + 1],
    /// `10^(-cb / 200)` for `cb` in `0..=1440`.
    pub attenuation: [f32; MAX_ATTENUATION_CB + 1],
    /// One full sine cycle with a closing guard entry.
    pub sine: [f32; SINE_SIZE + 1],
}

impl Tables {
    fn build() -> Self {
        let mut cubic = Box::new([[0.0f32; 4]; CUBIC_RESOLUTION]);
        for (i, weights) in cubic.iter_mut().enumerate() {
            let x = i as f64 / CUBIC_RESOLUTION as f64;
            let x2 = x * x;
            let x3 = x2 * x;
            *weights = [
                (-0.5 * x3 + x2 - 0.5 * x) as f32,
                (1.5 * x3 - 2.5 * x2 + 1.0) as f32,
                (-1.5 * x3 + 2.0 * x2 + 0.5 * x) as f32,
                (0.5 * x3 - 0.5 * x2) as f32,
            ];
        }

        let mut pan = [0.0f32; 2 * PAN_RANGE + 1];
        for (i, value) in pan.iter_mut().enumerate() {
            *value = (i as f64 * (PI / 2.0) / (2 * PAN_RANGE) as f64).sin() as f32;
        }

        let mut cents = [0.0f32; CENTS_PER_OCTAVE + 1];
        for (i, value) in cents.iter_mut().enumerate() {
            *value = 2f64.powf(i as f64 / CENTS_PER_OCTAVE as f64) as f32;
        }

        let mut attenuation = [0.0f32; MAX_ATTENUATION_CB + 1];
        for (i, value) in attenuation.iter_mut().enumerate() {
            *value = 10f64.powf(-(i as f64) / 200.0) as f32;
        }

        let mut sine = [0.0f32; SINE_SIZE + 1];
        for (i, value) in sine.iter_mut().enumerate() {
            *value = (i as f64 * 2.0 * PI / SINE_SIZE as f64).sin() as f32;
        }

        Self {
            cubic,
            pan,
            cents,
            attenuation,
            sine,
        }
    }
}

static TABLES: LazyLock<Tables> = LazyLock::new(Tables::build);

/// Returns the shared table set, building it on first use.
#[inline]
pub fn tables() -> &'static Tables {
    &TABLES
}

/// Forces table construction.
///
/// Called when an engine is created so the first render block never pays
/// for building the tables.
pub fn warm_up() {
    LazyLock::force(&TABLES);
}

/// Interpolation weights for a fractional position in `[0, 1)`.
#[inline]
pub fn cubic_weights(fraction: f32) -> &'static [f32; 4] {
    let index = ((fraction * CUBIC_RESOLUTION as f32) as usize).min(CUBIC_RESOLUTION - 1);
    &tables().cubic[index]
}

/// Left and right gains for a pan position in tenths of a percent.
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let pan = pan.clamp(-(PAN_RANGE as f32), PAN_RANGE as f32).round() as i32;
    let table = &tables().pan;
    let left = table[(PAN_RANGE as i32 - pan) as usize];
    let right = table[(PAN_RANGE as i32 + pan) as usize];
    (left, right)
}

/// Frequency ratio for a (possibly negative, fractional) cent offset.
#[inline]
pub fn cents_ratio(cents: f32) -> f32 {
    let floor = cents.floor();
    let fraction = cents - floor;
    let whole = floor as i32;
    let octave = whole.div_euclid(CENTS_PER_OCTAVE as i32);
    let partial = whole.rem_euclid(CENTS_PER_OCTAVE as i32) as usize;
    let table = &tables().cents;
    let within = table[partial] + (table[partial + 1] - table[partial]) * fraction;
    within * 2f32.powi(octave)
}

/// Linear gain for an attenuation in centibels. Negative values amplify.
#[inline]
pub fn attenuation_gain(centibels: f32) -> f32 {
    if centibels < 0.0 {
        return 1.0 / attenuation_gain(-centibels);
    }
    if centibels >= MAX_ATTENUATION_CB as f32 {
        return 0.0;
    }
    let whole = centibels as usize;
    let fraction = centibels - whole as f32;
    let table = &tables().attenuation;
    table[whole] + (table[whole + 1] - table[whole]) * fraction
}

/// Sine of a phase given in cycles; any real phase is accepted.
#[inline]
pub fn sine(phase: f32) -> f32 {
    let phase = phase - phase.floor();
    let position = phase * SINE_SIZE as f32;
    let index = (position as usize).min(SINE_SIZE - 1);
    let fraction = position - index as f32;
    let table = &tables().sine;
    table[index] + (table[index + 1] - table[index]) * fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubic_weights_sum_to_one() {
        for i in 0..CUBIC_RESOLUTION {
            let sum: f32 = tables().cubic[i].iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "row {} sums to {}", i, sum);
        }
        assert_eq!(cubic_weights(0.0), &[0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_pan_law() {
        let (left, right) = pan_gains(0.0);
        assert!((left - right).abs() < 1e-6);
        assert!((left - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-4);

        assert_eq!(pan_gains(-500.0), (1.0, 0.0));
        let (left, right) = pan_gains(900.0);
        assert!(left.abs() < 1e-6);
        assert!((right - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cents_ratio() {
        assert!((cents_ratio(0.0) - 1.0).abs() < 1e-6);
        assert!((cents_ratio(1200.0) - 2.0).abs() < 1e-5);
        assert!((cents_ratio(-1200.0) - 0.5).abs() < 1e-6);
        assert!((cents_ratio(700.0) - 1.498_307).abs() < 1e-4);
        assert!((cents_ratio(-2400.5) - 2f32.powf(-2400.5 / 1200.0)).abs() < 1e-5);
    }

    #[test]
    fn test_attenuation_gain() {
        assert_eq!(attenuation_gain(0.0), 1.0);
        assert!((attenuation_gain(200.0) - 0.1).abs() < 1e-6);
        assert!((attenuation_gain(60.0) - 0.501_187).abs() < 1e-5);
        assert!((attenuation_gain(-200.0) - 10.0).abs() < 1e-3);
        assert_eq!(attenuation_gain(1440.0), 0.0);
        assert_eq!(attenuation_gain(5000.0), 0.0);
    }

    #[test]
    fn test_sine() {
        assert!(sine(0.0).abs() < 1e-6);
        assert!((sine(0.25) - 1.0).abs() < 1e-5);
        assert!((sine(0.75) + 1.0).abs() < 1e-5);
        assert!((sine(1.25) - 1.0).abs() < 1e-5);
        assert!((sine(-0.25) + 1.0).abs() < 1e-5);
    }
}
