//! Curve transforms for modulator sources.
//!
//! A controller position in `0..=127` is mapped through one of four curve
//! shapes, optionally reversed (max to min) and optionally made bipolar.
//! Positions may be fractional so 14-bit sources such as the pitch wheel
//! keep their resolution.

use std::sync::LazyLock;

const TABLE_SIZE: usize = 128;
const MAX_POSITION: f32 = 127.0;

/// Curvature of a controller mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Curve {
    /// Straight line from 0 towards 1.
    #[default]
    Linear,
    /// Slow start that accelerates towards 1.
    Concave,
    /// Fast start that decelerates towards 1.
    Convex,
    /// 0 below the midpoint, 1 from it on.
    Switched,
}

impl Curve {
    /// Decodes the curve type field of a modulator source.
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Self::Linear),
            1 => Some(Self::Concave),
            2 => Some(Self::Convex),
            3 => Some(Self::Switched),
            _ => None,
        }
    }
}

/// A complete controller mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transform {
    pub curve: Curve,
    /// Output runs from max to min as the controller increases.
    pub descending: bool,
    /// Output spans `[-1, 1]` instead of `[0, 1]`.
    pub bipolar: bool,
}

struct CurveTables {
    concave: [f32; TABLE_SIZE],
    convex: [f32; TABLE_SIZE],
}

static CURVES: LazyLock<CurveTables> = LazyLock::new(|| {
    let mut concave = [0.0f32; TABLE_SIZE];
    let mut convex = [0.0f32; TABLE_SIZE];
    for i in 0..TABLE_SIZE {
        let x = i as f64;
        concave[i] = if i == TABLE_SIZE - 1 {
            1.0
        } else {
            (-40.0 / 96.0 * ((127.0 - x) / 127.0).log10()) as f32
        };
        convex[i] = if i == 0 {
            0.0
        } else {
            (1.0 + 40.0 / 96.0 * (x / 127.0).log10()) as f32
        };
    }
    CurveTables { concave, convex }
});

/// Forces construction of the curve tables.
pub fn warm_up() {
    LazyLock::force(&CURVES);
}

fn lookup(table: &[f32; TABLE_SIZE], position: f32) -> f32 {
    let position = position.clamp(0.0, MAX_POSITION);
    let index = position as usize;
    let fraction = position - index as f32;
    match table.get(index + 1) {
        Some(next) => table[index] + (next - table[index]) * fraction,
        None => table[index],
    }
}

impl Transform {
    pub const fn new(curve: Curve, descending: bool, bipolar: bool) -> Self {
        Self {
            curve,
            descending,
            bipolar,
        }
    }

    /// Maps a controller position in `0..=127` to the transform's range.
    ///
    /// # Examples
    ///
    /// ```
    /// use sf2synth::midi::{Curve, Transform};
    ///
    /// let pan = Transform::new(Curve::Linear, false, true);
    /// assert_eq!(pan.apply(64.0), 0.0);
    /// ```
    pub fn apply(&self, position: f32) -> f32 {
        let position = position.clamp(0.0, MAX_POSITION);
        let tables = &*CURVES;
        let unipolar = match (self.curve, self.descending) {
            (Curve::Linear, false) => position / TABLE_SIZE as f32,
            (Curve::Linear, true) => 1.0 - position / TABLE_SIZE as f32,
            (Curve::Concave, false) => lookup(&tables.concave, position),
            (Curve::Concave, true) => lookup(&tables.concave, MAX_POSITION - position),
            (Curve::Convex, false) => lookup(&tables.convex, position),
            (Curve::Convex, true) => lookup(&tables.convex, MAX_POSITION - position),
            (Curve::Switched, descending) => {
                let high = position >= (TABLE_SIZE / 2) as f32;
                if high != descending {
                    1.0
                } else {
                    0.0
                }
            }
        };
        if self.bipolar {
            2.0 * unipolar - 1.0
        } else {
            unipolar
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear() {
        let t = Transform::new(Curve::Linear, false, false);
        assert_eq!(t.apply(0.0), 0.0);
        assert_eq!(t.apply(64.0), 0.5);
        assert_eq!(t.apply(500.0), 127.0 / 128.0);

        let t = Transform::new(Curve::Linear, true, false);
        assert_eq!(t.apply(0.0), 1.0);
    }

    #[test]
    fn test_concave_and_convex_are_monotonic() {
        for curve in [Curve::Concave, Curve::Convex] {
            let up = Transform::new(curve, false, false);
            let down = Transform::new(curve, true, false);
            let mut last_up = -1.0;
            let mut last_down = 2.0;
            for i in 0..=127 {
                let value = up.apply(i as f32);
                assert!(value >= last_up, "{:?} not ascending at {}", curve, i);
                assert!((0.0..=1.0).contains(&value));
                last_up = value;

                let value = down.apply(i as f32);
                assert!(value <= last_down, "{:?} not descending at {}", curve, i);
                last_down = value;
            }
        }
    }

    #[test]
    fn test_concave_endpoints() {
        let t = Transform::new(Curve::Concave, false, false);
        assert_eq!(t.apply(0.0), 0.0);
        assert_eq!(t.apply(127.0), 1.0);
        // Descending concave is the velocity-to-attenuation curve.
        let t = Transform::new(Curve::Concave, true, false);
        assert_eq!(t.apply(0.0), 1.0);
        assert_eq!(t.apply(127.0), 0.0);
    }

    #[test]
    fn test_switched() {
        let t = Transform::new(Curve::Switched, false, false);
        assert_eq!(t.apply(63.0), 0.0);
        assert_eq!(t.apply(64.0), 1.0);
        let t = Transform::new(Curve::Switched, true, true);
        assert_eq!(t.apply(0.0), 1.0);
        assert_eq!(t.apply(127.0), -1.0);
    }

    #[test]
    fn test_bipolar_range() {
        let t = Transform::new(Curve::Linear, false, true);
        assert_eq!(t.apply(0.0), -1.0);
        assert_eq!(t.apply(64.0), 0.0);
        assert!(t.apply(127.0) < 1.0);
    }

    #[test]
    fn test_curve_from_raw() {
        assert_eq!(Curve::from_raw(2), Some(Curve::Convex));
        assert_eq!(Curve::from_raw(9), None);
    }
}
