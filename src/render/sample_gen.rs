//! Interpolated sample playback with loop handling.

use crate::bank::{GeneratorIndex as G, GeneratorSet, SampleBuffer};
use crate::config::Interpolation;
use crate::dsp::tables::cubic_weights;

/// Frames covered by one unit of a coarse address offset.
const COARSE_OFFSET: i64 = 32_768;

/// How a voice treats the sample's loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Play start to end once.
    #[default]
    None,
    /// Loop for the whole life of the voice.
    Continuous,
    /// Loop while the key is held, then play through to the end.
    UntilRelease,
}

impl LoopMode {
    pub fn from_generator(value: i32) -> Self {
        match value {
            1 => Self::Continuous,
            3 => Self::UntilRelease,
            _ => Self::None,
        }
    }
}

/// Playback range of a voice, in frames relative to the sample start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    /// Start and exclusive end of the loop, if one is usable.
    pub looped: Option<(usize, usize)>,
}

impl Bounds {
    /// Applies the zone's address offsets to a sample's bounds.
    ///
    /// Offsets are clamped to the sample; a loop is kept only when
    /// `start <= loop_start < loop_end <= end` still holds afterwards.
    pub fn new(generators: &GeneratorSet, buffer: &SampleBuffer) -> Self {
        let len = buffer.len() as i64;
        let offset = |fine: G, coarse: G| {
            generators.get(fine) as i64 + generators.get(coarse) as i64 * COARSE_OFFSET
        };
        let start = offset(G::StartAddressOffset, G::StartAddressCoarseOffset).clamp(0, len);
        let end = (len + offset(G::EndAddressOffset, G::EndAddressCoarseOffset)).clamp(start, len);
        let looped = buffer.loop_points().and_then(|(loop_start, loop_end)| {
            let loop_start = loop_start as i64
                + offset(G::StartLoopAddressOffset, G::StartLoopAddressCoarseOffset);
            let loop_end =
                loop_end as i64 + offset(G::EndLoopAddressOffset, G::EndLoopAddressCoarseOffset);
            (start <= loop_start && loop_start < loop_end && loop_end <= end)
                .then_some((loop_start as usize, loop_end as usize))
        });
        Self {
            start: start as usize,
            end: end as usize,
            looped,
        }
    }
}

/// Fractional read position into a sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleCursor {
    position: usize,
    fraction: f32,
    bounds: Bounds,
    mode: LoopMode,
    released: bool,
    finished: bool,
}

impl SampleCursor {
    pub fn new(bounds: Bounds, mode: LoopMode) -> Self {
        let mode = if bounds.looped.is_some() {
            mode
        } else {
            LoopMode::None
        };
        Self {
            position: bounds.start,
            fraction: 0.0,
            bounds,
            mode,
            released: false,
            finished: bounds.start >= bounds.end,
        }
    }

    /// Key released: a loop-until-release sample plays on to its end.
    pub fn release(&mut self) {
        self.released = true;
    }

    /// Whether the cursor has run past the end of a non-looping sample.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    fn loop_range(&self) -> Option<(usize, usize)> {
        match self.mode {
            LoopMode::Continuous => self.bounds.looped,
            LoopMode::UntilRelease if !self.released => self.bounds.looped,
            _ => None,
        }
    }

    /// Frame at an absolute index, wrapped into the loop while looping and
    /// silent past the end.
    #[inline]
    fn at(&self, buffer: &SampleBuffer, index: usize) -> f32 {
        let index = match self.loop_range() {
            Some((loop_start, loop_end)) if index >= loop_end => {
                loop_start + (index - loop_end) % (loop_end - loop_start)
            }
            _ => index,
        };
        if index >= self.bounds.end {
            0.0
        } else {
            buffer.frame(index as isize)
        }
    }

    /// Returns the interpolated value at the cursor and advances it.
    ///
    /// # Arguments
    ///
    /// * `buffer` - The sample the cursor was created for
    /// * `increment` - Frames to advance, from the pitch
    /// * `interpolation` - Interpolation kernel
    #[inline]
    pub fn next(
        &mut self,
        buffer: &SampleBuffer,
        increment: f32,
        interpolation: Interpolation,
    ) -> f32 {
        if self.finished {
            return 0.0;
        }
        let p = self.position;
        let value = match interpolation {
            Interpolation::Linear => {
                let a = self.at(buffer, p);
                let b = self.at(buffer, p + 1);
                a + (b - a) * self.fraction
            }
            Interpolation::Cubic => {
                let w = cubic_weights(self.fraction);
                let before = if p == 0 {
                    buffer.frame(-1)
                } else {
                    self.at(buffer, p - 1)
                };
                w[0] * before
                    + w[1] * self.at(buffer, p)
                    + w[2] * self.at(buffer, p + 1)
                    + w[3] * self.at(buffer, p + 2)
            }
        };
        self.advance(increment);
        value
    }

    /// Moves the cursor forward. A step is capped at one pass over the
    /// sample, and a step that is not a number ends playback.
    #[inline]
    fn advance(&mut self, increment: f32) {
        if !increment.is_finite() {
            self.finished = true;
            return;
        }
        let limit = self.bounds.end as f32 + 1.0;
        self.fraction += increment.clamp(0.0, limit);
        let whole = self.fraction.floor();
        self.fraction -= whole;
        self.position = self.position.saturating_add(whole as usize);
        match self.loop_range() {
            Some((loop_start, loop_end)) if self.position >= loop_end => {
                self.position = loop_start + (self.position - loop_end) % (loop_end - loop_start);
            }
            _ => {
                if self.position >= self.bounds.end {
                    self.finished = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::{SampleHeader, SampleKind};

    fn buffer(frames: &[f32], loop_points: (u32, u32)) -> SampleBuffer {
        let header = SampleHeader {
            name: "ramp".to_string(),
            start: 0,
            end: frames.len() as u32,
            loop_start: loop_points.0,
            loop_end: loop_points.1,
            sample_rate: 44_100,
            original_key: 60,
            pitch_correction: 0,
            link: 0,
            kind: SampleKind::Mono,
        };
        SampleBuffer::from_frames(header, frames)
    }

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| i as f32 / len as f32).collect()
    }

    #[test]
    fn test_one_shot_plays_to_end() {
        let buffer = buffer(&ramp(8), (2, 6));
        let bounds = Bounds::new(&GeneratorSet::defaults(), &buffer);
        let mut cursor = SampleCursor::new(bounds, LoopMode::None);
        let values: Vec<f32> = (0..8)
            .map(|_| cursor.next(&buffer, 1.0, Interpolation::Linear))
            .collect();
        assert_eq!(values, ramp(8));
        assert!(cursor.is_finished());
        assert_eq!(cursor.next(&buffer, 1.0, Interpolation::Linear), 0.0);
    }

    #[test]
    fn test_continuous_loop_wraps() {
        let buffer = buffer(&ramp(8), (2, 6));
        let bounds = Bounds::new(&GeneratorSet::defaults(), &buffer);
        let mut cursor = SampleCursor::new(bounds, LoopMode::Continuous);
        let positions: Vec<usize> = (0..10)
            .map(|_| {
                let p = cursor.position();
                cursor.next(&buffer, 1.0, Interpolation::Linear);
                p
            })
            .collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4, 5, 2, 3, 4, 5]);
        cursor.release();
        assert!(!cursor.is_finished());
    }

    #[test]
    fn test_loop_until_release_plays_out() {
        let buffer = buffer(&ramp(8), (2, 6));
        let bounds = Bounds::new(&GeneratorSet::defaults(), &buffer);
        let mut cursor = SampleCursor::new(bounds, LoopMode::UntilRelease);
        for _ in 0..20 {
            cursor.next(&buffer, 1.0, Interpolation::Linear);
        }
        assert!(!cursor.is_finished());
        cursor.release();
        for _ in 0..8 {
            cursor.next(&buffer, 1.0, Interpolation::Linear);
        }
        assert!(cursor.is_finished());
    }

    #[test]
    fn test_linear_interpolation_across_loop_seam() {
        let frames = [0.0, 0.0, 1.0, 0.0, 0.0, -1.0, 0.0, 0.0];
        let buffer = buffer(&frames, (2, 6));
        let bounds = Bounds::new(&GeneratorSet::defaults(), &buffer);
        let mut cursor = SampleCursor::new(bounds, LoopMode::Continuous);
        for _ in 0..5 {
            cursor.next(&buffer, 1.0, Interpolation::Linear);
        }
        // At frame 5 halfway towards the wrapped frame 2.
        let mut half = cursor;
        half.fraction = 0.5;
        assert_eq!(half.next(&buffer, 0.0, Interpolation::Linear), 0.0);
    }

    #[test]
    fn test_cubic_hits_sample_points() {
        let frames = ramp(16);
        let buffer = buffer(&frames, (0, 0));
        let bounds = Bounds::new(&GeneratorSet::defaults(), &buffer);
        let mut cursor = SampleCursor::new(bounds, LoopMode::None);
        for expected in frames.iter().take(10) {
            let value = cursor.next(&buffer, 1.0, Interpolation::Cubic);
            assert!((value - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_address_offsets() {
        let buffer = buffer(&ramp(100), (20, 80));
        let mut generators = GeneratorSet::defaults();
        generators.set(G::StartAddressOffset, 10);
        generators.set(G::EndAddressOffset, -10);
        generators.set(G::StartLoopAddressOffset, 5);
        generators.set(G::EndLoopAddressOffset, -5);
        let bounds = Bounds::new(&generators, &buffer);
        assert_eq!(bounds.start, 10);
        assert_eq!(bounds.end, 90);
        assert_eq!(bounds.looped, Some((25, 75)));

        generators.set(G::EndLoopAddressOffset, 20);
        assert_eq!(Bounds::new(&generators, &buffer).looped, None);

        generators.set(G::StartAddressCoarseOffset, 1);
        let bounds = Bounds::new(&generators, &buffer);
        assert_eq!(bounds.start, 100);
        let cursor = SampleCursor::new(bounds, LoopMode::Continuous);
        assert!(cursor.is_finished());
    }

    #[test]
    fn test_huge_increment_stays_in_bounds() {
        let buffer = buffer(&ramp(8), (2, 6));
        let bounds = Bounds::new(&GeneratorSet::defaults(), &buffer);
        let mut looped = SampleCursor::new(bounds, LoopMode::Continuous);
        for _ in 0..4 {
            looped.next(&buffer, 1e30, Interpolation::Cubic);
            assert!((2..6).contains(&looped.position()));
        }
        assert!(!looped.is_finished());

        let mut one_shot = SampleCursor::new(bounds, LoopMode::None);
        one_shot.next(&buffer, f32::MAX, Interpolation::Linear);
        assert!(one_shot.is_finished());
    }

    #[test]
    fn test_non_finite_increment_finishes() {
        let buffer = buffer(&ramp(8), (2, 6));
        let bounds = Bounds::new(&GeneratorSet::defaults(), &buffer);
        for increment in [f32::INFINITY, f32::NAN] {
            let mut cursor = SampleCursor::new(bounds, LoopMode::Continuous);
            cursor.next(&buffer, increment, Interpolation::Linear);
            assert!(cursor.is_finished());
            assert_eq!(cursor.next(&buffer, 1.0, Interpolation::Linear), 0.0);
        }
    }

    #[test]
    fn test_sample_modes() {
        assert_eq!(LoopMode::from_generator(0), LoopMode::None);
        assert_eq!(LoopMode::from_generator(1), LoopMode::Continuous);
        assert_eq!(LoopMode::from_generator(2), LoopMode::None);
        assert_eq!(LoopMode::from_generator(3), LoopMode::UntilRelease);
    }
}
