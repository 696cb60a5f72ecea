//! Sample headers and decoded PCM buffers.

use crate::sf2::records::SampleRecord;
use crate::sf2::RangeError;
use rayon::prelude::*;
use tracing::debug;

/// Zero frames stored before and after every decoded buffer so
/// interpolation can read neighbours without bounds failures.
pub const GUARD_FRAMES: usize = 4;

const SCALE_16: f32 = 1.0 / 32_768.0;
const SCALE_24: f32 = 1.0 / 8_388_608.0;

/// Channel role of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Mono,
    Right,
    Left,
    Linked,
    /// Stored in a ROM the file does not contain.
    Rom,
}

impl SampleKind {
    pub fn from_raw(raw: u16) -> Self {
        if raw & 0x8000 != 0 {
            return Self::Rom;
        }
        match raw & 0x0f {
            2 => Self::Right,
            4 => Self::Left,
            8 => Self::Linked,
            _ => Self::Mono,
        }
    }
}

/// Sample header with offsets into the shared sample pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleHeader {
    pub name: String,
    pub start: u32,
    pub end: u32,
    pub loop_start: u32,
    pub loop_end: u32,
    pub sample_rate: u32,
    /// MIDI key at which the sample plays at its recorded pitch.
    pub original_key: u8,
    /// Tuning correction in cents.
    pub pitch_correction: i8,
    /// Index of the other half of a stereo pair.
    pub link: u16,
    pub kind: SampleKind,
}

impl From<&SampleRecord> for SampleHeader {
    fn from(record: &SampleRecord) -> Self {
        Self {
            name: record.name.clone(),
            start: record.start,
            end: record.end,
            loop_start: record.loop_start,
            loop_end: record.loop_end,
            sample_rate: record.sample_rate,
            original_key: record.original_key,
            pitch_correction: record.pitch_correction,
            link: record.link,
            kind: SampleKind::from_raw(record.kind),
        }
    }
}

/// Decoded PCM for one sample plus its loop and tuning data.
///
/// Loop points are relative to the first frame of the buffer.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    pub header: SampleHeader,
    data: Box<[f32]>,
    frames: usize,
    loop_points: Option<(usize, usize)>,
}

impl SampleBuffer {
    /// Builds a buffer from already-normalized frames.
    pub fn from_frames(header: SampleHeader, frames: &[f32]) -> Self {
        let mut data = vec![0.0f32; frames.len() + 2 * GUARD_FRAMES];
        data[GUARD_FRAMES..GUARD_FRAMES + frames.len()].copy_from_slice(frames);
        let loop_points = relative_loop(&header, frames.len());
        Self {
            header,
            data: data.into_boxed_slice(),
            frames: frames.len(),
            loop_points,
        }
    }

    /// Number of frames, guards excluded.
    pub fn len(&self) -> usize {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Frame at a position relative to the start; anything outside the
    /// sample reads as silence.
    #[inline]
    pub fn frame(&self, position: isize) -> f32 {
        let index = position + GUARD_FRAMES as isize;
        if index < 0 {
            return 0.0;
        }
        self.data.get(index as usize).copied().unwrap_or(0.0)
    }

    pub fn frames(&self) -> &[f32] {
        &self.data[GUARD_FRAMES..GUARD_FRAMES + self.frames]
    }

    /// Loop start and end (exclusive) relative to the start, when the
    /// header describes a usable loop.
    pub fn loop_points(&self) -> Option<(usize, usize)> {
        self.loop_points
    }
}

fn relative_loop(header: &SampleHeader, frames: usize) -> Option<(usize, usize)> {
    if header.loop_start < header.start || header.loop_end > header.end {
        return None;
    }
    let start = (header.loop_start - header.start) as usize;
    let end = (header.loop_end - header.start) as usize;
    (start < end && end <= frames).then_some((start, end))
}

fn decode_one(
    index: usize,
    record: &SampleRecord,
    pcm: &[u8],
    pcm_24: Option<&[u8]>,
) -> Result<SampleBuffer, RangeError> {
    let header = SampleHeader::from(record);
    let pool = pcm.len() / 2;
    let (start, end) = (record.start as usize, record.end as usize);
    if header.kind == SampleKind::Rom || start > end || end > pool {
        return Err(RangeError::SampleOutOfRange {
            index,
            start: record.start,
            end: record.end,
            pool,
        });
    }

    let frames: Vec<f32> = match pcm_24 {
        Some(low) => (start..end)
            .map(|i| {
                let high = i16::from_le_bytes([pcm[2 * i], pcm[2 * i + 1]]) as i32;
                let low = low.get(i).copied().unwrap_or(0) as i32;
                ((high << 8) | low) as f32 * SCALE_24
            })
            .collect(),
        None => (start..end)
            .map(|i| i16::from_le_bytes([pcm[2 * i], pcm[2 * i + 1]]) as f32 * SCALE_16)
            .collect(),
    };

    let buffer = SampleBuffer::from_frames(header, &frames);
    if buffer.loop_points.is_none() && record.loop_end > record.loop_start {
        let error = RangeError::BadLoop {
            index,
            start: record.start,
            end: record.end,
            loop_start: record.loop_start,
            loop_end: record.loop_end,
        };
        debug!("{}; looping disabled", error);
    }
    Ok(buffer)
}

/// Decodes every sample header's PCM in parallel.
///
/// The terminal `EOS` record must already be excluded. Samples whose
/// bounds fall outside the pool come back as errors so zones referencing
/// them can be skipped.
pub fn decode_samples(
    records: &[SampleRecord],
    pcm: &[u8],
    pcm_24: Option<&[u8]>,
) -> Vec<Result<SampleBuffer, RangeError>> {
    records
        .par_iter()
        .enumerate()
        .map(|(index, record)| decode_one(index, record, pcm, pcm_24))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(start: u32, end: u32, loop_start: u32, loop_end: u32) -> SampleRecord {
        SampleRecord {
            name: "test".to_string(),
            start,
            end,
            loop_start,
            loop_end,
            sample_rate: 44_100,
            original_key: 60,
            pitch_correction: 0,
            link: 0,
            kind: 1,
        }
    }

    fn pcm(values: &[i16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_decode_16_bit() {
        let data = pcm(&[0, 16_384, -32_768, 32_767, 0, 0]);
        let decoded = decode_samples(&[record(1, 4, 1, 3)], &data, None);
        let buffer = decoded[0].as_ref().unwrap();
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.frames(), &[0.5, -1.0, 32_767.0 / 32_768.0]);
        assert_eq!(buffer.loop_points(), Some((0, 2)));
        assert_eq!(buffer.frame(-1), 0.0);
        assert_eq!(buffer.frame(-100), 0.0);
        assert_eq!(buffer.frame(3), 0.0);
        assert_eq!(buffer.frame(1), -1.0);
    }

    #[test]
    fn test_decode_24_bit() {
        let data = pcm(&[1, -1]);
        let low = [0x80u8, 0x00];
        let decoded = decode_samples(&[record(0, 2, 0, 0)], &data, Some(&low));
        let buffer = decoded[0].as_ref().unwrap();
        assert_eq!(buffer.frames()[0], 384.0 / 8_388_608.0);
        assert_eq!(buffer.frames()[1], -256.0 / 8_388_608.0);
    }

    #[test]
    fn test_out_of_range_sample() {
        let data = pcm(&[0; 8]);
        let decoded = decode_samples(&[record(4, 20, 5, 6)], &data, None);
        assert!(matches!(
            decoded[0],
            Err(RangeError::SampleOutOfRange { index: 0, pool: 8, .. })
        ));
    }

    #[test]
    fn test_bad_loop_disables_looping() {
        let data = pcm(&[0; 16]);
        let decoded = decode_samples(&[record(2, 10, 8, 12)], &data, None);
        assert_eq!(decoded[0].as_ref().unwrap().loop_points(), None);
        let decoded = decode_samples(&[record(2, 10, 6, 6)], &data, None);
        assert_eq!(decoded[0].as_ref().unwrap().loop_points(), None);
    }

    #[test]
    fn test_sample_kind() {
        assert_eq!(SampleKind::from_raw(1), SampleKind::Mono);
        assert_eq!(SampleKind::from_raw(2), SampleKind::Right);
        assert_eq!(SampleKind::from_raw(4), SampleKind::Left);
        assert_eq!(SampleKind::from_raw(0x8001), SampleKind::Rom);
    }
}
