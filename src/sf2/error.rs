//! Error types for bank loading.

use super::riff::Tag;
use thiserror::Error;

/// A bank file could not be parsed.
///
/// Parsing either produces a complete bank or one of these; a partially
/// decoded bank is never returned.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read SoundFont file: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a RIFF file")]
    NotRiff,

    #[error("RIFF form is not a SoundFont bank")]
    NotSoundFont,

    #[error("missing required chunk '{0}'")]
    MissingChunk(&'static str),

    #[error("chunk '{tag}' is truncated: needed {needed} bytes, {available} available")]
    Truncated {
        tag: Tag,
        needed: usize,
        available: usize,
    },

    #[error("chunk '{tag}' declares {size} bytes but only {available} remain")]
    SizeOverrun {
        tag: Tag,
        size: usize,
        available: usize,
    },

    #[error("unsupported SoundFont version {major}.{minor:02}")]
    UnsupportedVersion { major: u16, minor: u16 },

    #[error("chunk '{tag}' has size {size}, not a multiple of its {record}-byte record")]
    BadRecordSize {
        tag: Tag,
        size: usize,
        record: usize,
    },

    #[error("chunk '{0}' is missing its terminal record")]
    MissingTerminal(Tag),
}

/// Inconsistent bounds inside an otherwise well-formed bank.
///
/// These are not fatal: the zone or sample involved is skipped and the
/// rest of the bank loads normally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("sample {index} spans {start}..{end}, outside the {pool}-frame sample pool")]
    SampleOutOfRange {
        index: usize,
        start: u32,
        end: u32,
        pool: usize,
    },

    #[error("sample {index} has loop {loop_start}..{loop_end} outside {start}..{end}")]
    BadLoop {
        index: usize,
        start: u32,
        end: u32,
        loop_start: u32,
        loop_end: u32,
    },

    #[error("zone references sample {index} but the bank has {count}")]
    MissingSample { index: usize, count: usize },

    #[error("zone references instrument {index} but the bank has {count}")]
    InstrumentOutOfRange { index: usize, count: usize },

    #[error("{kind} index range {start}..{end} exceeds the {count} available records")]
    IndexOutOfRange {
        kind: &'static str,
        start: usize,
        end: usize,
        count: usize,
    },
}
