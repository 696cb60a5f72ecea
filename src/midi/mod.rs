//! MIDI-side vocabulary shared by the control surface and the voices.
//!
//! Covers key naming, controller numbers, the per-channel controller state
//! the modulators read from, the curve transforms applied to controller
//! values, and the event type that crosses from the control thread to the
//! render thread.

mod channel;
mod event;
mod note;
pub mod transform;

pub use channel::{ChannelState, ControllerEffect};
pub use event::Event;
pub use note::Note;
pub use transform::{Curve, Transform};

/// Highest MIDI key number.
pub const MAX_KEY: u8 = 127;

/// Highest 7-bit controller or velocity value.
pub const MAX_VALUE: u8 = 127;

/// Pitch wheel value meaning "no bend".
pub const PITCH_WHEEL_CENTER: u16 = 8192;

/// Largest 14-bit pitch wheel value.
pub const PITCH_WHEEL_MAX: u16 = 16383;

/// Continuous controller numbers the engine interprets directly.
pub mod cc {
    pub const MODULATION: u8 = 1;
    pub const DATA_ENTRY_MSB: u8 = 6;
    pub const VOLUME: u8 = 7;
    pub const PAN: u8 = 10;
    pub const EXPRESSION: u8 = 11;
    pub const DATA_ENTRY_LSB: u8 = 38;
    pub const SUSTAIN: u8 = 64;
    pub const REVERB_SEND: u8 = 91;
    pub const CHORUS_SEND: u8 = 93;
    pub const NRPN_LSB: u8 = 98;
    pub const NRPN_MSB: u8 = 99;
    pub const RPN_LSB: u8 = 100;
    pub const RPN_MSB: u8 = 101;
    pub const ALL_SOUND_OFF: u8 = 120;
    pub const RESET_ALL_CONTROLLERS: u8 = 121;
    pub const ALL_NOTES_OFF: u8 = 123;
}

/// Standard MIDI note names for display purposes.
/// Maps MIDI note number (0-127) to note name within an octave.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Converts a MIDI note number to a human-readable note name with octave.
///
/// # Arguments
///
/// * `note` - MIDI note number (0-127)
///
/// # Returns
///
/// String representation like "C4" or "F#5"
///
/// # Examples
///
/// ```
/// use sf2synth::midi::note_to_name;
///
/// let name = note_to_name(60); // Middle C
/// assert_eq!(name, "C4");
/// ```
pub fn note_to_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1; // MIDI octave convention
    let note_index = (note % 12) as usize;
    format!("{}{}", NOTE_NAMES[note_index], octave)
}

/// Converts a note name to MIDI note number.
///
/// # Arguments
///
/// * `name` - Note name like "C4" or "F#5"
///
/// # Returns
///
/// MIDI note number (0-127) or None if invalid
pub fn name_to_note(name: &str) -> Option<u8> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    // Find where the octave number starts
    let octave_start = name.chars().position(|c| c.is_ascii_digit() || c == '-')?;

    let note_part = &name[..octave_start];
    let octave_part = &name[octave_start..];

    let note_index = NOTE_NAMES.iter().position(|&n| n == note_part)?;
    let octave: i16 = octave_part.parse().ok()?;

    // MIDI note = (octave + 1) * 12 + note_index
    let midi_note = (octave + 1) * 12 + note_index as i16;
    if (0..=MAX_KEY as i16).contains(&midi_note) {
        Some(midi_note as u8)
    } else {
        None
    }
}

/// Parses a key given either as a number ("69") or a note name ("A4").
pub fn parse_key(text: &str) -> Option<u8> {
    match text.trim().parse::<u8>() {
        Ok(key) if key <= MAX_KEY => Some(key),
        Ok(_) => None,
        Err(_) => name_to_note(text),
    }
}

/// Converts a duration in seconds to a frame count.
///
/// # Arguments
///
/// * `seconds` - Duration in seconds
/// * `sample_rate` - Frames per second
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> u32 {
    (seconds.max(0.0) * sample_rate as f64).round() as u32
}

/// Converts a frame count to seconds.
pub fn frames_to_seconds(frames: u32, sample_rate: u32) -> f64 {
    frames as f64 / sample_rate as f64
}
