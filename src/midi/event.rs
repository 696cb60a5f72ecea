//! Events sent from the control thread to the render thread.

use midly::live::LiveEvent;
use midly::MidiMessage;

/// A control-surface event.
///
/// Events are small `Copy` values so they can travel through the
/// preallocated ring buffer without allocating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    NoteOn { key: u8, velocity: u8 },
    NoteOff { key: u8 },
    ControlChange { controller: u8, value: u8 },
    /// 14-bit pitch wheel value, 8192 at rest.
    PitchBend(u16),
    ChannelPressure(u8),
    KeyPressure { key: u8, pressure: u8 },
    /// Index into the active bank's preset list.
    SelectPreset(usize),
    /// Silence every voice immediately.
    StopAllNotes,
    ResetControllers,
}

impl Event {
    /// Decodes a live MIDI channel message.
    ///
    /// The channel nibble is ignored since the engine plays a single
    /// channel. System messages and program changes return `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sf2synth::midi::Event;
    ///
    /// let event = Event::from_midi_bytes(&[0x90, 69, 100]);
    /// assert_eq!(event, Some(Event::NoteOn { key: 69, velocity: 100 }));
    /// ```
    pub fn from_midi_bytes(bytes: &[u8]) -> Option<Self> {
        let LiveEvent::Midi { message, .. } = LiveEvent::parse(bytes).ok()? else {
            return None;
        };
        let event = match message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => Event::NoteOn {
                key: key.as_int(),
                velocity: vel.as_int(),
            },
            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                Event::NoteOff { key: key.as_int() }
            }
            MidiMessage::Aftertouch { key, vel } => Event::KeyPressure {
                key: key.as_int(),
                pressure: vel.as_int(),
            },
            MidiMessage::Controller { controller, value } => Event::ControlChange {
                controller: controller.as_int(),
                value: value.as_int(),
            },
            MidiMessage::ChannelAftertouch { vel } => Event::ChannelPressure(vel.as_int()),
            MidiMessage::PitchBend { bend } => Event::PitchBend(bend.0.as_int()),
            MidiMessage::ProgramChange { .. } => return None,
        };
        Some(event)
    }
}
