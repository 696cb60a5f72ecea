//! Scheduled note representation.
//!
//! A note pairs a note-on and a note-off at frame positions. Offline
//! rendering turns a list of these into engine events.

/// A single note with frame-based timing and dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    /// MIDI note number (0-127). 60 = Middle C (C4).
    pub key: u8,

    /// Note velocity (1-127). Controls volume/intensity.
    pub velocity: u8,

    /// Start time in frames from the beginning of the render.
    pub start: u32,

    /// Duration in frames, measured until the key is released.
    pub duration: u32,
}

impl Note {
    /// Creates a new note with the given parameters.
    ///
    /// # Arguments
    ///
    /// * `key` - MIDI note number (0-127)
    /// * `velocity` - Note velocity (1-127)
    /// * `start` - Start position in frames
    /// * `duration` - Duration in frames
    ///
    /// # Examples
    ///
    /// ```
    /// use sf2synth::midi::Note;
    ///
    /// // A4 held for one second at 44.1 kHz
    /// let note = Note::new(69, 100, 0, 44_100);
    /// assert_eq!(note.end(), 44_100);
    /// ```
    pub fn new(key: u8, velocity: u8, start: u32, duration: u32) -> Self {
        Self {
            key: key.min(127),
            velocity: velocity.clamp(1, 127),
            start,
            duration,
        }
    }

    /// Returns the frame at which the key is released (start + duration).
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.duration)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_creation() {
        let note = Note::new(60, 100, 0, 480);
        assert_eq!(note.key, 60);
        assert_eq!(note.velocity, 100);
        assert_eq!(note.start, 0);
        assert_eq!(note.duration, 480);
    }

    #[test]
    fn test_note_clamping() {
        let note = Note::new(200, 200, 0, 480);
        assert_eq!(note.key, 127);
        assert_eq!(note.velocity, 127);

        // Velocity 0 would mean note-off; scheduled notes always sound.
        assert_eq!(Note::new(60, 0, 0, 10).velocity, 1);
    }
}
