//! Per-channel controller state.

use super::{cc, MAX_KEY, PITCH_WHEEL_CENTER, PITCH_WHEEL_MAX};

/// Default pitch wheel range in cents (two semitones each way).
pub const DEFAULT_PITCH_WHEEL_SENSITIVITY: u16 = 200;

/// RPN value selected by "null" (no parameter).
const RPN_NULL: u8 = 127;

/// Side effects of a controller change that the engine must act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEffect {
    /// Only the stored value changed.
    None,
    /// Sustain pedal went up; deferred note-offs must be released.
    SustainReleased,
    /// Every voice must stop immediately.
    AllSoundOff,
    /// Every held key must be released.
    AllNotesOff,
}

/// Controller values for the engine's single MIDI channel.
///
/// Modulators read their source values from here. Values are plain data so
/// the render thread can update them without synchronization.
#[derive(Debug, Clone)]
pub struct ChannelState {
    controllers: [u8; 128],
    key_pressure: [u8; 128],
    channel_pressure: u8,
    pitch_wheel: u16,
    /// Pitch wheel range in cents.
    pitch_wheel_sensitivity: u16,
    rpn: (u8, u8),
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelState {
    /// Creates a channel with the General MIDI power-on controller values.
    pub fn new() -> Self {
        let mut channel = Self {
            controllers: [0; 128],
            key_pressure: [0; 128],
            channel_pressure: 0,
            pitch_wheel: PITCH_WHEEL_CENTER,
            pitch_wheel_sensitivity: DEFAULT_PITCH_WHEEL_SENSITIVITY,
            rpn: (RPN_NULL, RPN_NULL),
        };
        channel.controllers[cc::VOLUME as usize] = 100;
        channel.controllers[cc::PAN as usize] = 64;
        channel.controllers[cc::EXPRESSION as usize] = 127;
        channel
    }

    /// Returns a controller value.
    pub fn controller(&self, number: u8) -> u8 {
        self.controllers[(number & 0x7f) as usize]
    }

    /// Stores a controller value and interprets the few controllers with
    /// channel-wide side effects.
    ///
    /// # Arguments
    ///
    /// * `number` - Controller number (0-127)
    /// * `value` - Controller value (0-127)
    ///
    /// # Returns
    ///
    /// What the engine must do in response
    pub fn set_controller(&mut self, number: u8, value: u8) -> ControllerEffect {
        let number = number & 0x7f;
        let value = value.min(127);
        let was_sustained = self.sustain_pedal();
        self.controllers[number as usize] = value;

        match number {
            cc::RPN_MSB => self.rpn.0 = value,
            cc::RPN_LSB => self.rpn.1 = value,
            cc::NRPN_MSB | cc::NRPN_LSB => self.rpn = (RPN_NULL, RPN_NULL),
            cc::DATA_ENTRY_MSB if self.rpn == (0, 0) => {
                let cents = self.pitch_wheel_sensitivity % 100;
                self.pitch_wheel_sensitivity = value as u16 * 100 + cents;
            }
            cc::DATA_ENTRY_LSB if self.rpn == (0, 0) => {
                let semitones = self.pitch_wheel_sensitivity / 100;
                self.pitch_wheel_sensitivity = semitones * 100 + value.min(99) as u16;
            }
            cc::SUSTAIN if was_sustained && value < 64 => return ControllerEffect::SustainReleased,
            cc::ALL_SOUND_OFF => return ControllerEffect::AllSoundOff,
            cc::RESET_ALL_CONTROLLERS => {
                self.reset_controllers();
                if was_sustained {
                    return ControllerEffect::SustainReleased;
                }
            }
            cc::ALL_NOTES_OFF => return ControllerEffect::AllNotesOff,
            _ => {}
        }
        ControllerEffect::None
    }

    /// Restores the controllers covered by "Reset All Controllers".
    ///
    /// Volume, pan and the pitch wheel range are left alone, per the
    /// General MIDI recommended practice.
    pub fn reset_controllers(&mut self) {
        self.controllers[cc::MODULATION as usize] = 0;
        self.controllers[cc::EXPRESSION as usize] = 127;
        self.controllers[cc::SUSTAIN as usize] = 0;
        self.key_pressure = [0; 128];
        self.channel_pressure = 0;
        self.pitch_wheel = PITCH_WHEEL_CENTER;
        self.rpn = (RPN_NULL, RPN_NULL);
    }

    /// True while the sustain pedal (CC 64) is down.
    pub fn sustain_pedal(&self) -> bool {
        self.controllers[cc::SUSTAIN as usize] >= 64
    }

    pub fn key_pressure(&self, key: u8) -> u8 {
        self.key_pressure[key.min(MAX_KEY) as usize]
    }

    pub fn set_key_pressure(&mut self, key: u8, value: u8) {
        self.key_pressure[key.min(MAX_KEY) as usize] = value.min(127);
    }

    pub fn channel_pressure(&self) -> u8 {
        self.channel_pressure
    }

    pub fn set_channel_pressure(&mut self, value: u8) {
        self.channel_pressure = value.min(127);
    }

    /// 14-bit pitch wheel value, 8192 at rest.
    pub fn pitch_wheel(&self) -> u16 {
        self.pitch_wheel
    }

    pub fn set_pitch_wheel(&mut self, value: u16) {
        self.pitch_wheel = value.min(PITCH_WHEEL_MAX);
    }

    /// Pitch wheel range in cents.
    pub fn pitch_wheel_sensitivity(&self) -> u16 {
        self.pitch_wheel_sensitivity
    }

    pub fn set_pitch_wheel_sensitivity(&mut self, cents: u16) {
        self.pitch_wheel_sensitivity = cents;
    }
}
