//! Modulator definitions and the default modulator set.

use super::generator::GeneratorIndex;
use crate::midi::{Curve, Transform};
use crate::sf2::records::ModulatorRecord;

const CC_FLAG: u16 = 1 << 7;
const DESCENDING_FLAG: u16 = 1 << 8;
const BIPOLAR_FLAG: u16 = 1 << 9;
const CURVE_SHIFT: u16 = 10;

/// Destination bit marking a link to another modulator.
const LINK_FLAG: u16 = 1 << 15;

/// Transform operator taking the absolute value of the output.
const ABSOLUTE_VALUE_TRANSFORM: u16 = 2;

/// Non-CC controller sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GeneralController {
    None = 0,
    NoteOnVelocity = 2,
    NoteOnKey = 3,
    PolyPressure = 10,
    ChannelPressure = 13,
    PitchWheel = 14,
    PitchWheelSensitivity = 16,
    Link = 127,
}

impl GeneralController {
    fn from_index(index: u8) -> Option<Self> {
        Some(match index {
            0 => Self::None,
            2 => Self::NoteOnVelocity,
            3 => Self::NoteOnKey,
            10 => Self::PolyPressure,
            13 => Self::ChannelPressure,
            14 => Self::PitchWheel,
            16 => Self::PitchWheelSensitivity,
            127 => Self::Link,
            _ => return None,
        })
    }
}

/// What a source reads its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    General(GeneralController),
    Controller(u8),
}

/// A 16-bit modulator source descriptor.
///
/// Bits 0..=6 hold the controller index, bit 7 selects MIDI CCs, bit 8
/// reverses the direction, bit 9 makes the output bipolar and bits 10..
/// select the curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Source(pub u16);

impl Source {
    pub const NONE: Source = Source(0);

    pub const fn general(controller: GeneralController) -> Self {
        Self(controller as u16)
    }

    pub const fn controller(number: u8) -> Self {
        Self((number as u16 & 0x7f) | CC_FLAG)
    }

    pub const fn descending(self) -> Self {
        Self(self.0 | DESCENDING_FLAG)
    }

    pub const fn bipolar(self) -> Self {
        Self(self.0 | BIPOLAR_FLAG)
    }

    pub const fn with_curve(self, curve: Curve) -> Self {
        Self((self.0 & !(0x3f << CURVE_SHIFT)) | ((curve as u16) << CURVE_SHIFT))
    }

    pub fn index(self) -> u8 {
        (self.0 & 0x7f) as u8
    }

    pub fn is_controller(self) -> bool {
        self.0 & CC_FLAG != 0
    }

    pub fn kind(self) -> Option<SourceKind> {
        if self.is_controller() {
            Some(SourceKind::Controller(self.index()))
        } else {
            GeneralController::from_index(self.index()).map(SourceKind::General)
        }
    }

    /// True when the source contributes nothing (general controller 0).
    pub fn is_none(self) -> bool {
        self.kind() == Some(SourceKind::General(GeneralController::None))
    }

    /// True when the source is the output of a linked modulator.
    pub fn is_link(self) -> bool {
        self.kind() == Some(SourceKind::General(GeneralController::Link))
    }

    pub fn curve(self) -> Option<Curve> {
        Curve::from_raw(self.0 >> CURVE_SHIFT)
    }

    /// The curve transform this source applies.
    pub fn transform(self) -> Transform {
        Transform::new(
            self.curve().unwrap_or_default(),
            self.0 & DESCENDING_FLAG != 0,
            self.0 & BIPOLAR_FLAG != 0,
        )
    }

    /// Checks the curve type and the controller index.
    ///
    /// CC sources may not use bank select, data entry, the LSB block,
    /// (N)RPN selection or the channel mode messages.
    pub fn is_valid(self) -> bool {
        if self.curve().is_none() {
            return false;
        }
        if self.is_controller() {
            let index = self.index();
            !(index == 0
                || index == 6
                || (32..=63).contains(&index)
                || index == 98
                || index == 101
                || index >= 120)
        } else {
            GeneralController::from_index(self.index()).is_some()
        }
    }
}

/// Where a modulator's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Generator(GeneratorIndex),
    /// Index of another modulator in the same zone.
    Link(usize),
}

/// One modulator definition from a zone, or from the default set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modulator {
    pub source: Source,
    pub destination: u16,
    pub amount: i16,
    pub amount_source: Source,
    pub transform: u16,
}

impl Modulator {
    pub const fn new(
        source: Source,
        destination: GeneratorIndex,
        amount: i16,
        amount_source: Source,
    ) -> Self {
        Self {
            source,
            destination: destination as u16,
            amount,
            amount_source,
            transform: 0,
        }
    }

    pub fn from_record(record: &ModulatorRecord) -> Self {
        Self {
            source: Source(record.source),
            destination: record.destination,
            amount: record.amount,
            amount_source: Source(record.amount_source),
            transform: record.transform,
        }
    }

    /// The decoded destination, or `None` for an unknown generator.
    pub fn destination(&self) -> Option<Destination> {
        if self.destination & LINK_FLAG != 0 {
            Some(Destination::Link((self.destination & !LINK_FLAG) as usize))
        } else {
            GeneratorIndex::from_raw(self.destination).map(Destination::Generator)
        }
    }

    /// Whether the output is passed through an absolute value.
    pub fn is_absolute(&self) -> bool {
        self.transform == ABSOLUTE_VALUE_TRANSFORM
    }

    /// Two modulators are identical when they share source, destination
    /// and amount source; the later of two identical ones wins.
    pub fn same_identity(&self, other: &Modulator) -> bool {
        self.source == other.source
            && self.destination == other.destination
            && self.amount_source == other.amount_source
    }

    /// Rejects modulators that can never produce a usable value.
    pub fn is_valid(&self) -> bool {
        self.source.is_valid()
            && self.amount_source.is_valid()
            && !self.amount_source.is_link()
            && self.destination().is_some()
            && (self.transform == 0 || self.transform == ABSOLUTE_VALUE_TRANSFORM)
    }
}

use GeneralController as Gc;
use GeneratorIndex as G;

/// Modulators every voice starts with.
///
/// A bank modulator aimed at the same destination generator replaces the
/// default for that destination.
pub static DEFAULT_MODULATORS: [Modulator; 10] = [
    Modulator::new(
        Source::general(Gc::NoteOnVelocity)
            .descending()
            .with_curve(Curve::Concave),
        G::InitialAttenuation,
        960,
        Source::NONE,
    ),
    Modulator::new(
        Source::general(Gc::NoteOnVelocity).descending(),
        G::InitialFilterCutoff,
        -2400,
        Source::NONE,
    ),
    Modulator::new(
        Source::general(Gc::ChannelPressure),
        G::VibLfoToPitch,
        50,
        Source::NONE,
    ),
    Modulator::new(Source::controller(1), G::VibLfoToPitch, 50, Source::NONE),
    Modulator::new(
        Source::controller(7).descending().with_curve(Curve::Concave),
        G::InitialAttenuation,
        960,
        Source::NONE,
    ),
    Modulator::new(Source::controller(10).bipolar(), G::Pan, 1000, Source::NONE),
    Modulator::new(
        Source::controller(11).descending().with_curve(Curve::Concave),
        G::InitialAttenuation,
        960,
        Source::NONE,
    ),
    Modulator::new(Source::controller(91), G::ReverbEffectSend, 200, Source::NONE),
    Modulator::new(Source::controller(93), G::ChorusEffectSend, 200, Source::NONE),
    Modulator::new(
        Source::general(Gc::PitchWheel).bipolar(),
        G::FineTune,
        12_700,
        Source::general(Gc::PitchWheelSensitivity),
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_bits() {
        let source = Source(0x0502);
        assert_eq!(source.index(), 2);
        assert!(!source.is_controller());
        assert_eq!(
            source.kind(),
            Some(SourceKind::General(GeneralController::NoteOnVelocity))
        );
        assert_eq!(source.curve(), Some(Curve::Concave));
        let transform = source.transform();
        assert!(transform.descending);
        assert!(!transform.bipolar);
        assert_eq!(DEFAULT_MODULATORS[0].source, source);
    }

    #[test]
    fn test_source_validity() {
        assert!(Source::controller(1).is_valid());
        assert!(!Source::controller(0).is_valid());
        assert!(!Source::controller(6).is_valid());
        assert!(!Source::controller(40).is_valid());
        assert!(!Source::controller(101).is_valid());
        assert!(!Source::controller(121).is_valid());
        assert!(!Source(5).is_valid());
        assert!(!Source(0x1000 | 2).is_valid());
        assert!(Source::NONE.is_valid());
        assert!(Source::NONE.is_none());
    }

    #[test]
    fn test_destinations() {
        let mut modulator = DEFAULT_MODULATORS[5];
        assert_eq!(
            modulator.destination(),
            Some(Destination::Generator(GeneratorIndex::Pan))
        );
        modulator.destination = 0x8003;
        assert_eq!(modulator.destination(), Some(Destination::Link(3)));
        modulator.destination = 70;
        assert_eq!(modulator.destination(), None);
        assert!(!modulator.is_valid());
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(DEFAULT_MODULATORS.iter().all(|m| m.is_valid()));
        let pitch = &DEFAULT_MODULATORS[9];
        assert_eq!(pitch.amount, 12_700);
        assert_eq!(
            pitch.amount_source.kind(),
            Some(SourceKind::General(GeneralController::PitchWheelSensitivity))
        );
    }

    #[test]
    fn test_identity() {
        let a = DEFAULT_MODULATORS[3];
        let mut b = a;
        b.amount = 200;
        assert!(a.same_identity(&b));
        b.amount_source = Source::controller(2);
        assert!(!a.same_identity(&b));
    }
}
