//! Generators: the named synthesis parameters of a zone.

use crate::sf2::records::GeneratorRecord;
use std::fmt;

/// Number of defined generator operators (0..=58).
pub const GENERATOR_COUNT: usize = 59;

/// Generator operator, numbered as in the file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum GeneratorIndex {
    StartAddressOffset = 0,
    EndAddressOffset,
    StartLoopAddressOffset,
    EndLoopAddressOffset,
    StartAddressCoarseOffset,
    ModLfoToPitch,
    VibLfoToPitch,
    ModEnvToPitch,
    InitialFilterCutoff,
    InitialFilterResonance,
    ModLfoToFilterCutoff,
    ModEnvToFilterCutoff,
    EndAddressCoarseOffset,
    ModLfoToVolume,
    Unused1,
    ChorusEffectSend,
    ReverbEffectSend,
    Pan,
    Unused2,
    Unused3,
    Unused4,
    DelayModLfo,
    FrequencyModLfo,
    DelayVibLfo,
    FrequencyVibLfo,
    DelayModEnv,
    AttackModEnv,
    HoldModEnv,
    DecayModEnv,
    SustainModEnv,
    ReleaseModEnv,
    KeyToModEnvHold,
    KeyToModEnvDecay,
    DelayVolEnv,
    AttackVolEnv,
    HoldVolEnv,
    DecayVolEnv,
    SustainVolEnv,
    ReleaseVolEnv,
    KeyToVolEnvHold,
    KeyToVolEnvDecay,
    Instrument,
    Reserved1,
    KeyRange,
    VelocityRange,
    StartLoopAddressCoarseOffset,
    ForcedKey,
    ForcedVelocity,
    InitialAttenuation,
    Reserved2,
    EndLoopAddressCoarseOffset,
    CoarseTune,
    FineTune,
    SampleId,
    SampleModes,
    Reserved3,
    ScaleTuning,
    ExclusiveClass,
    OverridingRootKey,
}

/// Unit of a generator amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Index or plain unsigned number.
    Unsigned,
    /// Sample frames.
    Offset,
    /// Multiples of 32768 sample frames.
    CoarseOffset,
    /// Plain signed number (e.g. per-key scaling).
    Signed,
    /// Pitch in cents.
    Cents,
    /// Attenuation in centibels.
    Centibels,
    /// Tenths of a percent, 0..=1000.
    TenthPercent,
    /// Tenths of a percent, -500..=500.
    SignedTenthPercent,
    /// Absolute cents relative to 8.176 Hz.
    FrequencyCents,
    /// Duration as 1200 * log2(seconds).
    Timecents,
    Semitones,
    /// Low and high bytes of an inclusive range.
    Range,
}

/// Static description of a generator.
#[derive(Debug, Clone, Copy)]
pub struct Definition {
    pub index: GeneratorIndex,
    pub name: &'static str,
    pub kind: ValueKind,
    /// Whether a preset zone may use this generator.
    pub in_preset: bool,
    pub default: i32,
    /// Inclusive bounds applied to the resolved value.
    pub min: i32,
    pub max: i32,
}

const fn def(
    index: GeneratorIndex,
    name: &'static str,
    kind: ValueKind,
    in_preset: bool,
    default: i32,
    min: i32,
    max: i32,
) -> Definition {
    Definition {
        index,
        name,
        kind,
        in_preset,
        default,
        min,
        max,
    }
}

use GeneratorIndex as G;
use ValueKind as K;

const I16_MIN: i32 = i16::MIN as i32;
const I16_MAX: i32 = i16::MAX as i32;

/// Every generator, indexed by operator number.
pub static DEFINITIONS: [Definition; GENERATOR_COUNT] = [
    def(G::StartAddressOffset, "startAddrsOffset", K::Offset, false, 0, I16_MIN, I16_MAX),
    def(G::EndAddressOffset, "endAddrsOffset", K::Offset, false, 0, I16_MIN, I16_MAX),
    def(G::StartLoopAddressOffset, "startloopAddrsOffset", K::Offset, false, 0, I16_MIN, I16_MAX),
    def(G::EndLoopAddressOffset, "endloopAddrsOffset", K::Offset, false, 0, I16_MIN, I16_MAX),
    def(G::StartAddressCoarseOffset, "startAddrsCoarseOffset", K::CoarseOffset, false, 0, I16_MIN, I16_MAX),
    def(G::ModLfoToPitch, "modLfoToPitch", K::Cents, true, 0, -12_000, 12_000),
    def(G::VibLfoToPitch, "vibLfoToPitch", K::Cents, true, 0, -12_000, 12_000),
    def(G::ModEnvToPitch, "modEnvToPitch", K::Cents, true, 0, -12_000, 12_000),
    def(G::InitialFilterCutoff, "initialFilterFc", K::FrequencyCents, true, 13_500, 1_500, 13_500),
    def(G::InitialFilterResonance, "initialFilterQ", K::Centibels, true, 0, 0, 960),
    def(G::ModLfoToFilterCutoff, "modLfoToFilterFc", K::Signed, true, 0, -12_000, 12_000),
    def(G::ModEnvToFilterCutoff, "modEnvToFilterFc", K::Signed, true, 0, -12_000, 12_000),
    def(G::EndAddressCoarseOffset, "endAddrsCoarseOffset", K::CoarseOffset, false, 0, I16_MIN, I16_MAX),
    def(G::ModLfoToVolume, "modLfoToVolume", K::Centibels, true, 0, -960, 960),
    def(G::Unused1, "unused1", K::Signed, false, 0, I16_MIN, I16_MAX),
    def(G::ChorusEffectSend, "chorusEffectsSend", K::TenthPercent, true, 0, 0, 1_000),
    def(G::ReverbEffectSend, "reverbEffectsSend", K::TenthPercent, true, 0, 0, 1_000),
    def(G::Pan, "pan", K::SignedTenthPercent, true, 0, -500, 500),
    def(G::Unused2, "unused2", K::Unsigned, false, 0, I16_MIN, I16_MAX),
    def(G::Unused3, "unused3", K::Unsigned, false, 0, I16_MIN, I16_MAX),
    def(G::Unused4, "unused4", K::Unsigned, false, 0, I16_MIN, I16_MAX),
    def(G::DelayModLfo, "delayModLFO", K::Timecents, true, -12_000, -12_000, 5_000),
    def(G::FrequencyModLfo, "freqModLFO", K::FrequencyCents, true, 0, -16_000, 4_500),
    def(G::DelayVibLfo, "delayVibLFO", K::Timecents, true, -12_000, -12_000, 5_000),
    def(G::FrequencyVibLfo, "freqVibLFO", K::FrequencyCents, true, 0, -16_000, 4_500),
    def(G::DelayModEnv, "delayModEnv", K::Timecents, true, -12_000, -12_000, 5_000),
    def(G::AttackModEnv, "attackModEnv", K::Timecents, true, -12_000, -12_000, 8_000),
    def(G::HoldModEnv, "holdModEnv", K::Timecents, true, -12_000, -12_000, 5_000),
    def(G::DecayModEnv, "decayModEnv", K::Timecents, true, -12_000, -12_000, 8_000),
    def(G::SustainModEnv, "sustainModEnv", K::TenthPercent, true, 0, 0, 1_000),
    def(G::ReleaseModEnv, "releaseModEnv", K::Timecents, true, -12_000, -12_000, 8_000),
    def(G::KeyToModEnvHold, "keynumToModEnvHold", K::Signed, true, 0, -1_200, 1_200),
    def(G::KeyToModEnvDecay, "keynumToModEnvDecay", K::Signed, true, 0, -1_200, 1_200),
    def(G::DelayVolEnv, "delayVolEnv", K::Timecents, true, -12_000, -12_000, 5_000),
    def(G::AttackVolEnv, "attackVolEnv", K::Timecents, true, -12_000, -12_000, 8_000),
    def(G::HoldVolEnv, "holdVolEnv", K::Timecents, true, -12_000, -12_000, 5_000),
    def(G::DecayVolEnv, "decayVolEnv", K::Timecents, true, -12_000, -12_000, 8_000),
    def(G::SustainVolEnv, "sustainVolEnv", K::Centibels, true, 0, 0, 1_440),
    def(G::ReleaseVolEnv, "releaseVolEnv", K::Timecents, true, -12_000, -12_000, 8_000),
    def(G::KeyToVolEnvHold, "keynumToVolEnvHold", K::Signed, true, 0, -1_200, 1_200),
    def(G::KeyToVolEnvDecay, "keynumToVolEnvDecay", K::Signed, true, 0, -1_200, 1_200),
    def(G::Instrument, "instrument", K::Unsigned, true, 0, 0, u16::MAX as i32),
    def(G::Reserved1, "reserved1", K::Signed, false, 0, I16_MIN, I16_MAX),
    def(G::KeyRange, "keyRange", K::Range, true, 0x7f00, 0, u16::MAX as i32),
    def(G::VelocityRange, "velRange", K::Range, true, 0x7f00, 0, u16::MAX as i32),
    def(G::StartLoopAddressCoarseOffset, "startloopAddrsCoarseOffset", K::CoarseOffset, false, 0, I16_MIN, I16_MAX),
    def(G::ForcedKey, "keynum", K::Signed, false, -1, -1, 127),
    def(G::ForcedVelocity, "velocity", K::Signed, false, -1, -1, 127),
    def(G::InitialAttenuation, "initialAttenuation", K::Centibels, true, 0, 0, 1_440),
    def(G::Reserved2, "reserved2", K::Unsigned, false, 0, I16_MIN, I16_MAX),
    def(G::EndLoopAddressCoarseOffset, "endloopAddrsCoarseOffset", K::CoarseOffset, false, 0, I16_MIN, I16_MAX),
    def(G::CoarseTune, "coarseTune", K::Semitones, true, 0, -120, 120),
    def(G::FineTune, "fineTune", K::Cents, true, 0, -12_700, 12_700),
    def(G::SampleId, "sampleID", K::Unsigned, false, 0, 0, u16::MAX as i32),
    def(G::SampleModes, "sampleModes", K::Unsigned, false, 0, 0, 3),
    def(G::Reserved3, "reserved3", K::Signed, false, 0, I16_MIN, I16_MAX),
    def(G::ScaleTuning, "scaleTuning", K::Unsigned, true, 100, 0, 1_200),
    def(G::ExclusiveClass, "exclusiveClass", K::Unsigned, false, 0, 0, 127),
    def(G::OverridingRootKey, "overridingRootKey", K::Signed, false, -1, -1, 127),
];

impl GeneratorIndex {
    /// Maps an operator number to its generator; unknown operators
    /// (including the `endOper` terminator) return `None`.
    pub fn from_raw(raw: u16) -> Option<Self> {
        DEFINITIONS.get(raw as usize).map(|d| d.index)
    }

    pub fn definition(self) -> &'static Definition {
        &DEFINITIONS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.definition().name
    }

    /// Whether a preset zone may adjust this generator.
    pub fn valid_in_preset(self) -> bool {
        self.definition().in_preset
    }

    /// Generators that describe zone structure rather than sound and are
    /// therefore never applied as values.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            G::KeyRange | G::VelocityRange | G::Instrument | G::SampleId
        )
    }
}

impl fmt::Display for GeneratorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The raw 16-bit amount of a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Amount(pub u16);

impl Amount {
    pub fn signed(self) -> i16 {
        self.0 as i16
    }

    pub fn unsigned(self) -> u16 {
        self.0
    }

    /// Inclusive `(low, high)` bounds of a range amount.
    pub fn range(self) -> (u8, u8) {
        ((self.0 & 0xff) as u8, (self.0 >> 8) as u8)
    }

    /// The amount as a value of the given kind.
    pub fn value(self, kind: ValueKind) -> i32 {
        match kind {
            ValueKind::Unsigned | ValueKind::Range => self.unsigned() as i32,
            _ => self.signed() as i32,
        }
    }
}

/// A decoded generator: operator plus amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generator {
    pub index: GeneratorIndex,
    pub amount: Amount,
}

impl Generator {
    pub fn new(index: GeneratorIndex, amount: u16) -> Self {
        Self {
            index,
            amount: Amount(amount),
        }
    }

    /// Decodes a record, dropping unknown operators.
    pub fn from_record(record: &GeneratorRecord) -> Option<Self> {
        GeneratorIndex::from_raw(record.operator).map(|index| Self::new(index, record.amount))
    }

    /// The amount interpreted according to the generator's kind.
    pub fn value(&self) -> i32 {
        self.amount.value(self.index.definition().kind)
    }
}

/// A value for every generator.
///
/// Used both for resolved voice parameters (starting from the defaults)
/// and for preset-level adjustments (starting from zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorSet {
    values: [i32; GENERATOR_COUNT],
}

impl Default for GeneratorSet {
    fn default() -> Self {
        Self::defaults()
    }
}

impl GeneratorSet {
    /// Every generator at its default value.
    pub fn defaults() -> Self {
        let mut values = [0; GENERATOR_COUNT];
        for (value, definition) in values.iter_mut().zip(DEFINITIONS.iter()) {
            *value = definition.default;
        }
        Self { values }
    }

    /// Every generator at zero; the starting point for preset adjustments.
    pub fn zeroed() -> Self {
        Self {
            values: [0; GENERATOR_COUNT],
        }
    }

    #[inline]
    pub fn get(&self, index: GeneratorIndex) -> i32 {
        self.values[index as usize]
    }

    #[inline]
    pub fn set(&mut self, index: GeneratorIndex, value: i32) {
        self.values[index as usize] = value;
    }

    /// Adds every value of `other` onto this set.
    pub fn add(&mut self, other: &GeneratorSet) {
        for (value, offset) in self.values.iter_mut().zip(other.values.iter()) {
            *value = value.saturating_add(*offset);
        }
    }

    /// A value clamped to its generator's legal range.
    #[inline]
    pub fn clamped(&self, index: GeneratorIndex) -> i32 {
        let definition = index.definition();
        self.get(index).clamp(definition.min, definition.max)
    }
}
