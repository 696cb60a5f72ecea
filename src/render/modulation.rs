//! Evaluates a voice's modulators against the current controller state.
//!
//! Each modulator reads a source value, maps it through its curve, scales
//! it by the optional amount source and its amount, and adds the result to
//! its destination generator. Contributions to one destination simply sum,
//! so their order does not matter.

use crate::bank::generator::GENERATOR_COUNT;
use crate::bank::modulator::{Destination, GeneralController, SourceKind};
use crate::bank::{GeneratorIndex, GeneratorSet, Modulator, ModulatorSet, Source};
use crate::midi::ChannelState;

/// Longest chain of linked modulators that is followed.
const MAX_LINK_DEPTH: usize = 8;

/// Generator values after modulation, in the generators' own units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameters {
    values: [f32; GENERATOR_COUNT],
}

impl Parameters {
    /// Unmodulated values.
    pub fn from_generators(generators: &GeneratorSet) -> Self {
        let mut values = [0.0; GENERATOR_COUNT];
        for (i, value) in values.iter_mut().enumerate() {
            if let Some(index) = GeneratorIndex::from_raw(i as u16) {
                *value = generators.get(index) as f32;
            }
        }
        Self { values }
    }

    /// A value clamped to its generator's legal range.
    #[inline]
    pub fn get(&self, index: GeneratorIndex) -> f32 {
        let definition = index.definition();
        self.values[index as usize].clamp(definition.min as f32, definition.max as f32)
    }

    /// The raw sum of base value and modulation.
    #[inline]
    pub fn raw(&self, index: GeneratorIndex) -> f32 {
        self.values[index as usize]
    }
}

/// What a voice's modulators read from.
#[derive(Debug, Clone, Copy)]
pub struct ModulationContext<'a> {
    pub channel: &'a ChannelState,
    pub key: u8,
    pub velocity: u8,
}

impl ModulationContext<'_> {
    /// Controller position of a source in `0..=127`, or `None` for "no
    /// controller" and links, which are resolved by the caller.
    fn position(&self, source: Source) -> Option<f32> {
        let channel = self.channel;
        Some(match source.kind()? {
            SourceKind::Controller(number) => channel.controller(number) as f32,
            SourceKind::General(general) => match general {
                GeneralController::None | GeneralController::Link => return None,
                GeneralController::NoteOnVelocity => self.velocity as f32,
                GeneralController::NoteOnKey => self.key as f32,
                GeneralController::PolyPressure => channel.key_pressure(self.key) as f32,
                GeneralController::ChannelPressure => channel.channel_pressure() as f32,
                GeneralController::PitchWheel => channel.pitch_wheel() as f32 / 128.0,
                GeneralController::PitchWheelSensitivity => {
                    channel.pitch_wheel_sensitivity() as f32 / 100.0
                }
            },
        })
    }
}

fn output(
    modulators: &[Modulator],
    index: usize,
    context: &ModulationContext<'_>,
    depth: usize,
) -> f32 {
    let modulator = &modulators[index];
    let position = if modulator.source.is_link() {
        if depth >= MAX_LINK_DEPTH {
            return 0.0;
        }
        let linked: f32 = modulators
            .iter()
            .enumerate()
            .filter(|(_, m)| m.destination() == Some(Destination::Link(index)))
            .map(|(i, _)| output(modulators, i, context, depth + 1))
            .sum();
        linked.round().clamp(0.0, 127.0)
    } else {
        match context.position(modulator.source) {
            Some(position) => position,
            None => return 0.0,
        }
    };

    let mut value = modulator.source.transform().apply(position);
    if value == 0.0 {
        return 0.0;
    }
    if let Some(amount_position) = context.position(modulator.amount_source) {
        value *= modulator.amount_source.transform().apply(amount_position);
    }
    value *= modulator.amount as f32;
    if modulator.is_absolute() {
        value.abs()
    } else {
        value
    }
}

/// Adds every modulator's contribution to the base generator values.
///
/// # Arguments
///
/// * `generators` - Resolved base values
/// * `modulators` - The voice's modulators
/// * `context` - Controller state and note to read sources from
///
/// # Returns
///
/// The modulated parameters
pub fn modulate(
    generators: &GeneratorSet,
    modulators: &ModulatorSet,
    context: &ModulationContext<'_>,
) -> Parameters {
    let mut parameters = Parameters::from_generators(generators);
    let list = modulators.as_slice();
    for (index, modulator) in list.iter().enumerate() {
        if let Some(Destination::Generator(target)) = modulator.destination() {
            parameters.values[target as usize] += output(list, index, context, 0);
        }
    }
    parameters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::modulator::DEFAULT_MODULATORS;
    use crate::midi::{cc, Curve};

    const G: GeneratorIndex = GeneratorIndex::InitialFilterCutoff;

    fn context(channel: &ChannelState, velocity: u8) -> ModulationContext<'_> {
        ModulationContext {
            channel,
            key: 60,
            velocity,
        }
    }

    fn set(modulators: &[Modulator]) -> ModulatorSet {
        let mut set = ModulatorSet::new();
        for m in modulators {
            set.push(*m);
        }
        set
    }

    #[test]
    fn test_no_modulators_keeps_base() {
        let channel = ChannelState::new();
        let generators = GeneratorSet::defaults();
        let params = modulate(&generators, &ModulatorSet::new(), &context(&channel, 100));
        assert_eq!(params.get(G), 13_500.0);
        assert_eq!(params.get(GeneratorIndex::ScaleTuning), 100.0);
    }

    #[test]
    fn test_same_destination_contributions_sum_in_any_order() {
        let channel = ChannelState::new();
        let generators = GeneratorSet::defaults();
        let key = Modulator::new(
            Source::general(GeneralController::NoteOnKey),
            GeneratorIndex::InitialAttenuation,
            256,
            Source::NONE,
        );
        let velocity = Modulator::new(
            Source::general(GeneralController::NoteOnVelocity),
            GeneratorIndex::InitialAttenuation,
            128,
            Source::NONE,
        );
        let ctx = context(&channel, 64);
        let forward = modulate(&generators, &set(&[key, velocity]), &ctx);
        let backward = modulate(&generators, &set(&[velocity, key]), &ctx);
        let key_only = modulate(&generators, &set(&[key]), &ctx);
        let velocity_only = modulate(&generators, &set(&[velocity]), &ctx);

        // 60/128 * 256 + 64/128 * 128
        assert_eq!(forward.raw(GeneratorIndex::InitialAttenuation), 184.0);
        assert_eq!(forward, backward);
        assert_eq!(
            forward.raw(GeneratorIndex::InitialAttenuation),
            key_only.raw(GeneratorIndex::InitialAttenuation)
                + velocity_only.raw(GeneratorIndex::InitialAttenuation)
        );
    }

    #[test]
    fn test_default_velocity_to_attenuation() {
        let channel = ChannelState::new();
        let generators = GeneratorSet::defaults();
        let modulators = set(&DEFAULT_MODULATORS);
        let loud = modulate(&generators, &modulators, &context(&channel, 127));
        let soft = modulate(&generators, &modulators, &context(&channel, 1));
        let attenuation = GeneratorIndex::InitialAttenuation;
        assert!(loud.get(attenuation) < soft.get(attenuation));
        assert!(loud.get(attenuation) < 100.0);
        assert!(soft.get(attenuation) > 800.0);
    }

    #[test]
    fn test_pitch_wheel_to_fine_tune() {
        let mut channel = ChannelState::new();
        let generators = GeneratorSet::defaults();
        let modulators = set(&DEFAULT_MODULATORS);
        let fine = GeneratorIndex::FineTune;

        let centered = modulate(&generators, &modulators, &context(&channel, 100));
        assert_eq!(centered.get(fine), 0.0);

        channel.set_pitch_wheel(16_383);
        let up = modulate(&generators, &modulators, &context(&channel, 100));
        // The wheel tops out at 127/128 of its range.
        assert!((up.get(fine) - 195.3).abs() < 1.0, "{}", up.get(fine));

        channel.set_pitch_wheel(0);
        let down = modulate(&generators, &modulators, &context(&channel, 100));
        assert!((down.get(fine) + 198.4).abs() < 1.0, "{}", down.get(fine));
    }

    #[test]
    fn test_pan_controller() {
        let mut channel = ChannelState::new();
        let generators = GeneratorSet::defaults();
        let modulators = set(&DEFAULT_MODULATORS);
        assert_eq!(
            modulate(&generators, &modulators, &context(&channel, 100)).get(GeneratorIndex::Pan),
            0.0
        );
        channel.set_controller(cc::PAN, 0);
        let left = modulate(&generators, &modulators, &context(&channel, 100));
        assert_eq!(left.get(GeneratorIndex::Pan), -500.0);
    }

    #[test]
    fn test_amount_source_scales() {
        let mut channel = ChannelState::new();
        channel.set_controller(cc::MODULATION, 127);
        let generators = GeneratorSet::defaults();
        let modulator = Modulator::new(
            Source::general(GeneralController::NoteOnVelocity),
            G,
            1000,
            Source::controller(cc::MODULATION),
        );
        let params = modulate(&generators, &set(&[modulator]), &context(&channel, 64));
        let expected = 13_500.0 + 0.5 * (127.0 / 128.0) * 1000.0;
        assert!((params.raw(G) - expected).abs() < 1e-2);

        channel.set_controller(cc::MODULATION, 0);
        let params = modulate(&generators, &set(&[modulator]), &context(&channel, 64));
        assert_eq!(params.raw(G), 13_500.0);
    }

    #[test]
    fn test_no_source_contributes_nothing() {
        let channel = ChannelState::new();
        let generators = GeneratorSet::defaults();
        let modulator = Modulator::new(Source::NONE, G, 1000, Source::NONE);
        let params = modulate(&generators, &set(&[modulator]), &context(&channel, 64));
        assert_eq!(params.raw(G), 13_500.0);
    }

    #[test]
    fn test_absolute_transform() {
        let channel = ChannelState::new();
        let generators = GeneratorSet::zeroed();
        let mut modulator = Modulator::new(
            Source::general(GeneralController::NoteOnVelocity).bipolar(),
            GeneratorIndex::Pan,
            -100,
            Source::NONE,
        );
        let plain = modulate(&generators, &set(&[modulator]), &context(&channel, 127));
        assert!(plain.raw(GeneratorIndex::Pan) < 0.0);
        modulator.transform = 2;
        let absolute = modulate(&generators, &set(&[modulator]), &context(&channel, 127));
        assert_eq!(absolute.raw(GeneratorIndex::Pan), -plain.raw(GeneratorIndex::Pan));
    }

    #[test]
    fn test_linked_modulator_feeds_source() {
        let channel = ChannelState::new();
        let generators = GeneratorSet::zeroed();
        let mut feeder = Modulator::new(
            Source::general(GeneralController::NoteOnVelocity),
            GeneratorIndex::Unused1,
            128,
            Source::NONE,
        );
        feeder.destination = (1 << 15) | 1;
        let linked = Modulator::new(
            Source::general(GeneralController::Link),
            GeneratorIndex::Pan,
            100,
            Source::NONE,
        );
        // Velocity 64 feeds position 64 into the linked modulator.
        let params = modulate(&generators, &set(&[feeder, linked]), &context(&channel, 64));
        assert_eq!(params.raw(GeneratorIndex::Pan), 50.0);
    }

    #[test]
    fn test_link_cycle_is_silent() {
        let channel = ChannelState::new();
        let generators = GeneratorSet::zeroed();
        let mut a = Modulator::new(
            Source::general(GeneralController::Link),
            GeneratorIndex::Unused1,
            127,
            Source::NONE,
        );
        a.destination = (1 << 15) | 1;
        let mut b = a;
        b.destination = 1 << 15;
        let c = Modulator::new(
            Source::general(GeneralController::Link).with_curve(Curve::Linear),
            GeneratorIndex::Pan,
            100,
            Source::NONE,
        );
        let params = modulate(&generators, &set(&[a, b, c]), &context(&channel, 64));
        assert_eq!(params.raw(GeneratorIndex::Pan), 0.0);
    }
}
