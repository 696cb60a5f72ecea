//! One sounding note.
//!
//! A voice owns everything it needs to render: a copy of its resolved
//! generators and modulators, the sample cursor, two envelopes, two LFOs
//! and a filter. It refers to its sample by index and receives the sample
//! data from the engine on every block, so a voice never holds a borrow of
//! the bank.

use super::envelope::{Envelope, EnvelopeKind, EnvelopeParams};
use super::lfo::Lfo;
use super::modulation::{modulate, ModulationContext, Parameters};
use super::pitch::Pitch;
use super::sample_gen::{Bounds, LoopMode, SampleCursor};
use super::BusBuffers;
use crate::bank::{GeneratorIndex as G, GeneratorSet, ModulatorSet, SampleBuffer, VoiceSetup};
use crate::config::Interpolation;
use crate::dsp::{absolute_cents_to_hz, attenuation_gain, pan_gains, LowPass};
use crate::midi::ChannelState;

/// Frames between filter coefficient updates.
const CONTROL_INTERVAL: u32 = 32;

/// Lowest and highest filter cutoff reachable through modulation, in
/// absolute cents.
const CUTOFF_RANGE: (f32, f32) = (1500.0, 13_500.0);

/// Lifecycle of a pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    /// Free for a new note.
    Idle,
    /// Key held (or held by the sustain pedal).
    Active,
    /// Key released; the envelopes are in their release stage.
    Releasing,
}

/// Values derived from the modulated parameters once per block.
#[derive(Debug, Clone, Copy, Default)]
struct Mix {
    gain: f32,
    left: f32,
    right: f32,
    chorus: f32,
    reverb: f32,
    cutoff_cents: f32,
    resonance: f32,
    vib_lfo_to_pitch: f32,
    mod_lfo_to_pitch: f32,
    mod_env_to_pitch: f32,
    mod_lfo_to_cutoff: f32,
    mod_env_to_cutoff: f32,
    mod_lfo_to_volume: f32,
}

impl Mix {
    fn new(params: &Parameters) -> Self {
        let (left, right) = pan_gains(params.get(G::Pan));
        Self {
            gain: attenuation_gain(params.get(G::InitialAttenuation)),
            left,
            right,
            chorus: params.get(G::ChorusEffectSend) / 1000.0,
            reverb: params.get(G::ReverbEffectSend) / 1000.0,
            cutoff_cents: params.get(G::InitialFilterCutoff),
            resonance: params.get(G::InitialFilterResonance),
            vib_lfo_to_pitch: params.get(G::VibLfoToPitch),
            mod_lfo_to_pitch: params.get(G::ModLfoToPitch),
            mod_env_to_pitch: params.get(G::ModEnvToPitch),
            mod_lfo_to_cutoff: params.get(G::ModLfoToFilterCutoff),
            mod_env_to_cutoff: params.get(G::ModEnvToFilterCutoff),
            mod_lfo_to_volume: params.get(G::ModLfoToVolume),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Voice {
    state: VoiceState,
    setup: VoiceSetup,
    /// Key as played, used to match note-offs.
    key: u8,
    /// Key and velocity after forced overrides, used for synthesis.
    effective_key: u8,
    effective_velocity: u8,
    /// Note-on counter value of the note that started the voice.
    serial: u64,
    /// Note-off arrived while the sustain pedal was down.
    sustained: bool,
    exclusive_class: i32,
    sample_rate: f32,
    params: Parameters,
    mix: Mix,
    pitch: Pitch,
    cursor: SampleCursor,
    volume_envelope: Envelope,
    modulation_envelope: Envelope,
    vibrato: Lfo,
    modulation_lfo: Lfo,
    filter: LowPass,
    control_countdown: u32,
    /// Most recent output gain, used to pick a voice to steal.
    gain: f32,
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}

fn forced(value: i32, played: u8) -> u8 {
    if (0..=127).contains(&value) {
        value as u8
    } else {
        played
    }
}

impl Voice {
    /// An idle voice.
    pub fn new() -> Self {
        let setup = VoiceSetup {
            generators: GeneratorSet::defaults(),
            modulators: ModulatorSet::new(),
            sample: 0,
            key: 0,
            velocity: 0,
        };
        Self {
            state: VoiceState::Idle,
            params: Parameters::from_generators(&setup.generators),
            setup,
            key: 0,
            effective_key: 0,
            effective_velocity: 0,
            serial: 0,
            sustained: false,
            exclusive_class: 0,
            sample_rate: 44_100.0,
            mix: Mix::default(),
            pitch: Pitch::default(),
            cursor: SampleCursor::default(),
            volume_envelope: Envelope::new(EnvelopeKind::Volume),
            modulation_envelope: Envelope::new(EnvelopeKind::Modulation),
            vibrato: Lfo::default(),
            modulation_lfo: Lfo::default(),
            filter: LowPass::default(),
            control_countdown: 0,
            gain: 0.0,
        }
    }

    /// Starts the voice for a resolved note.
    ///
    /// # Arguments
    ///
    /// * `setup` - Resolved generators, modulators and sample index
    /// * `sample` - The sample `setup` refers to
    /// * `channel` - Controller state for the modulators
    /// * `sample_rate` - Output sample rate
    /// * `serial` - Note-on counter of the note being started
    pub fn start(
        &mut self,
        setup: &VoiceSetup,
        sample: &SampleBuffer,
        channel: &ChannelState,
        sample_rate: f32,
        serial: u64,
    ) {
        let generators = &setup.generators;
        self.setup = *setup;
        self.key = setup.key;
        self.effective_key = forced(generators.get(G::ForcedKey), setup.key);
        self.effective_velocity = forced(generators.get(G::ForcedVelocity), setup.velocity);
        self.serial = serial;
        self.sustained = false;
        self.exclusive_class = generators.get(G::ExclusiveClass);
        self.sample_rate = sample_rate;

        self.params = self.modulated(channel);
        self.mix = Mix::new(&self.params);
        self.pitch = Pitch::new(&self.params, self.effective_key, &sample.header, sample_rate);
        self.cursor = SampleCursor::new(
            Bounds::new(generators, sample),
            LoopMode::from_generator(generators.clamped(G::SampleModes)),
        );
        self.volume_envelope.start(EnvelopeParams::volume(
            &self.params,
            self.effective_key,
            sample_rate,
        ));
        self.modulation_envelope.start(EnvelopeParams::modulation(
            &self.params,
            self.effective_key,
            sample_rate,
        ));
        self.vibrato.start(
            self.params.get(G::FrequencyVibLfo),
            self.params.get(G::DelayVibLfo),
            sample_rate,
        );
        self.modulation_lfo.start(
            self.params.get(G::FrequencyModLfo),
            self.params.get(G::DelayModLfo),
            sample_rate,
        );
        self.filter.reset();
        self.control_countdown = 0;
        self.gain = self.mix.gain;
        self.state = if self.cursor.is_finished() || self.volume_envelope.is_idle() {
            VoiceState::Idle
        } else {
            VoiceState::Active
        };
    }

    fn modulated(&self, channel: &ChannelState) -> Parameters {
        let context = ModulationContext {
            channel,
            key: self.effective_key,
            velocity: self.effective_velocity,
        };
        modulate(&self.setup.generators, &self.setup.modulators, &context)
    }

    /// Re-evaluates the modulators after controller changes.
    pub fn update(&mut self, channel: &ChannelState, sample: &SampleBuffer) {
        if self.state == VoiceState::Idle {
            return;
        }
        self.params = self.modulated(channel);
        self.mix = Mix::new(&self.params);
        self.pitch
            .update(&self.params, self.effective_key, &sample.header);
        self.vibrato
            .set_frequency(self.params.get(G::FrequencyVibLfo), self.sample_rate);
        self.modulation_lfo
            .set_frequency(self.params.get(G::FrequencyModLfo), self.sample_rate);
    }

    /// Key released: enter the release stage.
    pub fn release(&mut self) {
        if self.state == VoiceState::Active {
            self.state = VoiceState::Releasing;
            self.sustained = false;
            self.volume_envelope.release();
            self.modulation_envelope.release();
            self.cursor.release();
        }
    }

    /// Key released while the sustain pedal is down.
    pub fn sustain(&mut self) {
        if self.state == VoiceState::Active {
            self.sustained = true;
        }
    }

    /// Silences the voice at once.
    pub fn stop(&mut self) {
        self.state = VoiceState::Idle;
        self.sustained = false;
        self.volume_envelope.stop();
        self.modulation_envelope.stop();
        self.gain = 0.0;
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == VoiceState::Idle
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn is_sustained(&self) -> bool {
        self.sustained
    }

    pub fn exclusive_class(&self) -> i32 {
        self.exclusive_class
    }

    /// Index of the sample in the bank.
    pub fn sample_index(&self) -> usize {
        self.setup.sample
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Adds `frames` frames of output to the buses.
    ///
    /// The voice goes idle when its volume envelope finishes or a
    /// non-looping sample runs out; the rest of the block is left alone.
    pub fn render(
        &mut self,
        sample: &SampleBuffer,
        frames: usize,
        buses: &mut BusBuffers,
        interpolation: Interpolation,
    ) {
        if self.state == VoiceState::Idle {
            return;
        }
        let mix = self.mix;
        let BusBuffers {
            dry,
            chorus,
            reverb,
        } = buses;

        for i in 0..frames {
            let vibrato = self.vibrato.next();
            let modulation_lfo = self.modulation_lfo.next();
            let modulation_env = self.modulation_envelope.next();
            let volume_env = self.volume_envelope.next();

            if self.control_countdown == 0 {
                let cutoff = (mix.cutoff_cents
                    + modulation_lfo * mix.mod_lfo_to_cutoff
                    + modulation_env * mix.mod_env_to_cutoff)
                    .clamp(CUTOFF_RANGE.0, CUTOFF_RANGE.1);
                self.filter
                    .set(absolute_cents_to_hz(cutoff), mix.resonance, self.sample_rate);
                self.control_countdown = CONTROL_INTERVAL;
            }
            self.control_countdown -= 1;

            let cents = vibrato * mix.vib_lfo_to_pitch
                + modulation_lfo * mix.mod_lfo_to_pitch
                + modulation_env * mix.mod_env_to_pitch;
            let raw = self
                .cursor
                .next(sample, self.pitch.increment(cents), interpolation);
            let filtered = self.filter.process(raw);

            let mut gain = volume_env * mix.gain;
            if mix.mod_lfo_to_volume != 0.0 {
                gain *= attenuation_gain(-modulation_lfo * mix.mod_lfo_to_volume);
            }
            self.gain = gain;

            let out = filtered * gain;
            let (left, right) = (out * mix.left, out * mix.right);
            dry.left[i] += left;
            dry.right[i] += right;
            if mix.chorus > 0.0 {
                chorus.left[i] += left * mix.chorus;
                chorus.right[i] += right * mix.chorus;
            }
            if mix.reverb > 0.0 {
                reverb.left[i] += left * mix.reverb;
                reverb.right[i] += right * mix.reverb;
            }

            if self.volume_envelope.is_idle() || self.cursor.is_finished() {
                self.stop();
                break;
            }
        }
    }
}
