//! Six-stage envelope generators for volume and modulation.
//!
//! An envelope runs `Delay -> Attack -> Hold -> Decay -> Sustain` while the
//! note is held and jumps to `Release` when it is let go. Every stage but
//! Sustain is counted in frames, so stepping once per output frame gives
//! sample-accurate timing.

use super::modulation::Parameters;
use crate::bank::GeneratorIndex as G;
use crate::dsp::{attenuation_gain, timecents_to_frames, NOISE_FLOOR, SILENCE_CB};

/// Envelope stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Delay,
    Attack,
    Hold,
    Decay,
    Sustain,
    Release,
    /// Finished; the owning voice can be recycled.
    Idle,
}

/// Which envelope the parameters describe. The volume envelope decays
/// exponentially and ends the voice; the modulation envelope is linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    Volume,
    Modulation,
}

/// Stage durations in frames plus the sustain level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    pub delay: u32,
    pub attack: u32,
    pub hold: u32,
    pub decay: u32,
    /// Sustain level as a linear value in `[0, 1]`.
    pub sustain: f32,
    pub release: u32,
}

impl EnvelopeParams {
    /// Volume envelope timing from modulated generator values.
    ///
    /// # Arguments
    ///
    /// * `params` - Modulated generator values
    /// * `key` - Key used for key-number scaling of hold and decay
    /// * `sample_rate` - Output sample rate
    pub fn volume(params: &Parameters, key: u8, sample_rate: f32) -> Self {
        let scale = 60.0 - key as f32;
        let frames = |tc: f32| timecents_to_frames(tc, sample_rate);
        Self {
            delay: frames(params.get(G::DelayVolEnv)),
            attack: frames(params.get(G::AttackVolEnv)),
            hold: frames(params.get(G::HoldVolEnv) + params.get(G::KeyToVolEnvHold) * scale),
            decay: frames(params.get(G::DecayVolEnv) + params.get(G::KeyToVolEnvDecay) * scale),
            sustain: attenuation_gain(params.get(G::SustainVolEnv)),
            release: frames(params.get(G::ReleaseVolEnv)),
        }
    }

    /// Modulation envelope timing from modulated generator values.
    pub fn modulation(params: &Parameters, key: u8, sample_rate: f32) -> Self {
        let scale = 60.0 - key as f32;
        let frames = |tc: f32| timecents_to_frames(tc, sample_rate);
        Self {
            delay: frames(params.get(G::DelayModEnv)),
            attack: frames(params.get(G::AttackModEnv)),
            hold: frames(params.get(G::HoldModEnv) + params.get(G::KeyToModEnvHold) * scale),
            decay: frames(params.get(G::DecayModEnv) + params.get(G::KeyToModEnvDecay) * scale),
            sustain: (1.0 - params.get(G::SustainModEnv) / 1000.0).clamp(0.0, 1.0),
            release: frames(params.get(G::ReleaseModEnv)),
        }
    }
}

/// A running envelope.
#[derive(Debug, Clone, Copy)]
pub struct Envelope {
    kind: EnvelopeKind,
    params: EnvelopeParams,
    stage: Stage,
    /// Frames left in a timed stage.
    remaining: u32,
    value: f32,
    /// Per-frame increment (linear stages) or factor (exponential stages).
    step: f32,
}

/// Per-frame factor that falls 96 dB over `frames`.
fn exponential_factor(frames: u32) -> f32 {
    attenuation_gain(SILENCE_CB / frames.max(1) as f32)
}

impl Envelope {
    pub fn new(kind: EnvelopeKind) -> Self {
        Self {
            kind,
            params: EnvelopeParams {
                delay: 0,
                attack: 0,
                hold: 0,
                decay: 0,
                sustain: 0.0,
                release: 0,
            },
            stage: Stage::Idle,
            remaining: 0,
            value: 0.0,
            step: 0.0,
        }
    }

    /// Gates the envelope on, restarting from the delay stage.
    pub fn start(&mut self, params: EnvelopeParams) {
        self.params = params;
        self.value = 0.0;
        self.enter(Stage::Delay);
    }

    /// Gates the envelope off. Has no effect once idle.
    pub fn release(&mut self) {
        if self.stage != Stage::Idle && self.stage != Stage::Release {
            self.enter(Stage::Release);
        }
    }

    /// Stops immediately.
    pub fn stop(&mut self) {
        self.value = 0.0;
        self.stage = Stage::Idle;
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_idle(&self) -> bool {
        self.stage == Stage::Idle
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        match stage {
            Stage::Delay => {
                self.remaining = self.params.delay;
                if self.remaining == 0 {
                    self.enter(Stage::Attack);
                }
            }
            Stage::Attack => {
                self.remaining = self.params.attack;
                if self.remaining == 0 {
                    self.value = 1.0;
                    self.enter(Stage::Hold);
                } else {
                    self.step = 1.0 / self.remaining as f32;
                }
            }
            Stage::Hold => {
                self.value = 1.0;
                self.remaining = self.params.hold;
                if self.remaining == 0 {
                    self.enter(Stage::Decay);
                }
            }
            Stage::Decay => {
                if self.params.decay == 0 || self.value <= self.params.sustain {
                    self.value = self.value.min(self.params.sustain);
                    self.enter(Stage::Sustain);
                    return;
                }
                self.step = match self.kind {
                    EnvelopeKind::Volume => exponential_factor(self.params.decay),
                    EnvelopeKind::Modulation => 1.0 / self.params.decay as f32,
                };
            }
            Stage::Sustain => {
                self.value = self.params.sustain;
                if self.kind == EnvelopeKind::Volume && self.value <= NOISE_FLOOR {
                    self.stop();
                }
            }
            Stage::Release => {
                if self.params.release == 0 || self.value <= 0.0 {
                    self.stop();
                    return;
                }
                self.step = match self.kind {
                    EnvelopeKind::Volume => exponential_factor(self.params.release),
                    EnvelopeKind::Modulation => 1.0 / self.params.release as f32,
                };
            }
            Stage::Idle => self.value = 0.0,
        }
    }

    /// Advances one frame and returns the new value in `[0, 1]`.
    ///
    /// A frame that finishes a stage still reports that stage's value; the
    /// next stage takes over from the following frame.
    #[inline]
    pub fn next(&mut self) -> f32 {
        match self.stage {
            Stage::Delay | Stage::Hold => {
                let output = self.value;
                self.remaining = self.remaining.saturating_sub(1);
                if self.remaining == 0 {
                    let next = if self.stage == Stage::Delay {
                        Stage::Attack
                    } else {
                        Stage::Decay
                    };
                    self.enter(next);
                }
                output
            }
            Stage::Attack => {
                self.value = (self.value + self.step).min(1.0);
                let output = self.value;
                self.remaining = self.remaining.saturating_sub(1);
                if self.remaining == 0 {
                    self.enter(Stage::Hold);
                }
                output
            }
            Stage::Decay => {
                self.value = self.fall();
                let output = self.value;
                let floor = match self.kind {
                    EnvelopeKind::Volume => self.params.sustain.max(NOISE_FLOOR),
                    EnvelopeKind::Modulation => self.params.sustain,
                };
                if self.value <= floor {
                    self.enter(Stage::Sustain);
                }
                output
            }
            Stage::Release => {
                self.value = self.fall();
                let floor = match self.kind {
                    EnvelopeKind::Volume => NOISE_FLOOR,
                    EnvelopeKind::Modulation => 0.0,
                };
                if self.value <= floor {
                    self.stop();
                }
                self.value
            }
            Stage::Sustain | Stage::Idle => self.value,
        }
    }

    #[inline]
    fn fall(&self) -> f32 {
        match self.kind {
            EnvelopeKind::Volume => self.value * self.step,
            EnvelopeKind::Modulation => (self.value - self.step).max(0.0),
        }
    }
}
