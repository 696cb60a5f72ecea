//! The render-thread half of the synthesizer.
//!
//! [`Engine`] owns the voice pool, the channel's controller state and the
//! bank currently in use. It is driven by [`Event`]s and pulled for audio
//! one block at a time. No method allocates once the engine is built.

use super::pool::{Claim, VoicePool};
use super::voice::{Voice, VoiceState};
use super::{Bus, BusBuffers, RenderStatus};
use crate::bank::{Bank, GeneratorIndex};
use crate::config::{Interpolation, SynthConfig};
use crate::midi::{ChannelState, ControllerEffect, Event, MAX_KEY, MAX_VALUE};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Counters the render thread publishes for the control side.
#[derive(Debug, Default)]
pub struct EngineStats {
    active: AtomicUsize,
    capacity: AtomicUsize,
    stolen: AtomicU64,
    skipped: AtomicU64,
}

impl EngineStats {
    /// Voices sounding at the end of the last block or event.
    pub fn active_voices(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Voices cut off to make room for new notes.
    pub fn stolen_voices(&self) -> u64 {
        self.stolen.load(Ordering::Relaxed)
    }

    /// Voices that could not start or were silenced because their
    /// sample was missing.
    pub fn skipped_voices(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

pub struct Engine {
    pool: VoicePool,
    channel: ChannelState,
    bank: Option<Arc<Bank>>,
    preset: Option<usize>,
    sample_rate: f32,
    max_frames: usize,
    interpolation: Interpolation,
    master_gain: f32,
    /// Incremented on every note-on; orders voices by age.
    note_serial: u64,
    /// Controllers changed since the voices last re-read them.
    controllers_changed: bool,
    /// Block backing the per-bus render calls.
    scratch: BusBuffers,
    scratch_frames: usize,
    stats: Arc<EngineStats>,
}

impl Engine {
    /// Builds an engine with no bank. All buffers are allocated here.
    pub fn new(config: &SynthConfig) -> Self {
        crate::dsp::warm_up();
        crate::midi::transform::warm_up();

        let config = config.clone().sanitized();
        let stats = Arc::new(EngineStats::default());
        stats.capacity.store(config.voice_count, Ordering::Relaxed);
        Self {
            pool: VoicePool::new(config.voice_count),
            channel: ChannelState::new(),
            bank: None,
            preset: None,
            sample_rate: config.sample_rate as f32,
            max_frames: config.max_frames,
            interpolation: config.interpolation,
            master_gain: config.master_gain,
            note_serial: 0,
            controllers_changed: false,
            scratch: BusBuffers::new(config.max_frames),
            scratch_frames: 0,
            stats,
        }
    }

    /// Shared handle to the engine's counters.
    pub fn stats(&self) -> Arc<EngineStats> {
        Arc::clone(&self.stats)
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate as u32
    }

    pub fn bank(&self) -> Option<&Arc<Bank>> {
        self.bank.as_ref()
    }

    /// Swaps in a new bank, or none.
    ///
    /// Sounding voices refer to the old bank's samples, so they are
    /// stopped. The first preset is selected.
    pub fn set_bank(&mut self, bank: Option<Arc<Bank>>) {
        self.pool.stop_all();
        self.preset = bank
            .as_deref()
            .filter(|bank| !bank.presets().is_empty())
            .map(|_| 0);
        self.bank = bank;
        self.publish();
    }

    /// Selected preset index.
    pub fn preset(&self) -> Option<usize> {
        self.preset
    }

    /// Selects a preset for subsequent notes. Out-of-range indices are
    /// ignored. Sounding voices keep playing.
    pub fn select_preset(&mut self, index: usize) {
        let count = self.bank.as_deref().map_or(0, |bank| bank.presets().len());
        if index < count {
            self.preset = Some(index);
        }
    }

    pub fn channel(&self) -> &ChannelState {
        &self.channel
    }

    /// Applies one control event.
    pub fn handle(&mut self, event: Event) {
        match event {
            Event::NoteOn { key, velocity } => {
                self.note_on(key, velocity);
            }
            Event::NoteOff { key } => self.note_off(key),
            Event::ControlChange { controller, value } => self.set_controller(controller, value),
            Event::PitchBend(value) => self.pitch_bend(value),
            Event::ChannelPressure(value) => self.channel_pressure(value),
            Event::KeyPressure { key, pressure } => self.key_pressure(key, pressure),
            Event::SelectPreset(index) => self.select_preset(index),
            Event::StopAllNotes => self.stop_all_notes(),
            Event::ResetControllers => self.reset_controllers(),
        }
    }

    /// Starts a voice for every zone of the selected preset matching the
    /// note. A velocity of zero is a note-off.
    ///
    /// # Returns
    ///
    /// The number of voices started
    pub fn note_on(&mut self, key: u8, velocity: u8) -> usize {
        if velocity == 0 {
            self.note_off(key);
            return 0;
        }
        let (Some(bank), Some(preset)) = (self.bank.clone(), self.preset) else {
            return 0;
        };
        let key = key.min(MAX_KEY);
        let velocity = velocity.min(MAX_VALUE);
        self.note_serial += 1;
        let serial = self.note_serial;

        let Self {
            pool,
            channel,
            stats,
            sample_rate,
            ..
        } = self;
        let mut started = 0;
        bank.for_each_voice(preset, key, velocity, |setup| {
            let Some(sample) = bank.sample(setup.sample) else {
                stats.skipped.fetch_add(1, Ordering::Relaxed);
                return;
            };
            let class = setup.generators.get(GeneratorIndex::ExclusiveClass);
            if class != 0 {
                pool.for_each_active(|voice| {
                    if voice.exclusive_class() == class && voice.serial() != serial {
                        voice.stop();
                    }
                });
            }
            let claim = pool.claim();
            if let Claim::Stolen(_) = claim {
                stats.stolen.fetch_add(1, Ordering::Relaxed);
            }
            if let Some(voice) = pool.voice_mut(claim.index()) {
                voice.start(setup, sample, channel, *sample_rate, serial);
                if !voice.is_idle() {
                    started += 1;
                }
            }
        });
        self.pool.reclaim();
        self.publish();
        started
    }

    /// Releases every voice sounding `key`, or marks it sustained while
    /// the pedal is down. A key with no voices is a no-op.
    pub fn note_off(&mut self, key: u8) {
        let pedal = self.channel.sustain_pedal();
        self.pool.for_each_active(|voice| {
            if voice.key() == key && voice.state() == VoiceState::Active {
                if pedal {
                    voice.sustain();
                } else {
                    voice.release();
                }
            }
        });
    }

    /// Silences every voice at once.
    pub fn stop_all_notes(&mut self) {
        self.pool.stop_all();
        self.publish();
    }

    fn release_all(&mut self) {
        let pedal = self.channel.sustain_pedal();
        self.pool.for_each_active(|voice| {
            if pedal {
                voice.sustain();
            } else {
                voice.release();
            }
        });
    }

    fn release_sustained(&mut self) {
        self.pool.for_each_active(|voice| {
            if voice.is_sustained() {
                voice.release();
            }
        });
    }

    pub fn set_controller(&mut self, controller: u8, value: u8) {
        match self.channel.set_controller(controller, value) {
            ControllerEffect::None => {}
            ControllerEffect::SustainReleased => self.release_sustained(),
            ControllerEffect::AllSoundOff => self.stop_all_notes(),
            ControllerEffect::AllNotesOff => self.release_all(),
        }
        self.controllers_changed = true;
    }

    /// Sets the 14-bit pitch wheel position (8192 is centered).
    pub fn pitch_bend(&mut self, value: u16) {
        self.channel.set_pitch_wheel(value);
        self.controllers_changed = true;
    }

    pub fn channel_pressure(&mut self, value: u8) {
        self.channel.set_channel_pressure(value);
        self.controllers_changed = true;
    }

    pub fn key_pressure(&mut self, key: u8, value: u8) {
        self.channel.set_key_pressure(key, value);
        self.controllers_changed = true;
    }

    pub fn reset_controllers(&mut self) {
        let pedal = self.channel.sustain_pedal();
        self.channel.reset_controllers();
        if pedal {
            self.release_sustained();
        }
        self.controllers_changed = true;
    }

    /// Voices currently holding a pool slot.
    pub fn active_voice_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Renders `frames` frames of every bus into `out`.
    ///
    /// Buses are cleared first, then every voice adds its share. A voice
    /// whose sample has gone missing is silenced and counted as skipped.
    pub fn render(&mut self, frames: usize, out: &mut BusBuffers) -> RenderStatus {
        if frames > self.max_frames {
            return RenderStatus::TooManyFrames;
        }
        if out.len() < frames {
            return RenderStatus::BufferTooSmall;
        }
        out.clear(frames);

        let refresh = std::mem::take(&mut self.controllers_changed);
        let Self {
            pool,
            channel,
            bank,
            interpolation,
            stats,
            ..
        } = self;
        if let Some(bank) = bank.as_deref() {
            pool.for_each_active(|voice| match bank.sample(voice.sample_index()) {
                Some(sample) => {
                    if refresh {
                        voice.update(channel, sample);
                    }
                    voice.render(sample, frames, out, *interpolation);
                }
                None => {
                    voice.stop();
                    stats.skipped.fetch_add(1, Ordering::Relaxed);
                }
            });
        } else {
            pool.for_each_active(Voice::stop);
        }
        self.pool.reclaim();

        if self.master_gain != 1.0 {
            out.scale(frames, self.master_gain);
        }
        self.publish();
        RenderStatus::Ok
    }

    /// Fills one bus into caller buffers.
    ///
    /// Bus 0 (dry) advances the engine by one block. Buses 1 and 2 read the
    /// chorus and reverb sends of that same block; frames beyond it are
    /// zero.
    ///
    /// # Arguments
    ///
    /// * `bus` - 0 dry, 1 chorus send, 2 reverb send
    /// * `frames` - Frames to fill, at most the configured block size
    /// * `left` - Left channel output
    /// * `right` - Right channel output
    pub fn render_bus(
        &mut self,
        bus: usize,
        frames: usize,
        left: &mut [f32],
        right: &mut [f32],
    ) -> RenderStatus {
        let Some(bus) = Bus::from_index(bus) else {
            return RenderStatus::BadBus;
        };
        if frames > self.max_frames {
            return RenderStatus::TooManyFrames;
        }
        if left.len() < frames || right.len() < frames {
            return RenderStatus::BufferTooSmall;
        }
        if bus == Bus::Dry {
            let mut scratch = std::mem::take(&mut self.scratch);
            let status = self.render(frames, &mut scratch);
            self.scratch = scratch;
            if !status.is_ok() {
                return status;
            }
            self.scratch_frames = frames;
        }
        let source = self.scratch.bus(bus);
        let available = frames.min(self.scratch_frames);
        left[..available].copy_from_slice(&source.left[..available]);
        right[..available].copy_from_slice(&source.right[..available]);
        left[available..frames].fill(0.0);
        right[available..frames].fill(0.0);
        RenderStatus::Ok
    }

    fn publish(&self) {
        self.stats
            .active
            .store(self.pool.active_count(), Ordering::Relaxed);
    }
}
