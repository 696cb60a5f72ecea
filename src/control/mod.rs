//! Control surface and render handle.
//!
//! [`Synth::new`] splits the synthesizer in two. [`Synth`] stays on the
//! control thread: it loads banks and turns calls into [`Event`]s.
//! [`Renderer`] moves to the audio thread and owns the [`Engine`].
//!
//! The two halves share only a lock-free SPSC event queue and an atomic
//! bank handle. The renderer picks up a new bank at the start of a block;
//! the block in flight finishes with the bank it started with.

use crate::bank::{Bank, PresetSummary};
use crate::config::SynthConfig;
use crate::midi::{Event, MAX_KEY, PITCH_WHEEL_MAX};
use crate::render::{BusBuffers, Engine, EngineStats, RenderStatus};
use crate::sf2::ParseError;
use arc_swap::ArcSwapOption;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors reported by the control surface.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load SoundFont: {0}")]
    Load(#[from] ParseError),

    #[error("no SoundFont loaded")]
    NoBank,

    #[error("preset {index} out of range (bank has {count})")]
    PresetOutOfRange { index: usize, count: usize },

    /// The renderer has not drained the queue; the event was dropped.
    #[error("event queue full")]
    QueueFull,
}

/// Control-thread half of the synthesizer.
pub struct Synth {
    events: HeapProd<Event>,
    bank: Arc<ArcSwapOption<Bank>>,
    /// Banks swapped out but possibly still referenced by the renderer.
    /// Dropped here once the renderer lets go, so the audio thread never
    /// frees a bank.
    retired: Vec<Arc<Bank>>,
    stats: Arc<EngineStats>,
    config: SynthConfig,
}

/// Audio-thread half of the synthesizer.
pub struct Renderer {
    engine: Engine,
    events: HeapCons<Event>,
    bank: Arc<ArcSwapOption<Bank>>,
    scratch: BusBuffers,
}

impl Synth {
    /// Creates a synthesizer with no bank loaded.
    ///
    /// # Returns
    ///
    /// The control surface and the renderer to hand to the audio thread
    pub fn new(config: SynthConfig) -> (Synth, Renderer) {
        let config = config.sanitized();
        let (producer, consumer) = HeapRb::<Event>::new(config.event_queue_capacity).split();
        let bank = Arc::new(ArcSwapOption::empty());
        let engine = Engine::new(&config);
        let stats = engine.stats();
        let scratch = BusBuffers::new(engine.max_frames());

        let synth = Synth {
            events: producer,
            bank: Arc::clone(&bank),
            retired: Vec::new(),
            stats,
            config,
        };
        let renderer = Renderer {
            engine,
            events: consumer,
            bank,
            scratch,
        };
        (synth, renderer)
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Loads a bank from disk and makes it current.
    ///
    /// Parsing happens on the calling thread. On failure the current bank
    /// stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Load`] if the file cannot be read or parsed
    pub fn load_bank<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<Bank>, EngineError> {
        let bank = Arc::new(Bank::load(path)?);
        self.publish(Some(Arc::clone(&bank)));
        Ok(bank)
    }

    /// Loads a bank from an in-memory SoundFont image.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Load`] if the image is not a valid bank
    pub fn load_bank_bytes(&mut self, data: &[u8]) -> Result<Arc<Bank>, EngineError> {
        let bank = Arc::new(Bank::from_bytes(data)?);
        info!(presets = bank.presets().len(), "loaded SoundFont from memory");
        self.publish(Some(Arc::clone(&bank)));
        Ok(bank)
    }

    /// Removes the current bank. Sounding voices stop at the next block.
    pub fn unload_bank(&mut self) {
        self.publish(None);
    }

    fn publish(&mut self, bank: Option<Arc<Bank>>) {
        if let Some(previous) = self.bank.swap(bank) {
            self.retired.push(previous);
        }
        self.collect_retired();
    }

    /// Drops retired banks the renderer no longer holds.
    ///
    /// Runs on every bank change and every queued event, so callers only
    /// need it to release memory while the control side is otherwise quiet.
    pub fn collect_retired(&mut self) {
        self.retired.retain(|bank| Arc::strong_count(bank) > 1);
    }

    /// Current bank, if any.
    pub fn bank(&self) -> Option<Arc<Bank>> {
        self.bank.load_full()
    }

    /// Listing of the current bank's presets in index order.
    pub fn presets(&self) -> Vec<PresetSummary> {
        self.bank
            .load()
            .as_deref()
            .map(Bank::preset_summaries)
            .unwrap_or_default()
    }

    /// Queues any control event.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::QueueFull`] if the renderer has fallen behind
    pub fn send(&mut self, event: Event) -> Result<(), EngineError> {
        if !self.retired.is_empty() {
            self.collect_retired();
        }
        self.events
            .try_push(event)
            .map_err(|_| EngineError::QueueFull)
    }

    /// Selects the preset used by subsequent notes.
    ///
    /// # Errors
    ///
    /// Returns error if no bank is loaded, the index is out of range, or
    /// the event queue is full
    pub fn select_preset(&mut self, index: usize) -> Result<(), EngineError> {
        let count = self
            .bank
            .load()
            .as_deref()
            .map(|bank| bank.presets().len())
            .ok_or(EngineError::NoBank)?;
        if index >= count {
            return Err(EngineError::PresetOutOfRange { index, count });
        }
        debug!(index, "select preset");
        self.send(Event::SelectPreset(index))
    }

    pub fn note_on(&mut self, key: u8, velocity: u8) -> Result<(), EngineError> {
        debug!(key, velocity, "note on");
        self.send(Event::NoteOn {
            key: key.min(MAX_KEY),
            velocity,
        })
    }

    pub fn note_off(&mut self, key: u8) -> Result<(), EngineError> {
        debug!(key, "note off");
        self.send(Event::NoteOff {
            key: key.min(MAX_KEY),
        })
    }

    pub fn stop_all_notes(&mut self) -> Result<(), EngineError> {
        debug!("stop all notes");
        self.send(Event::StopAllNotes)
    }

    pub fn set_controller(&mut self, controller: u8, value: u8) -> Result<(), EngineError> {
        debug!(controller, value, "control change");
        self.send(Event::ControlChange { controller, value })
    }

    /// Sets the 14-bit pitch wheel position (0..=16383, 8192 centered).
    pub fn pitch_bend(&mut self, value: u16) -> Result<(), EngineError> {
        self.send(Event::PitchBend(value.min(PITCH_WHEEL_MAX)))
    }

    pub fn channel_pressure(&mut self, value: u8) -> Result<(), EngineError> {
        self.send(Event::ChannelPressure(value))
    }

    pub fn key_pressure(&mut self, key: u8, pressure: u8) -> Result<(), EngineError> {
        self.send(Event::KeyPressure { key, pressure })
    }

    pub fn reset_controllers(&mut self) -> Result<(), EngineError> {
        self.send(Event::ResetControllers)
    }

    /// Forwards a raw MIDI channel message. Messages the engine does not
    /// act on are ignored.
    pub fn send_midi(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        match Event::from_midi_bytes(bytes) {
            Some(event) => self.send(event),
            None => Ok(()),
        }
    }

    /// Voices sounding as of the renderer's last block.
    pub fn active_voice_count(&self) -> usize {
        self.stats.active_voices()
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }
}

impl Renderer {
    pub fn sample_rate(&self) -> u32 {
        self.engine.sample_rate()
    }

    pub fn max_frames(&self) -> usize {
        self.engine.max_frames()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    fn sync_bank(&mut self) {
        let current = self.bank.load();
        let changed = match (current.as_ref(), self.engine.bank()) {
            (Some(new), Some(old)) => !Arc::ptr_eq(new, old),
            (None, None) => false,
            _ => true,
        };
        if changed {
            self.engine.set_bank((*current).clone());
        }
    }

    /// Applies queued events without rendering.
    pub fn apply_pending(&mut self) {
        self.begin_block();
    }

    fn begin_block(&mut self) {
        self.sync_bank();
        while let Some(event) = self.events.try_pop() {
            self.engine.handle(event);
        }
    }

    /// Renders one block of every bus after applying pending events.
    pub fn render(&mut self, frames: usize, out: &mut BusBuffers) -> RenderStatus {
        self.begin_block();
        self.engine.render(frames, out)
    }

    /// Fills one bus into caller buffers. Pending events are applied
    /// before bus 0, which starts a new block.
    pub fn render_bus(
        &mut self,
        bus: usize,
        frames: usize,
        left: &mut [f32],
        right: &mut [f32],
    ) -> RenderStatus {
        if bus == 0 {
            self.begin_block();
        }
        self.engine.render_bus(bus, frames, left, right)
    }

    /// Fills stereo buffers of any length with the dry bus, in blocks of
    /// at most the configured size. The effect sends are discarded.
    pub fn render_stereo(&mut self, left: &mut [f32], right: &mut [f32]) -> RenderStatus {
        let frames = left.len().min(right.len());
        let block = self.engine.max_frames();
        let mut scratch = std::mem::take(&mut self.scratch);
        let mut offset = 0;
        while offset < frames {
            let count = block.min(frames - offset);
            let status = self.render(count, &mut scratch);
            if !status.is_ok() {
                self.scratch = scratch;
                return status;
            }
            left[offset..offset + count].copy_from_slice(&scratch.dry.left[..count]);
            right[offset..offset + count].copy_from_slice(&scratch.dry.right[..count]);
            offset += count;
        }
        self.scratch = scratch;
        RenderStatus::Ok
    }
}
