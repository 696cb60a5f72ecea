//! Real-time rendering: voices, the voice pool and the engine.
//!
//! Everything here runs on the render thread. Buffers are sized when the
//! engine is built and nothing in the render path allocates, locks or
//! blocks.

pub mod engine;
pub mod envelope;
pub mod lfo;
pub mod modulation;
pub mod pitch;
pub mod pool;
pub mod sample_gen;
pub mod voice;

pub use engine::{Engine, EngineStats};
pub use envelope::{Envelope, EnvelopeKind, EnvelopeParams, Stage};
pub use modulation::{modulate, ModulationContext, Parameters};
pub use pool::VoicePool;
pub use voice::{Voice, VoiceState};

/// Output bus index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Bus {
    Dry = 0,
    Chorus = 1,
    Reverb = 2,
}

impl Bus {
    pub const ALL: [Bus; 3] = [Bus::Dry, Bus::Chorus, Bus::Reverb];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Result of a render call. Render never fails any other way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum RenderStatus {
    Ok = 0,
    /// The bus index is not 0, 1 or 2.
    BadBus = 1,
    /// More frames than the engine's block size were requested.
    TooManyFrames = 2,
    /// A caller buffer holds fewer frames than requested.
    BufferTooSmall = 3,
}

impl RenderStatus {
    pub fn is_ok(self) -> bool {
        self == RenderStatus::Ok
    }
}

/// Left and right sample buffers of one bus.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl StereoBuffer {
    pub fn new(frames: usize) -> Self {
        Self {
            left: vec![0.0; frames],
            right: vec![0.0; frames],
        }
    }

    pub fn len(&self) -> usize {
        self.left.len().min(self.right.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self, frames: usize) {
        self.left[..frames].fill(0.0);
        self.right[..frames].fill(0.0);
    }

    fn scale(&mut self, frames: usize, gain: f32) {
        for sample in self.left[..frames].iter_mut().chain(self.right[..frames].iter_mut()) {
            *sample *= gain;
        }
    }
}

/// The three output buses a render block fills.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusBuffers {
    pub dry: StereoBuffer,
    pub chorus: StereoBuffer,
    pub reverb: StereoBuffer,
}

impl BusBuffers {
    /// Buffers holding `frames` frames per bus.
    pub fn new(frames: usize) -> Self {
        Self {
            dry: StereoBuffer::new(frames),
            chorus: StereoBuffer::new(frames),
            reverb: StereoBuffer::new(frames),
        }
    }

    /// Frames every bus can hold.
    pub fn len(&self) -> usize {
        self.dry.len().min(self.chorus.len()).min(self.reverb.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bus(&self, bus: Bus) -> &StereoBuffer {
        match bus {
            Bus::Dry => &self.dry,
            Bus::Chorus => &self.chorus,
            Bus::Reverb => &self.reverb,
        }
    }

    pub(crate) fn clear(&mut self, frames: usize) {
        self.dry.clear(frames);
        self.chorus.clear(frames);
        self.reverb.clear(frames);
    }

    pub(crate) fn scale(&mut self, frames: usize, gain: f32) {
        self.dry.scale(frames, gain);
        self.chorus.scale(frames, gain);
        self.reverb.scale(frames, gain);
    }
}
