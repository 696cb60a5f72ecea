//! sf2synth - A real-time polyphonic SoundFont (SF2) synthesizer engine.
//!
//! Banks are parsed into an immutable [`bank::Bank`]; a [`control::Synth`]
//! on the control thread feeds events to a [`control::Renderer`] on the
//! audio thread, which renders dry, chorus-send and reverb-send buses.
//!
//! ```no_run
//! use sf2synth::config::SynthConfig;
//! use sf2synth::control::Synth;
//!
//! let (mut synth, mut renderer) = Synth::new(SynthConfig::default());
//! synth.load_bank("bank.sf2")?;
//! synth.select_preset(0)?;
//! synth.note_on(69, 100)?;
//!
//! let mut left = vec![0.0; 512];
//! let mut right = vec![0.0; 512];
//! renderer.render_stereo(&mut left, &mut right);
//! # Ok::<(), sf2synth::control::EngineError>(())
//! ```

pub mod audio;
pub mod bank;
pub mod config;
pub mod control;
pub mod dsp;
pub mod midi;
pub mod render;
pub mod sf2;

#[cfg(test)]
mod testutil;

// Re-export commonly used types
pub use bank::Bank;
pub use config::{Interpolation, SynthConfig};
pub use control::{EngineError, Renderer, Synth};
pub use render::{Bus, BusBuffers, RenderStatus};
pub use sf2::{ParseError, RangeError};
