//! Outer audio surfaces: live output through rodio and offline WAV export
//! through hound. Both drive the engine only through [`crate::control`].

pub mod export;
pub mod output;

pub use export::{render_notes, render_to_wav};
pub use output::{AudioOutput, SynthSource};
