//! Live playback through the default audio device.
//!
//! The renderer is moved into a rodio source that runs on rodio's mixer
//! thread. The source owns it outright, so the pull path takes no lock.

use crate::control::Renderer;
use anyhow::{Context, Result};
use rodio::{OutputStream, OutputStreamHandle, Source};
use std::time::Duration;

/// Rodio source that pulls stereo blocks from a [`Renderer`].
pub struct SynthSource {
    renderer: Renderer,
    left_buf: Vec<f32>,
    right_buf: Vec<f32>,
    /// Current position in the buffer.
    buf_pos: usize,
    /// Current channel (0 = left, 1 = right).
    channel: usize,
}

impl SynthSource {
    pub fn new(renderer: Renderer) -> Self {
        let block = renderer.max_frames();
        Self {
            renderer,
            left_buf: vec![0.0; block],
            right_buf: vec![0.0; block],
            buf_pos: block, // Start at end to trigger first render
            channel: 0,
        }
    }
}

impl Iterator for SynthSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.buf_pos >= self.left_buf.len() {
            // Silence if the render contract is ever violated.
            if !self
                .renderer
                .render_stereo(&mut self.left_buf, &mut self.right_buf)
                .is_ok()
            {
                self.left_buf.fill(0.0);
                self.right_buf.fill(0.0);
            }
            self.buf_pos = 0;
        }

        // Interleave stereo samples: L, R, L, R, ...
        let sample = if self.channel == 0 {
            self.left_buf[self.buf_pos]
        } else {
            self.right_buf[self.buf_pos]
        };

        self.channel = 1 - self.channel;
        if self.channel == 0 {
            self.buf_pos += 1;
        }

        Some(sample)
    }
}

impl Source for SynthSource {
    fn current_frame_len(&self) -> Option<usize> {
        None // Continuous stream
    }

    fn channels(&self) -> u16 {
        2
    }

    fn sample_rate(&self) -> u32 {
        self.renderer.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// An open output stream playing a renderer.
///
/// Audio stops when this is dropped.
pub struct AudioOutput {
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
}

impl AudioOutput {
    /// Opens the default output device and starts pulling from `renderer`.
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available or playback cannot
    /// start
    pub fn start(renderer: Renderer) -> Result<Self> {
        let (stream, stream_handle) =
            OutputStream::try_default().context("Failed to open audio output")?;
        stream_handle
            .play_raw(SynthSource::new(renderer))
            .context("Failed to start audio playback")?;
        tracing::info!("audio output started");
        Ok(Self {
            _stream: stream,
            _stream_handle: stream_handle,
        })
    }
}
