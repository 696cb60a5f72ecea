//! Offline rendering.
//!
//! Plays a note schedule through the synthesizer faster than real time and
//! writes the dry bus to a 16-bit stereo WAV file.

use crate::config::SynthConfig;
use crate::control::{EngineError, Renderer, Synth};
use crate::dsp::to_i16;
use crate::midi::{seconds_to_frames, Event, Note};
use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Seconds rendered after the last note-off so releases ring out.
pub const RELEASE_TAIL_SECONDS: f64 = 2.0;

/// Queues an event, flushing the queue into the renderer if it is full.
fn dispatch(synth: &mut Synth, renderer: &mut Renderer, event: Event) -> Result<()> {
    match synth.send(event) {
        Err(EngineError::QueueFull) => {
            renderer.apply_pending();
            synth.send(event).context("Event queue still full after flush")
        }
        other => other.map_err(Into::into),
    }
}

/// Renders a note schedule and hands the audio to `sink` block by block.
///
/// Note events land on their exact frame: rendering is split at every
/// event position. Note-offs are applied before note-ons on the same frame.
///
/// # Arguments
///
/// * `synth` - Control surface with a bank loaded and a preset selected
/// * `renderer` - The renderer paired with `synth`
/// * `notes` - Notes to play, in any order
/// * `tail_frames` - Frames rendered after the last note ends
/// * `sink` - Receives left and right channel blocks
///
/// # Returns
///
/// The number of frames rendered
pub fn render_notes<F>(
    synth: &mut Synth,
    renderer: &mut Renderer,
    notes: &[Note],
    tail_frames: usize,
    mut sink: F,
) -> Result<usize>
where
    F: FnMut(&[f32], &[f32]) -> Result<()>,
{
    // An event is (frame, is_note_on, key, velocity)
    let mut events: Vec<(u32, bool, u8, u8)> = notes
        .iter()
        .flat_map(|note| {
            [
                (note.start, true, note.key, note.velocity),
                (note.end(), false, note.key, 0),
            ]
        })
        .collect();
    events.sort_by_key(|&(frame, is_on, _, _)| (frame, is_on));

    let block = renderer.max_frames();
    let total = notes.iter().map(Note::end).max().unwrap_or(0) as usize + tail_frames;
    let mut left = vec![0.0f32; block];
    let mut right = vec![0.0f32; block];
    let mut frame = 0usize;
    let mut next = 0usize;

    while frame < total {
        while let Some(&(at, is_on, key, velocity)) = events.get(next) {
            if at as usize > frame {
                break;
            }
            let event = if is_on {
                Event::NoteOn { key, velocity }
            } else {
                Event::NoteOff { key }
            };
            dispatch(synth, renderer, event)?;
            next += 1;
        }

        let until = events.get(next).map_or(total, |&(at, ..)| at as usize);
        let count = (until.min(total) - frame).min(block);
        let status = renderer.render_stereo(&mut left[..count], &mut right[..count]);
        anyhow::ensure!(status.is_ok(), "render failed: {:?}", status);
        sink(&left[..count], &right[..count])?;
        frame += count;
    }
    Ok(frame)
}

/// Renders notes on one preset of a SoundFont to a WAV file.
///
/// # Arguments
///
/// * `notes` - The notes to play
/// * `preset` - Preset index in the bank's sorted preset list
/// * `soundfont_path` - Path to the SoundFont file
/// * `output_path` - Path for the output WAV file
/// * `config` - Engine settings; the WAV uses its sample rate
/// * `progress_callback` - Optional callback for progress updates (0.0 to 1.0)
///
/// # Errors
///
/// Returns error if:
/// - SoundFont cannot be loaded
/// - The preset index is out of range
/// - Output file cannot be created or written
pub fn render_to_wav<P1, P2, F>(
    notes: &[Note],
    preset: usize,
    soundfont_path: P1,
    output_path: P2,
    config: &SynthConfig,
    mut progress_callback: Option<F>,
) -> Result<()>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
    F: FnMut(f32),
{
    let (mut synth, mut renderer) = Synth::new(config.clone());
    synth.load_bank(soundfont_path.as_ref()).with_context(|| {
        format!(
            "Failed to load SoundFont for export: {}",
            soundfont_path.as_ref().display()
        )
    })?;
    synth.select_preset(preset)?;

    let sample_rate = renderer.sample_rate();
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(output_path.as_ref(), spec).with_context(|| {
        format!(
            "Failed to create output WAV file: {}",
            output_path.as_ref().display()
        )
    })?;

    let tail = seconds_to_frames(RELEASE_TAIL_SECONDS, sample_rate) as usize;
    let total = notes.iter().map(Note::end).max().unwrap_or(0) as usize + tail;
    let mut written = 0usize;
    render_notes(&mut synth, &mut renderer, notes, tail, |left, right| {
        for (&l, &r) in left.iter().zip(right) {
            writer.write_sample(to_i16(l))?;
            writer.write_sample(to_i16(r))?;
        }
        written += left.len();
        if let Some(ref mut callback) = progress_callback {
            callback(written as f32 / total.max(1) as f32);
        }
        Ok(())
    })?;

    writer.finalize().context("Failed to finalize WAV file")?;
    tracing::info!(
        path = %output_path.as_ref().display(),
        frames = written,
        "exported WAV"
    );
    Ok(())
}
