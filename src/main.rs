//! sf2synth - A polyphonic SoundFont (SF2) synthesizer.
//!
//! Command-line front end for the engine: inspects banks, renders notes
//! to WAV, and plays notes live through the default audio device.
//!
//! # Usage
//!
//! ```bash
//! sf2synth -sf bank.sf2 --list
//! sf2synth -sf bank.sf2 --info
//! sf2synth -sf bank.sf2 --preset 0 --key A4 --render a4.wav
//! sf2synth -sf bank.sf2 --preset 0 --key 60 --seconds 2 --play
//! ```
//!
//! Set `RUST_LOG=debug` for load and control-surface logging.

use anyhow::{bail, Context, Result};
use sf2synth::audio::{render_to_wav, AudioOutput};
use sf2synth::bank::Bank;
use sf2synth::config::SynthConfig;
use sf2synth::control::Synth;
use sf2synth::midi::{note_to_name, parse_key, seconds_to_frames, Note};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Seconds of release tail kept audible after `--play` lets go of the key.
const PLAY_TAIL_SECONDS: f64 = 1.0;

/// Command-line options for the application.
struct CliOptions {
    soundfont: Option<PathBuf>,
    config: Option<PathBuf>,
    list: bool,
    info: bool,
    render: Option<PathBuf>,
    play: bool,
    preset: usize,
    key: u8,
    velocity: u8,
    seconds: f64,
}

fn print_help(program: &str) {
    eprintln!("sf2synth - SoundFont synthesizer");
    eprintln!();
    eprintln!("Usage: {} -sf PATH [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -sf, --soundfont PATH  SoundFont file to load (.sf2)");
    eprintln!("  --config PATH          Engine settings (JSON)");
    eprintln!("  --list                 List presets (default action)");
    eprintln!("  --info                 Print bank metadata as JSON");
    eprintln!("  --render PATH          Render a note to a WAV file");
    eprintln!("  --play                 Play a note on the default audio device");
    eprintln!("  --preset N             Preset index from --list (default 0)");
    eprintln!("  --key K                Key number or name, e.g. 60 or C4 (default 60)");
    eprintln!("  --velocity V           Note velocity 1-127 (default 100)");
    eprintln!("  --seconds S            Note length in seconds (default 1)");
    eprintln!("  -h, --help             Print this help message");
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// A bare argument ending in `.sf2` is taken as the SoundFont path.
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let program = args.first().map_or("sf2synth", String::as_str);
        let mut options = Self {
            soundfont: None,
            config: None,
            list: false,
            info: false,
            render: None,
            play: false,
            preset: 0,
            key: 60,
            velocity: 100,
            seconds: 1.0,
        };
        let mut i = 1;

        let value = |i: &mut usize, flag: &str| -> Result<String> {
            *i += 1;
            match args.get(*i) {
                Some(value) => Ok(value.clone()),
                None => bail!("{} requires an argument", flag),
            }
        };

        while i < args.len() {
            match args[i].as_str() {
                "--soundfont" | "-sf" => {
                    options.soundfont = Some(PathBuf::from(value(&mut i, "--soundfont")?))
                }
                "--config" => options.config = Some(PathBuf::from(value(&mut i, "--config")?)),
                "--list" => options.list = true,
                "--info" => options.info = true,
                "--render" => options.render = Some(PathBuf::from(value(&mut i, "--render")?)),
                "--play" => options.play = true,
                "--preset" => {
                    options.preset = value(&mut i, "--preset")?
                        .parse()
                        .context("--preset expects a preset index")?
                }
                "--key" => {
                    let text = value(&mut i, "--key")?;
                    options.key = parse_key(&text)
                        .with_context(|| format!("Invalid key: {}", text))?;
                }
                "--velocity" => {
                    options.velocity = value(&mut i, "--velocity")?
                        .parse::<u8>()
                        .context("--velocity expects 1-127")?
                        .clamp(1, 127)
                }
                "--seconds" => {
                    options.seconds = value(&mut i, "--seconds")?
                        .parse::<f64>()
                        .context("--seconds expects a number")?
                        .max(0.0)
                }
                "--help" | "-h" => {
                    print_help(program);
                    std::process::exit(0);
                }
                other => {
                    if other.ends_with(".sf2") {
                        options.soundfont = Some(PathBuf::from(other));
                    } else {
                        eprintln!("Unknown option: {}", other);
                        eprintln!("Use --help for usage information");
                        std::process::exit(1);
                    }
                }
            }
            i += 1;
        }

        if !(options.info || options.render.is_some() || options.play) {
            options.list = true;
        }
        Ok(options)
    }
}

fn list_presets(bank: &Bank) {
    for summary in bank.preset_summaries() {
        println!("{}", summary);
    }
    if bank.skipped_zones() > 0 {
        eprintln!("({} zones skipped, see log)", bank.skipped_zones());
    }
}

fn play(cli: &CliOptions, config: SynthConfig, soundfont: &Path) -> Result<()> {
    let (mut synth, renderer) = Synth::new(config);
    synth.load_bank(soundfont)?;
    synth.select_preset(cli.preset)?;
    let _output = AudioOutput::start(renderer)?;

    println!(
        "Playing {} (velocity {}) for {:.1}s",
        note_to_name(cli.key),
        cli.velocity,
        cli.seconds
    );
    synth.note_on(cli.key, cli.velocity)?;
    std::thread::sleep(Duration::from_secs_f64(cli.seconds));
    synth.note_off(cli.key)?;
    std::thread::sleep(Duration::from_secs_f64(PLAY_TAIL_SECONDS));
    Ok(())
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match cli.config {
        Some(ref path) => SynthConfig::load(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?,
        None => SynthConfig::default(),
    };

    let Some(ref soundfont) = cli.soundfont else {
        bail!("No SoundFont specified (use --soundfont PATH)");
    };
    let bank = Bank::load(soundfont)
        .with_context(|| format!("Failed to load SoundFont: {}", soundfont.display()))?;

    if cli.info {
        println!("{}", serde_json::to_string_pretty(bank.info())?);
    }
    if cli.list {
        list_presets(&bank);
    }
    if let Some(ref output) = cli.render {
        let duration = seconds_to_frames(cli.seconds, config.sample_rate);
        let notes = [Note::new(cli.key, cli.velocity, 0, duration)];
        render_to_wav(
            &notes,
            cli.preset,
            soundfont,
            output,
            &config,
            None::<fn(f32)>,
        )
        .inspect_err(|e| tracing::error!("Export failed: {:?}", e))?;
        println!("Wrote {}", output.display());
    }
    if cli.play {
        play(&cli, config, soundfont)?;
    }
    Ok(())
}
