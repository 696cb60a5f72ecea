//! The in-memory bank: presets, instruments and decoded samples.
//!
//! A [`Bank`] is built once from a parsed file and never mutated; reloading
//! builds a fresh one. Entities refer to each other by index into the
//! bank's collections.

pub mod generator;
pub mod instrument;
pub mod modulator;
pub mod preset;
pub mod resolve;
pub mod sample;
pub mod zone;

pub use generator::{Generator, GeneratorIndex, GeneratorSet};
pub use instrument::Instrument;
pub use modulator::{Modulator, Source, DEFAULT_MODULATORS};
pub use preset::{Preset, PresetSummary};
pub use resolve::{ModulatorSet, VoiceSetup};
pub use sample::{SampleBuffer, SampleHeader, SampleKind};
pub use zone::{KeyRange, Zone, ZoneList};

use crate::sf2::records::BagRecord;
use crate::sf2::{BankInfo, ParseError, RangeError, SoundFontFile};
use std::path::Path;
use tracing::{info, warn};

/// A fully loaded SoundFont bank.
#[derive(Debug, Clone)]
pub struct Bank {
    info: BankInfo,
    presets: Vec<Preset>,
    instruments: Vec<Instrument>,
    samples: Vec<Option<SampleBuffer>>,
    skipped: usize,
}

/// Bag records `[first, next]` of the entity at `index`, where each header's
/// `bag_index` marks its first bag and the following header (or the
/// sentinel) marks the end.
fn bag_slice<'a>(
    bags: &'a [BagRecord],
    first: u16,
    next: u16,
    kind: &'static str,
) -> Result<&'a [BagRecord], RangeError> {
    let (start, end) = (first as usize, next as usize);
    if start > end {
        return Err(RangeError::IndexOutOfRange {
            kind,
            start,
            end,
            count: bags.len(),
        });
    }
    bags.get(start..=end).ok_or(RangeError::IndexOutOfRange {
        kind,
        start,
        end,
        count: bags.len(),
    })
}

fn skip(skipped: &mut usize, owner: &str, error: &RangeError) {
    warn!(owner, "skipping zone: {}", error);
    *skipped += 1;
}

impl Bank {
    /// Loads a bank from a file.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Io`] if the file cannot be read, or any other
    /// [`ParseError`] if its contents are not a valid SoundFont 2 bank.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let data = std::fs::read(path.as_ref())?;
        let bank = Self::from_bytes(&data)?;
        info!(
            path = %path.as_ref().display(),
            presets = bank.presets.len(),
            name = %bank.info.name,
            "loaded SoundFont"
        );
        Ok(bank)
    }

    /// Builds a bank from an in-memory SoundFont image.
    ///
    /// Zones with inconsistent bounds are skipped with a warning; only
    /// structural problems fail the whole load.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ParseError> {
        let file = SoundFontFile::parse(data)?;
        let mut skipped = 0usize;

        let sample_records = &file.samples[..file.samples.len() - 1];
        let samples: Vec<Option<SampleBuffer>> =
            sample::decode_samples(sample_records, file.sample_data, file.sample_data_24)
                .into_iter()
                .map(|result| match result {
                    Ok(buffer) => Some(buffer),
                    Err(error) => {
                        warn!("unusable sample: {}", error);
                        None
                    }
                })
                .collect();

        let mut instruments = Vec::with_capacity(file.instruments.len() - 1);
        for pair in file.instruments.windows(2) {
            let (header, next) = (&pair[0], &pair[1]);
            let mut zones = ZoneList::default();
            match bag_slice(&file.instrument_bags, header.bag_index, next.bag_index, "ibag") {
                Ok(bags) => {
                    let (list, errors) = zone::build_zones(
                        bags,
                        &file.instrument_generators,
                        &file.instrument_modulators,
                        GeneratorIndex::SampleId,
                    );
                    errors.iter().for_each(|e| skip(&mut skipped, &header.name, e));
                    zones = list;
                }
                Err(error) => skip(&mut skipped, &header.name, &error),
            }
            zones.zones.retain(|zone| {
                let index = zone.link.unwrap_or(usize::MAX);
                match samples.get(index) {
                    Some(Some(_)) => true,
                    Some(None) => {
                        skipped += 1;
                        false
                    }
                    None => {
                        let error = RangeError::MissingSample {
                            index,
                            count: samples.len(),
                        };
                        skip(&mut skipped, &header.name, &error);
                        false
                    }
                }
            });
            instruments.push(Instrument {
                name: header.name.clone(),
                zones,
            });
        }

        let mut presets = Vec::with_capacity(file.presets.len() - 1);
        for pair in file.presets.windows(2) {
            let (header, next) = (&pair[0], &pair[1]);
            let mut zones = ZoneList::default();
            match bag_slice(&file.preset_bags, header.bag_index, next.bag_index, "pbag") {
                Ok(bags) => {
                    let (list, errors) = zone::build_zones(
                        bags,
                        &file.preset_generators,
                        &file.preset_modulators,
                        GeneratorIndex::Instrument,
                    );
                    errors.iter().for_each(|e| skip(&mut skipped, &header.name, e));
                    zones = list;
                }
                Err(error) => skip(&mut skipped, &header.name, &error),
            }
            let count = instruments.len();
            zones.zones.retain(|zone| match zone.link {
                Some(index) if index < count => true,
                other => {
                    let error = RangeError::InstrumentOutOfRange {
                        index: other.unwrap_or(usize::MAX),
                        count,
                    };
                    skip(&mut skipped, &header.name, &error);
                    false
                }
            });
            presets.push(Preset {
                name: header.name.clone(),
                bank: header.bank,
                program: header.program,
                zones,
            });
        }
        presets.sort_by_key(|p| (p.bank, p.program));

        Ok(Self {
            info: file.info,
            presets,
            instruments,
            samples,
            skipped,
        })
    }

    pub fn info(&self) -> &BankInfo {
        &self.info
    }

    /// Presets ordered by bank, then program.
    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn preset(&self, index: usize) -> Option<&Preset> {
        self.presets.get(index)
    }

    /// Index of the preset with the given bank and program numbers.
    pub fn find_preset(&self, bank: u16, program: u16) -> Option<usize> {
        self.presets
            .binary_search_by_key(&(bank, program), |p| (p.bank, p.program))
            .ok()
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn instrument(&self, index: usize) -> Option<&Instrument> {
        self.instruments.get(index)
    }

    /// Decoded sample data, or `None` if the index is unknown or the
    /// sample was unusable.
    pub fn sample(&self, index: usize) -> Option<&SampleBuffer> {
        self.samples.get(index).and_then(Option::as_ref)
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Number of zones dropped at load time because of bad bounds.
    pub fn skipped_zones(&self) -> usize {
        self.skipped
    }

    /// Summaries of every preset, in preset order.
    pub fn preset_summaries(&self) -> Vec<PresetSummary> {
        self.presets
            .iter()
            .enumerate()
            .map(|(i, p)| p.summary(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthConfig;
    use crate::render::{BusBuffers, Engine};
    use crate::testutil::{BankBuilder, TestZone};
    use proptest::prelude::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    /// Two presets over a looped and a one-shot sample, with a global zone,
    /// split zones and a bank modulator.
    fn layered_bank() -> Vec<u8> {
        let mut builder = BankBuilder::new();
        let looped = builder.sample("Loop", &BankBuilder::sine_wave(50, 600), 60);
        builder.loop_points(looped, Some((100, 500)));
        let shot = builder.sample("Shot", &BankBuilder::sine_wave(20, 300), 72);
        let mut breath = DEFAULT_MODULATORS[3];
        breath.source = Source::controller(2);
        let instrument = builder.instrument(
            "Layered",
            vec![
                TestZone::global().with(GeneratorIndex::InitialAttenuation, 20),
                TestZone::sample(looped)
                    .key_range(0, 63)
                    .with(GeneratorIndex::SampleModes, 1)
                    .modulator(breath),
                TestZone::sample(shot)
                    .key_range(64, 127)
                    .with(GeneratorIndex::CoarseTune, 12),
            ],
        );
        builder.preset("Layered", 0, 0, vec![TestZone::instrument(instrument)]);
        builder.preset(
            "Soft",
            0,
            1,
            vec![TestZone::instrument(instrument).velocity_range(1, 90)],
        );
        builder.build()
    }

    /// Loads whatever survived parsing into an engine and plays it.
    fn play_all(bank: Bank) {
        let presets = bank.presets().len();
        let mut engine = Engine::new(&SynthConfig {
            voice_count: 8,
            max_frames: 128,
            ..SynthConfig::default()
        });
        engine.set_bank(Some(Arc::new(bank)));
        let mut out = BusBuffers::new(128);
        for preset in 0..presets.min(4) {
            engine.select_preset(preset);
            for key in [0, 60, 64, 127] {
                engine.note_on(key, 100);
            }
            for _ in 0..2 {
                assert!(engine.render(128, &mut out).is_ok());
            }
            engine.stop_all_notes();
        }
    }

    #[test]
    fn test_layered_bank_plays() {
        let bank = Bank::from_bytes(&layered_bank()).unwrap();
        assert_eq!(bank.presets().len(), 2);
        play_all(bank);
    }

    proptest! {
        #[test]
        fn truncated_bank_loads_or_errors(cut in 0usize..4096) {
            let bytes = layered_bank();
            let len = cut % bytes.len();
            if let Ok(bank) = Bank::from_bytes(&bytes[..len]) {
                play_all(bank);
            }
        }

        #[test]
        fn mutated_bank_loads_or_errors(
            edits in proptest::collection::vec((any::<usize>(), any::<u8>()), 1..8),
        ) {
            let mut bytes = layered_bank();
            let len = bytes.len();
            for (position, value) in edits {
                bytes[position % len] = value;
            }
            if let Ok(bank) = Bank::from_bytes(&bytes) {
                play_all(bank);
            }
        }
    }

    #[test]
    fn test_presets_sorted_and_named() {
        let mut builder = BankBuilder::new();
        let sample = builder.sample("Sine", &BankBuilder::sine_wave(64, 256), 60);
        let instrument = builder.instrument("Inst", vec![TestZone::sample(sample)]);
        builder.preset("Drums", 128, 0, vec![TestZone::instrument(instrument)]);
        builder.preset("Organ", 0, 19, vec![TestZone::instrument(instrument)]);
        builder.preset("Piano", 0, 0, vec![TestZone::instrument(instrument)]);
        let bank = Bank::from_bytes(&builder.build()).unwrap();

        let names: Vec<&str> = bank.presets().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Piano", "Organ", "Drums"]);
        assert_eq!(bank.find_preset(0, 19), Some(1));
        assert_eq!(bank.find_preset(128, 0), Some(2));
        assert_eq!(bank.find_preset(1, 0), None);
        assert_eq!(bank.instruments().len(), 1);
        assert_eq!(bank.sample_count(), 1);
        assert_eq!(bank.skipped_zones(), 0);
        assert_eq!(bank.preset_summaries()[1].to_string(), "   1  000:019  Organ");
    }

    #[test]
    fn test_bad_references_skip_zones() {
        let mut builder = BankBuilder::new();
        let sample = builder.sample("Sine", &BankBuilder::sine_wave(64, 256), 60);
        let instrument = builder.instrument(
            "Inst",
            vec![TestZone::sample(sample), TestZone::sample(42)],
        );
        builder.preset(
            "Broken",
            0,
            0,
            vec![TestZone::instrument(instrument), TestZone::instrument(9)],
        );
        let bank = Bank::from_bytes(&builder.build()).unwrap();
        assert_eq!(bank.presets().len(), 1);
        assert_eq!(bank.presets()[0].zones.len(), 1);
        assert_eq!(bank.instruments()[0].zones.len(), 1);
        assert_eq!(bank.skipped_zones(), 2);
    }

    #[test]
    fn test_sample_out_of_pool_skips_zone() {
        let mut builder = BankBuilder::new();
        let good = builder.sample("Good", &BankBuilder::sine_wave(64, 256), 60);
        let bad = builder.sample("Bad", &BankBuilder::sine_wave(64, 256), 60);
        builder.corrupt_sample_end(bad, 10_000_000);
        let instrument = builder.instrument(
            "Inst",
            vec![TestZone::sample(good), TestZone::sample(bad)],
        );
        builder.preset("P", 0, 0, vec![TestZone::instrument(instrument)]);
        let bank = Bank::from_bytes(&builder.build()).unwrap();
        assert!(bank.sample(good).is_some());
        assert!(bank.sample(bad).is_none());
        assert_eq!(bank.instruments()[0].zones.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Bank::load("/nonexistent/bank.sf2"),
            Err(ParseError::Io(_))
        ));
    }

    #[test]
    #[ignore] // Requires SoundFont file
    fn test_golden_general_user_bank() {
        let path = PathBuf::from(
            std::env::var("SF2SYNTH_GOLDEN_BANK")
                .unwrap_or_else(|_| "assets/GeneralUser GS MuseScore v1.442.sf2".to_string()),
        );
        let bank = Bank::load(path).unwrap();
        assert!(!bank.presets().is_empty());
        let first = &bank.presets()[0];
        assert_eq!((first.bank, first.program), (0, 0));
        assert_eq!(bank.find_preset(0, 0), Some(0));
    }
}
