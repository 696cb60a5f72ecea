//! Builds small SoundFont images in memory for tests.

use crate::bank::{GeneratorIndex, Modulator};
use crate::sf2::Tag;
use std::collections::HashSet;

/// Zero frames written after every sample, as real banks do.
const GUARD: usize = 46;

/// One zone as the builder writes it.
#[derive(Debug, Clone, Default)]
pub struct TestZone {
    key_range: Option<(u8, u8)>,
    velocity_range: Option<(u8, u8)>,
    generators: Vec<(GeneratorIndex, u16)>,
    modulators: Vec<Modulator>,
    link: Option<u16>,
}

impl TestZone {
    /// A zone without a link; becomes the global zone when listed first.
    pub fn global() -> Self {
        Self::default()
    }

    /// An instrument zone playing sample `index`.
    pub fn sample(index: usize) -> Self {
        Self {
            link: Some(index as u16),
            ..Self::default()
        }
    }

    /// A preset zone layering instrument `index`.
    pub fn instrument(index: usize) -> Self {
        Self::sample(index)
    }

    pub fn key_range(mut self, low: u8, high: u8) -> Self {
        self.key_range = Some((low, high));
        self
    }

    pub fn velocity_range(mut self, low: u8, high: u8) -> Self {
        self.velocity_range = Some((low, high));
        self
    }

    pub fn with(mut self, index: GeneratorIndex, amount: i16) -> Self {
        self.generators.push((index, amount as u16));
        self
    }

    pub fn modulator(mut self, modulator: Modulator) -> Self {
        self.modulators.push(modulator);
        self
    }
}

struct TestSample {
    name: String,
    frames: Vec<i16>,
    root_key: u8,
    sample_rate: u32,
    loop_points: Option<(u32, u32)>,
    end_override: Option<u32>,
}

struct Owner {
    name: String,
    bank: u16,
    program: u16,
    zones: Vec<TestZone>,
}

/// Assembles a valid SoundFont 2.01 image.
pub struct BankBuilder {
    samples: Vec<TestSample>,
    instruments: Vec<Owner>,
    presets: Vec<Owner>,
    version: (u16, u16),
    omitted_lists: HashSet<[u8; 4]>,
    omitted_chunks: HashSet<[u8; 4]>,
}

impl Default for BankBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn chunk(tag: Tag, data: &[u8]) -> Vec<u8> {
    let mut out = tag.0.to_vec();
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    if data.len() % 2 == 1 {
        out.push(0);
    }
    out
}

fn list(kind: Tag, children: &[Vec<u8>]) -> Vec<u8> {
    let mut body = kind.0.to_vec();
    for child in children {
        body.extend_from_slice(child);
    }
    chunk(Tag::LIST, &body)
}

fn name_field(name: &str) -> [u8; 20] {
    let mut field = [0u8; 20];
    for (slot, byte) in field.iter_mut().zip(name.bytes().take(19)) {
        *slot = byte;
    }
    field
}

/// Hydra arrays for one level of the hierarchy.
#[derive(Default)]
struct Hydra {
    bags: Vec<u8>,
    modulators: Vec<u8>,
    generators: Vec<u8>,
    generator_count: u16,
    modulator_count: u16,
    bag_count: u16,
}

impl Hydra {
    fn push_bag(&mut self) {
        self.bags.extend_from_slice(&self.generator_count.to_le_bytes());
        self.bags.extend_from_slice(&self.modulator_count.to_le_bytes());
        self.bag_count += 1;
    }

    fn push_generator(&mut self, operator: u16, amount: u16) {
        self.generators.extend_from_slice(&operator.to_le_bytes());
        self.generators.extend_from_slice(&amount.to_le_bytes());
        self.generator_count += 1;
    }

    fn push_modulator(&mut self, modulator: &Modulator) {
        self.modulators.extend_from_slice(&modulator.source.0.to_le_bytes());
        self.modulators.extend_from_slice(&modulator.destination.to_le_bytes());
        self.modulators.extend_from_slice(&modulator.amount.to_le_bytes());
        self.modulators.extend_from_slice(&modulator.amount_source.0.to_le_bytes());
        self.modulators.extend_from_slice(&modulator.transform.to_le_bytes());
        self.modulator_count += 1;
    }

    fn push_zone(&mut self, zone: &TestZone, terminal: GeneratorIndex) {
        self.push_bag();
        if let Some((low, high)) = zone.key_range {
            self.push_generator(GeneratorIndex::KeyRange as u16, u16::from_le_bytes([low, high]));
        }
        if let Some((low, high)) = zone.velocity_range {
            self.push_generator(
                GeneratorIndex::VelocityRange as u16,
                u16::from_le_bytes([low, high]),
            );
        }
        for &(index, amount) in &zone.generators {
            self.push_generator(index as u16, amount);
        }
        for modulator in &zone.modulators {
            self.push_modulator(modulator);
        }
        if let Some(link) = zone.link {
            self.push_generator(terminal as u16, link);
        }
    }

    /// Writes the sentinel bag, generator and modulator.
    fn finish(&mut self) {
        self.push_bag();
        self.generators.extend_from_slice(&[0; 4]);
        self.modulators.extend_from_slice(&[0; 10]);
    }
}

impl BankBuilder {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            instruments: Vec::new(),
            presets: Vec::new(),
            version: (2, 1),
            omitted_lists: HashSet::new(),
            omitted_chunks: HashSet::new(),
        }
    }

    /// One period-`period` sine cycle repeated over `len` frames at half scale.
    pub fn sine_wave(period: usize, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let phase = (i % period) as f64 / period as f64;
                ((phase * std::f64::consts::TAU).sin() * 16_384.0) as i16
            })
            .collect()
    }

    /// Adds a mono 44.1 kHz sample looping over its whole length.
    pub fn sample(&mut self, name: &str, frames: &[i16], root_key: u8) -> usize {
        self.samples.push(TestSample {
            name: name.to_string(),
            frames: frames.to_vec(),
            root_key,
            sample_rate: 44_100,
            loop_points: Some((0, frames.len() as u32)),
            end_override: None,
        });
        self.samples.len() - 1
    }

    /// Sets loop points relative to the sample start, or removes them.
    pub fn loop_points(&mut self, index: usize, points: Option<(u32, u32)>) -> &mut Self {
        self.samples[index].loop_points = points;
        self
    }

    pub fn sample_rate(&mut self, index: usize, rate: u32) -> &mut Self {
        self.samples[index].sample_rate = rate;
        self
    }

    /// Overrides a sample's end with an absolute frame offset.
    pub fn corrupt_sample_end(&mut self, index: usize, end: u32) -> &mut Self {
        self.samples[index].end_override = Some(end);
        self
    }

    pub fn instrument(&mut self, name: &str, zones: Vec<TestZone>) -> usize {
        self.instruments.push(Owner {
            name: name.to_string(),
            bank: 0,
            program: 0,
            zones,
        });
        self.instruments.len() - 1
    }

    pub fn preset(&mut self, name: &str, bank: u16, program: u16, zones: Vec<TestZone>) -> usize {
        self.presets.push(Owner {
            name: name.to_string(),
            bank,
            program,
            zones,
        });
        self.presets.len() - 1
    }

    pub fn version(mut self, major: u16, minor: u16) -> Self {
        self.version = (major, minor);
        self
    }

    pub fn without_list(mut self, kind: Tag) -> Self {
        self.omitted_lists.insert(kind.0);
        self
    }

    pub fn without_chunk(mut self, tag: Tag) -> Self {
        self.omitted_chunks.insert(tag.0);
        self
    }

    fn keep(&self, tag: Tag, data: &[u8]) -> Option<Vec<u8>> {
        (!self.omitted_chunks.contains(&tag.0)).then(|| chunk(tag, data))
    }

    pub fn build(&self) -> Vec<u8> {
        let mut version = self.version.0.to_le_bytes().to_vec();
        version.extend_from_slice(&self.version.1.to_le_bytes());
        let info = [
            self.keep(Tag::IFIL, &version),
            self.keep(Tag::ISNG, b"EMU8000\0"),
            self.keep(Tag::INAM, b"Test Bank\0"),
        ];

        let mut pool = Vec::new();
        let mut headers = Vec::new();
        let mut offset = 0u32;
        for sample in &self.samples {
            for frame in &sample.frames {
                pool.extend_from_slice(&frame.to_le_bytes());
            }
            pool.extend(std::iter::repeat(0u8).take(GUARD * 2));
            let start = offset;
            let end = sample
                .end_override
                .unwrap_or(start + sample.frames.len() as u32);
            let (loop_start, loop_end) = sample
                .loop_points
                .map(|(s, e)| (start + s, start + e))
                .unwrap_or((start, start));
            headers.extend_from_slice(&name_field(&sample.name));
            for value in [start, end, loop_start, loop_end, sample.sample_rate] {
                headers.extend_from_slice(&value.to_le_bytes());
            }
            headers.push(sample.root_key);
            headers.push(0);
            headers.extend_from_slice(&0u16.to_le_bytes());
            headers.extend_from_slice(&1u16.to_le_bytes());
            offset += (sample.frames.len() + GUARD) as u32;
        }
        headers.extend_from_slice(&name_field("EOS"));
        headers.extend_from_slice(&[0; 26]);

        let mut instrument_hydra = Hydra::default();
        let mut instrument_headers = Vec::new();
        for instrument in &self.instruments {
            instrument_headers.extend_from_slice(&name_field(&instrument.name));
            instrument_headers.extend_from_slice(&instrument_hydra.bag_count.to_le_bytes());
            for zone in &instrument.zones {
                instrument_hydra.push_zone(zone, GeneratorIndex::SampleId);
            }
        }
        instrument_headers.extend_from_slice(&name_field("EOI"));
        instrument_headers.extend_from_slice(&instrument_hydra.bag_count.to_le_bytes());
        instrument_hydra.finish();

        let mut preset_hydra = Hydra::default();
        let mut preset_headers = Vec::new();
        for preset in &self.presets {
            preset_headers.extend_from_slice(&name_field(&preset.name));
            preset_headers.extend_from_slice(&preset.program.to_le_bytes());
            preset_headers.extend_from_slice(&preset.bank.to_le_bytes());
            preset_headers.extend_from_slice(&preset_hydra.bag_count.to_le_bytes());
            preset_headers.extend_from_slice(&[0; 12]);
            for zone in &preset.zones {
                preset_hydra.push_zone(zone, GeneratorIndex::Instrument);
            }
        }
        preset_headers.extend_from_slice(&name_field("EOP"));
        preset_headers.extend_from_slice(&[0; 4]);
        preset_headers.extend_from_slice(&preset_hydra.bag_count.to_le_bytes());
        preset_headers.extend_from_slice(&[0; 12]);
        preset_hydra.finish();

        let pdta = [
            self.keep(Tag::PHDR, &preset_headers),
            self.keep(Tag::PBAG, &preset_hydra.bags),
            self.keep(Tag::PMOD, &preset_hydra.modulators),
            self.keep(Tag::PGEN, &preset_hydra.generators),
            self.keep(Tag::INST, &instrument_headers),
            self.keep(Tag::IBAG, &instrument_hydra.bags),
            self.keep(Tag::IMOD, &instrument_hydra.modulators),
            self.keep(Tag::IGEN, &instrument_hydra.generators),
            self.keep(Tag::SHDR, &headers),
        ];

        let lists = [
            (Tag::INFO, info.into_iter().flatten().collect::<Vec<_>>()),
            (Tag::SDTA, self.keep(Tag::SMPL, &pool).into_iter().collect()),
            (Tag::PDTA, pdta.into_iter().flatten().collect()),
        ];
        let mut body = Tag::SFBK.0.to_vec();
        for (kind, children) in lists {
            if !self.omitted_lists.contains(&kind.0) {
                body.extend_from_slice(&list(kind, &children));
            }
        }
        chunk(Tag::RIFF, &body)
    }
}
