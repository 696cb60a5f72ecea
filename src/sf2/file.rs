//! Whole-file decoding into raw hydra arrays.

use super::error::ParseError;
use super::info::BankInfo;
use super::records::{
    read_records, BagRecord, GeneratorRecord, InstrumentRecord, ModulatorRecord, PresetRecord,
    SampleRecord,
};
use super::riff::{open_form, Chunk, Tag};
use tracing::debug;

/// Major format version this decoder understands (SoundFont 2.0x).
const SUPPORTED_MAJOR_VERSION: u16 = 2;

/// The decoded contents of a SoundFont file, still in record form.
///
/// Sample data is borrowed from the input buffer; converting it to
/// floating point happens when the bank is built.
#[derive(Debug, Clone)]
pub struct SoundFontFile<'a> {
    pub info: BankInfo,
    pub presets: Vec<PresetRecord>,
    pub preset_bags: Vec<BagRecord>,
    pub preset_modulators: Vec<ModulatorRecord>,
    pub preset_generators: Vec<GeneratorRecord>,
    pub instruments: Vec<InstrumentRecord>,
    pub instrument_bags: Vec<BagRecord>,
    pub instrument_modulators: Vec<ModulatorRecord>,
    pub instrument_generators: Vec<GeneratorRecord>,
    pub samples: Vec<SampleRecord>,
    /// 16-bit little-endian PCM (`smpl`).
    pub sample_data: &'a [u8],
    /// Optional low bytes extending `smpl` to 24 bits (`sm24`).
    pub sample_data_24: Option<&'a [u8]>,
}

fn find<'a>(chunks: &[Chunk<'a>], tag: Tag, name: &'static str) -> Result<Chunk<'a>, ParseError> {
    chunks
        .iter()
        .find(|c| c.tag == tag)
        .copied()
        .ok_or(ParseError::MissingChunk(name))
}

impl<'a> SoundFontFile<'a> {
    /// Parses a complete SoundFont image.
    ///
    /// # Arguments
    ///
    /// * `data` - The whole file contents
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the container is malformed, a required
    /// list or chunk is missing, any chunk overruns its parent, a record
    /// array is mis-sized, or the format version is not 2.x.
    pub fn parse(data: &'a [u8]) -> Result<Self, ParseError> {
        let mut info_chunks = None;
        let mut sdta_chunks = None;
        let mut pdta_chunks = None;

        for chunk in open_form(data)? {
            if chunk.tag != Tag::LIST {
                debug!(tag = %chunk.tag, "skipping top-level chunk");
                continue;
            }
            let (kind, children) = chunk.list()?;
            match kind {
                Tag::INFO => info_chunks = Some(children),
                Tag::SDTA => sdta_chunks = Some(children),
                Tag::PDTA => pdta_chunks = Some(children),
                other => debug!(kind = %other, "skipping unknown list"),
            }
        }

        let info_chunks = info_chunks.ok_or(ParseError::MissingChunk("INFO"))?;
        let sdta_chunks = sdta_chunks.ok_or(ParseError::MissingChunk("sdta"))?;
        let pdta_chunks = pdta_chunks.ok_or(ParseError::MissingChunk("pdta"))?;

        let info = BankInfo::from_chunks(&info_chunks)?;
        if info.version.major != SUPPORTED_MAJOR_VERSION {
            return Err(ParseError::UnsupportedVersion {
                major: info.version.major,
                minor: info.version.minor,
            });
        }

        let smpl = find(&sdta_chunks, Tag::SMPL, "smpl")?;
        let frame_count = smpl.data.len() / 2;
        let sample_data_24 = sdta_chunks
            .iter()
            .find(|c| c.tag == Tag::SM24)
            .and_then(|c| {
                if c.data.len() >= frame_count {
                    Some(c.data)
                } else {
                    debug!(
                        size = c.data.len(),
                        frames = frame_count,
                        "ignoring short sm24 chunk"
                    );
                    None
                }
            });

        let file = Self {
            info,
            presets: read_records(&find(&pdta_chunks, Tag::PHDR, "phdr")?)?,
            preset_bags: read_records(&find(&pdta_chunks, Tag::PBAG, "pbag")?)?,
            preset_modulators: read_records(&find(&pdta_chunks, Tag::PMOD, "pmod")?)?,
            preset_generators: read_records(&find(&pdta_chunks, Tag::PGEN, "pgen")?)?,
            instruments: read_records(&find(&pdta_chunks, Tag::INST, "inst")?)?,
            instrument_bags: read_records(&find(&pdta_chunks, Tag::IBAG, "ibag")?)?,
            instrument_modulators: read_records(&find(&pdta_chunks, Tag::IMOD, "imod")?)?,
            instrument_generators: read_records(&find(&pdta_chunks, Tag::IGEN, "igen")?)?,
            samples: read_records(&find(&pdta_chunks, Tag::SHDR, "shdr")?)?,
            sample_data: smpl.data,
            sample_data_24,
        };

        debug!(
            version = %file.info.version,
            presets = file.presets.len() - 1,
            instruments = file.instruments.len() - 1,
            samples = file.samples.len() - 1,
            frames = frame_count,
            "parsed SoundFont"
        );
        Ok(file)
    }

    /// Number of 16-bit frames in the sample pool.
    pub fn frame_count(&self) -> usize {
        self.sample_data.len() / 2
    }
}
