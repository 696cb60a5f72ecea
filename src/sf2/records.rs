//! Fixed-size records of the `pdta` list.
//!
//! Each hydra chunk is an array of records of one fixed size, closed by a
//! terminal sentinel record. The decoders here return the raw arrays,
//! sentinel included; the bank builder uses the sentinel to delimit the
//! last real entry and never exposes it.

use super::error::ParseError;
use super::reader::Reader;
use super::riff::{Chunk, Tag};

/// A record type stored in one of the hydra chunks.
pub trait Record: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Decodes one record. The reader always holds at least `SIZE` bytes.
    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError>;
}

/// Decodes every record of a hydra chunk.
///
/// # Errors
///
/// Returns [`ParseError::BadRecordSize`] when the chunk size is not a whole
/// number of records, and [`ParseError::MissingTerminal`] when the chunk
/// does not even hold its sentinel.
pub fn read_records<T: Record>(chunk: &Chunk<'_>) -> Result<Vec<T>, ParseError> {
    let size = chunk.data.len();
    if size % T::SIZE != 0 {
        return Err(ParseError::BadRecordSize {
            tag: chunk.tag,
            size,
            record: T::SIZE,
        });
    }
    if size == 0 {
        return Err(ParseError::MissingTerminal(chunk.tag));
    }
    let mut reader = chunk.reader();
    let mut records = Vec::with_capacity(size / T::SIZE);
    while !reader.is_empty() {
        records.push(T::read(&mut reader)?);
    }
    Ok(records)
}

/// `phdr`: one preset header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetRecord {
    pub name: String,
    pub program: u16,
    pub bank: u16,
    pub bag_index: u16,
    pub library: u32,
    pub genre: u32,
    pub morphology: u32,
}

impl Record for PresetRecord {
    const SIZE: usize = 38;

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            name: reader.fixed_string(20)?,
            program: reader.u16()?,
            bank: reader.u16()?,
            bag_index: reader.u16()?,
            library: reader.u32()?,
            genre: reader.u32()?,
            morphology: reader.u32()?,
        })
    }
}

/// `pbag` / `ibag`: start indices of a zone's generators and modulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BagRecord {
    pub generator_index: u16,
    pub modulator_index: u16,
}

impl Record for BagRecord {
    const SIZE: usize = 4;

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            generator_index: reader.u16()?,
            modulator_index: reader.u16()?,
        })
    }
}

/// `pgen` / `igen`: a generator operator and its raw 16-bit amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorRecord {
    pub operator: u16,
    pub amount: u16,
}

impl Record for GeneratorRecord {
    const SIZE: usize = 4;

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            operator: reader.u16()?,
            amount: reader.u16()?,
        })
    }
}

/// `pmod` / `imod`: one modulator definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModulatorRecord {
    pub source: u16,
    pub destination: u16,
    pub amount: i16,
    pub amount_source: u16,
    pub transform: u16,
}

impl Record for ModulatorRecord {
    const SIZE: usize = 10;

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            source: reader.u16()?,
            destination: reader.u16()?,
            amount: reader.i16()?,
            amount_source: reader.u16()?,
            transform: reader.u16()?,
        })
    }
}

/// `inst`: one instrument header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentRecord {
    pub name: String,
    pub bag_index: u16,
}

impl Record for InstrumentRecord {
    const SIZE: usize = 22;

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            name: reader.fixed_string(20)?,
            bag_index: reader.u16()?,
        })
    }
}

/// `shdr`: one sample header. Offsets are in frames into the `smpl` pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRecord {
    pub name: String,
    pub start: u32,
    pub end: u32,
    pub loop_start: u32,
    pub loop_end: u32,
    pub sample_rate: u32,
    pub original_key: u8,
    pub pitch_correction: i8,
    pub link: u16,
    pub kind: u16,
}

impl Record for SampleRecord {
    const SIZE: usize = 46;

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            name: reader.fixed_string(20)?,
            start: reader.u32()?,
            end: reader.u32()?,
            loop_start: reader.u32()?,
            loop_end: reader.u32()?,
            sample_rate: reader.u32()?,
            original_key: reader.u8()?,
            pitch_correction: reader.i8()?,
            link: reader.u16()?,
            kind: reader.u16()?,
        })
    }
}

/// Record tags in the order the `pdta` list must provide them.
pub const HYDRA_TAGS: [Tag; 9] = [
    Tag::PHDR,
    Tag::PBAG,
    Tag::PMOD,
    Tag::PGEN,
    Tag::INST,
    Tag::IBAG,
    Tag::IMOD,
    Tag::IGEN,
    Tag::SHDR,
];
