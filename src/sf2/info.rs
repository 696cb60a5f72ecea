//! Bank metadata from the `INFO` list.

use super::error::ParseError;
use super::reader::decode_text;
use super::riff::{Chunk, Tag};
use serde::Serialize;
use std::fmt;

/// A `major.minor` version pair (`ifil`, `iver`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}

impl Version {
    fn read(chunk: &Chunk<'_>) -> Result<Self, ParseError> {
        let mut reader = chunk.reader();
        Ok(Self {
            major: reader.u16()?,
            minor: reader.u16()?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}

/// Descriptive metadata carried by a bank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BankInfo {
    /// Format version (`ifil`).
    pub version: Version,
    /// Target sound engine (`isng`), e.g. "EMU8000".
    pub sound_engine: String,
    /// Bank name (`INAM`).
    pub name: String,
    pub rom_name: Option<String>,
    pub rom_version: Option<Version>,
    pub creation_date: Option<String>,
    pub author: Option<String>,
    pub product: Option<String>,
    pub copyright: Option<String>,
    pub comment: Option<String>,
    /// Tools used to create or edit the bank (`ISFT`).
    pub tools: Option<String>,
}

impl BankInfo {
    /// Builds the metadata from the chunks of the `INFO` list.
    ///
    /// Unknown chunks are ignored. Only `ifil` is required.
    pub fn from_chunks(chunks: &[Chunk<'_>]) -> Result<Self, ParseError> {
        let mut info = BankInfo::default();
        let mut have_version = false;
        for chunk in chunks {
            let text = || decode_text(chunk.data);
            match chunk.tag {
                Tag::IFIL => {
                    info.version = Version::read(chunk)?;
                    have_version = true;
                }
                Tag::ISNG => info.sound_engine = text(),
                Tag::INAM => info.name = text(),
                Tag::IROM => info.rom_name = Some(text()),
                Tag::IVER => info.rom_version = Some(Version::read(chunk)?),
                Tag::ICRD => info.creation_date = Some(text()),
                Tag::IENG => info.author = Some(text()),
                Tag::IPRD => info.product = Some(text()),
                Tag::ICOP => info.copyright = Some(text()),
                Tag::ICMT => info.comment = Some(text()),
                Tag::ISFT => info.tools = Some(text()),
                _ => {}
            }
        }
        if !have_version {
            return Err(ParseError::MissingChunk("ifil"));
        }
        Ok(info)
    }
}
