//! RIFF container walking.
//!
//! A SoundFont is a `RIFF` form of type `sfbk` holding three `LIST`
//! chunks: `INFO` (metadata), `sdta` (sample data) and `pdta` (the
//! preset/instrument/sample hierarchy).

use super::error::ParseError;
use super::reader::Reader;
use std::fmt;

/// A four-character chunk identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub const RIFF: Tag = Tag(*b"RIFF");
    pub const LIST: Tag = Tag(*b"LIST");
    pub const SFBK: Tag = Tag(*b"sfbk");

    pub const INFO: Tag = Tag(*b"INFO");
    pub const SDTA: Tag = Tag(*b"sdta");
    pub const PDTA: Tag = Tag(*b"pdta");

    pub const IFIL: Tag = Tag(*b"ifil");
    pub const ISNG: Tag = Tag(*b"isng");
    pub const INAM: Tag = Tag(*b"INAM");
    pub const IROM: Tag = Tag(*b"irom");
    pub const IVER: Tag = Tag(*b"iver");
    pub const ICRD: Tag = Tag(*b"ICRD");
    pub const IENG: Tag = Tag(*b"IENG");
    pub const IPRD: Tag = Tag(*b"IPRD");
    pub const ICOP: Tag = Tag(*b"ICOP");
    pub const ICMT: Tag = Tag(*b"ICMT");
    pub const ISFT: Tag = Tag(*b"ISFT");

    pub const SMPL: Tag = Tag(*b"smpl");
    pub const SM24: Tag = Tag(*b"sm24");

    pub const PHDR: Tag = Tag(*b"phdr");
    pub const PBAG: Tag = Tag(*b"pbag");
    pub const PMOD: Tag = Tag(*b"pmod");
    pub const PGEN: Tag = Tag(*b"pgen");
    pub const INST: Tag = Tag(*b"inst");
    pub const IBAG: Tag = Tag(*b"ibag");
    pub const IMOD: Tag = Tag(*b"imod");
    pub const IGEN: Tag = Tag(*b"igen");
    pub const SHDR: Tag = Tag(*b"shdr");

    /// The tag as text; non-printable bytes are shown as `?`.
    pub fn name(&self) -> String {
        self.0
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })
            .collect()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.name())
    }
}

/// One chunk: its identifier and its payload.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub tag: Tag,
    pub data: &'a [u8],
}

impl<'a> Chunk<'a> {
    /// A reader over the chunk payload.
    pub fn reader(&self) -> Reader<'a> {
        Reader::new(self.tag, self.data)
    }

    /// For `RIFF`/`LIST` chunks, the form type and the contained chunks.
    pub fn list(&self) -> Result<(Tag, Vec<Chunk<'a>>), ParseError> {
        let mut reader = self.reader();
        let kind = reader.four_cc()?;
        let body = reader.bytes(reader.remaining())?;
        Ok((kind, chunks(kind, body)?))
    }
}

/// Reads one chunk header and payload, consuming the pad byte that
/// follows an odd-sized payload when present.
pub fn read_chunk<'a>(reader: &mut Reader<'a>) -> Result<Chunk<'a>, ParseError> {
    let tag = reader.four_cc()?;
    let size = reader.u32()? as usize;
    let available = reader.remaining();
    if size > available {
        return Err(ParseError::SizeOverrun {
            tag,
            size,
            available,
        });
    }
    let data = reader.bytes(size)?;
    if size % 2 == 1 && !reader.is_empty() {
        reader.skip(1)?;
    }
    Ok(Chunk { tag, data })
}

/// Splits a list body into its chunks.
pub fn chunks(parent: Tag, body: &[u8]) -> Result<Vec<Chunk<'_>>, ParseError> {
    let mut reader = Reader::new(parent, body);
    let mut out = Vec::new();
    while !reader.is_empty() {
        out.push(read_chunk(&mut reader)?);
    }
    Ok(out)
}

/// Validates the outer `RIFF sfbk` form and returns its chunks.
pub fn open_form(data: &[u8]) -> Result<Vec<Chunk<'_>>, ParseError> {
    if data.len() < 4 || data[..4] != Tag::RIFF.0 {
        return Err(ParseError::NotRiff);
    }
    let mut reader = Reader::new(Tag::RIFF, data);
    let riff = read_chunk(&mut reader)?;
    let (kind, chunks) = {
        let mut body = riff.reader();
        let kind = body.four_cc()?;
        if kind != Tag::SFBK {
            return Err(ParseError::NotSoundFont);
        }
        (kind, body.bytes(body.remaining())?)
    };
    self::chunks(kind, chunks)
}
