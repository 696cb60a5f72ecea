//! Bounds-checked little-endian field reader.

use super::error::ParseError;
use super::riff::Tag;

/// Cursor over the bytes of one chunk.
///
/// Every read checks the remaining length first and reports a
/// [`ParseError::Truncated`] naming the enclosing chunk.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    tag: Tag,
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(tag: Tag, data: &'a [u8]) -> Self {
        Self { tag, data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Consumes `count` bytes.
    pub fn bytes(&mut self, count: usize) -> Result<&'a [u8], ParseError> {
        let available = self.remaining();
        if count > available {
            return Err(ParseError::Truncated {
                tag: self.tag,
                needed: count,
                available,
            });
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub fn skip(&mut self, count: usize) -> Result<(), ParseError> {
        self.bytes(count).map(|_| ())
    }

    pub fn u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.array::<1>()?[0])
    }

    pub fn i8(&mut self) -> Result<i8, ParseError> {
        Ok(self.u8()? as i8)
    }

    pub fn u16(&mut self) -> Result<u16, ParseError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn i16(&mut self) -> Result<i16, ParseError> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32, ParseError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    /// Reads a four-character chunk identifier.
    pub fn four_cc(&mut self) -> Result<Tag, ParseError> {
        Ok(Tag(self.array()?))
    }

    /// Reads a fixed-width, NUL-padded text field.
    pub fn fixed_string(&mut self, width: usize) -> Result<String, ParseError> {
        Ok(decode_text(self.bytes(width)?))
    }
}

/// Decodes NUL-terminated text, replacing invalid bytes and trimming
/// trailing whitespace.
pub fn decode_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
}
