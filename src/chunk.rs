//! Low-level readers for the OVE container format.
//!
//! All multi-byte fields are big-endian. A *size chunk* is a 4-byte ASCII
//! tag, a 4-byte length and that many payload bytes; a *group chunk* is a
//! 2-byte count followed by `count` children of one kind.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{OveError, Result};

// ─── ByteCursor ──────────────────────────────────────────────────────

/// Sequential reader over an in-memory buffer.
///
/// Offsets reported in errors are absolute within the file: a cursor over
/// a chunk payload carries the payload's file offset as its base.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        ByteCursor { data, pos: 0, base }
    }

    /// Cursor over the payload of a size chunk.
    pub fn over(chunk: &SizeChunk<'a>) -> Self {
        Self::with_base(chunk.data, chunk.offset)
    }

    /// Position relative to the start of this cursor's buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Absolute position in the file.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn check(&self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(OveError::TruncatedInput {
                offset: self.offset(),
                needed: n,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Read exactly `n` bytes.
    pub fn read(&mut self, n: usize) -> Result<&'a [u8]> {
        self.check(n)?;
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Look at the next `n` bytes without consuming them.
    pub fn peek(&self, n: usize) -> Result<&'a [u8]> {
        self.check(n)?;
        Ok(&self.data[self.pos..self.pos + n])
    }

    /// Advance without materializing bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.check(n)?;
        self.pos += n;
        Ok(())
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.read(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        Ok(unsigned(self.read(2)?) as u16)
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.read(4).map(unsigned)
    }

    pub fn i8(&mut self) -> Result<i32> {
        self.read(1).map(signed)
    }

    pub fn i16(&mut self) -> Result<i32> {
        self.read(2).map(signed)
    }

    pub fn i32(&mut self) -> Result<i32> {
        self.read(4).map(signed)
    }

    /// A one-byte flag; only `0x01` is true.
    pub fn flag(&mut self) -> Result<bool> {
        Ok(self.u8()? == 0x01)
    }

    /// Fixed-size text field, cut at the first NUL.
    pub fn fixed_text(&mut self, n: usize) -> Result<String> {
        self.read(n).map(text_until_nul)
    }

    /// 4-byte ASCII chunk tag.
    pub fn tag(&mut self) -> Result<Tag> {
        let bytes = self.read(4)?;
        Ok(Tag([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

// ─── FixedBlock decoding ─────────────────────────────────────────────

/// Big-endian unsigned value of up to four bytes.
pub fn unsigned(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

/// Big-endian two's-complement value of up to four bytes.
pub fn signed(bytes: &[u8]) -> i32 {
    let width = bytes.len().min(4);
    if width == 0 {
        return 0;
    }
    let raw = unsigned(bytes);
    if bytes[0] & 0x80 == 0 {
        return raw as i32;
    }
    if width == 4 {
        raw as i32
    } else {
        (i64::from(raw) - (1i64 << (8 * width))) as i32
    }
}

/// Decode text up to the first NUL byte. Bytes are taken as UTF-8 with
/// invalid sequences replaced; charset conversion is left to callers.
pub fn text_until_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

pub fn high_nibble(byte: u8) -> u8 {
    byte >> 4
}

pub fn low_nibble(byte: u8) -> u8 {
    byte & 0x0F
}

/// Sign-extend the low `bits` bits of `value`.
pub fn signed_bits(value: u32, bits: u32) -> i32 {
    if bits == 0 {
        return 0;
    }
    let factor = 1i32 << (bits - 1);
    let num = (value % (1u32 << bits)) as i32;
    if num & factor == factor {
        num - factor * 2
    } else {
        num
    }
}

// ─── Tags ────────────────────────────────────────────────────────────

/// A 4-byte chunk tag such as `OVSC` or `BDAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub const fn new(name: &[u8; 4]) -> Self {
        Tag(*name)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Every chunk kind recognised at any level of an OVE file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChunkKind {
    Ovsc,
    Trkl,
    Trak,
    Pagl,
    Page,
    Linl,
    Line,
    Staf,
    Barl,
    Meas,
    Cond,
    Bdat,
    Pach,
    Fnts,
    Odev,
    Titl,
    Alot,
    Engr,
    Fmap,
    Pcpr,
    Lyrc,
}

impl ChunkKind {
    pub fn from_tag(tag: Tag) -> Option<Self> {
        let kind = match &tag.0 {
            b"OVSC" => ChunkKind::Ovsc,
            b"TRKL" => ChunkKind::Trkl,
            b"TRAK" => ChunkKind::Trak,
            b"PAGL" => ChunkKind::Pagl,
            b"PAGE" => ChunkKind::Page,
            b"LINL" => ChunkKind::Linl,
            b"LINE" => ChunkKind::Line,
            b"STAF" => ChunkKind::Staf,
            b"BARL" => ChunkKind::Barl,
            b"MEAS" => ChunkKind::Meas,
            b"COND" => ChunkKind::Cond,
            b"BDAT" => ChunkKind::Bdat,
            b"PACH" => ChunkKind::Pach,
            b"FNTS" => ChunkKind::Fnts,
            b"ODEV" => ChunkKind::Odev,
            b"TITL" => ChunkKind::Titl,
            b"ALOT" => ChunkKind::Alot,
            b"ENGR" => ChunkKind::Engr,
            b"FMAP" => ChunkKind::Fmap,
            b"PCPR" => ChunkKind::Pcpr,
            b"LYRC" => ChunkKind::Lyrc,
            _ => return None,
        };
        Some(kind)
    }

    pub fn tag(self) -> Tag {
        let name: &[u8; 4] = match self {
            ChunkKind::Ovsc => b"OVSC",
            ChunkKind::Trkl => b"TRKL",
            ChunkKind::Trak => b"TRAK",
            ChunkKind::Pagl => b"PAGL",
            ChunkKind::Page => b"PAGE",
            ChunkKind::Linl => b"LINL",
            ChunkKind::Line => b"LINE",
            ChunkKind::Staf => b"STAF",
            ChunkKind::Barl => b"BARL",
            ChunkKind::Meas => b"MEAS",
            ChunkKind::Cond => b"COND",
            ChunkKind::Bdat => b"BDAT",
            ChunkKind::Pach => b"PACH",
            ChunkKind::Fnts => b"FNTS",
            ChunkKind::Odev => b"ODEV",
            ChunkKind::Titl => b"TITL",
            ChunkKind::Alot => b"ALOT",
            ChunkKind::Engr => b"ENGR",
            ChunkKind::Fmap => b"FMAP",
            ChunkKind::Pcpr => b"PCPR",
            ChunkKind::Lyrc => b"LYRC",
        };
        Tag::new(name)
    }

    /// How many times the chunk may appear at the top level, `None` for
    /// no limit.
    pub fn max_occurrences(self) -> Option<usize> {
        match self {
            ChunkKind::Titl => Some(8),
            ChunkKind::Ovsc
            | ChunkKind::Trkl
            | ChunkKind::Pagl
            | ChunkKind::Linl
            | ChunkKind::Barl
            | ChunkKind::Pach
            | ChunkKind::Fnts
            | ChunkKind::Odev
            | ChunkKind::Alot
            | ChunkKind::Engr
            | ChunkKind::Fmap
            | ChunkKind::Pcpr
            | ChunkKind::Lyrc => Some(1),
            ChunkKind::Trak
            | ChunkKind::Page
            | ChunkKind::Line
            | ChunkKind::Staf
            | ChunkKind::Meas
            | ChunkKind::Cond
            | ChunkKind::Bdat => None,
        }
    }
}

// ─── Chunks ──────────────────────────────────────────────────────────

/// A tag plus its length-prefixed payload, borrowed from the input.
#[derive(Debug, Clone, Copy)]
pub struct SizeChunk<'a> {
    pub tag: Tag,
    /// File offset of the first payload byte.
    pub offset: usize,
    pub data: &'a [u8],
}

impl<'a> SizeChunk<'a> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Read the 4-byte length and payload of a chunk whose tag was already read.
pub fn read_size_chunk<'a>(cursor: &mut ByteCursor<'a>, tag: Tag) -> Result<SizeChunk<'a>> {
    let size = cursor.u32()? as usize;
    let offset = cursor.offset();
    let data = cursor.read(size)?;
    Ok(SizeChunk { tag, offset, data })
}

/// Read a size chunk whose tag must equal `expected`.
pub fn expect_size_chunk<'a>(cursor: &mut ByteCursor<'a>, expected: ChunkKind) -> Result<SizeChunk<'a>> {
    let tag = cursor.tag()?;
    if tag != expected.tag() {
        return Err(OveError::UnexpectedChunkTag {
            expected: expected.tag().to_string(),
            found: tag.to_string(),
        });
    }
    read_size_chunk(cursor, tag)
}

/// Read a fixed-size untagged block (legacy track records).
pub fn read_fixed_block<'a>(cursor: &mut ByteCursor<'a>, tag: Tag, size: usize) -> Result<SizeChunk<'a>> {
    let offset = cursor.offset();
    let data = cursor.read(size)?;
    Ok(SizeChunk { tag, offset, data })
}

/// Read the 2-byte child count of a group chunk.
pub fn read_group_count(cursor: &mut ByteCursor<'_>) -> Result<usize> {
    Ok(cursor.u16()? as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_decode_uses_field_width() {
        assert_eq!(signed(&[0xFF]), -1);
        assert_eq!(signed(&[0x80]), -128);
        assert_eq!(signed(&[0x7F]), 127);
        assert_eq!(signed(&[0xFF, 0xFE]), -2);
        assert_eq!(signed(&[0x01, 0x00]), 256);
        assert_eq!(signed(&[0xFF, 0xFF, 0xFF, 0xFF]), -1);
    }

    #[test]
    fn unsigned_decode_is_big_endian() {
        assert_eq!(unsigned(&[0x01, 0x02]), 0x0102);
        assert_eq!(unsigned(&[0x00, 0x00, 0x01, 0x3A]), 0x13A);
    }

    #[test]
    fn read_past_end_is_truncated_input() {
        let data = [1u8, 2, 3];
        let mut cursor = ByteCursor::with_base(&data, 100);
        cursor.skip(2).unwrap();
        let err = cursor.read(2).unwrap_err();
        assert_eq!(
            err,
            OveError::TruncatedInput { offset: 102, needed: 2, available: 1 }
        );
        // a failed read does not move the cursor
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn skip_past_end_fails_like_read() {
        let mut cursor = ByteCursor::new(&[0u8; 4]);
        assert!(cursor.skip(5).is_err());
        assert!(cursor.skip(4).is_ok());
        assert!(cursor.is_at_end());
    }

    #[test]
    fn fixed_text_stops_at_nul() {
        let mut cursor = ByteCursor::new(b"Piano\0\0\0junk");
        assert_eq!(cursor.fixed_text(8).unwrap(), "Piano");
        assert_eq!(cursor.remaining(), 4);
    }

    #[test]
    fn flag_only_accepts_one() {
        let mut cursor = ByteCursor::new(&[0x01, 0x02, 0x00]);
        assert!(cursor.flag().unwrap());
        assert!(!cursor.flag().unwrap());
        assert!(!cursor.flag().unwrap());
    }

    #[test]
    fn signed_bits_extends_seven_bit_values() {
        assert_eq!(signed_bits(0x7F, 7), -1);
        assert_eq!(signed_bits(0x03, 7), 3);
        assert_eq!(signed_bits(0x40, 7), -64);
    }

    #[test]
    fn expect_size_chunk_checks_tag() {
        let data = b"COND\x00\x00\x00\x00";
        let mut cursor = ByteCursor::new(data);
        let err = expect_size_chunk(&mut cursor, ChunkKind::Meas).unwrap_err();
        assert_eq!(
            err,
            OveError::UnexpectedChunkTag { expected: "MEAS".into(), found: "COND".into() }
        );
    }

    #[test]
    fn size_chunk_records_payload_offset() {
        let data = b"XXXXPAGE\x00\x00\x00\x02ab";
        let mut cursor = ByteCursor::new(data);
        cursor.skip(4).unwrap();
        let chunk = expect_size_chunk(&mut cursor, ChunkKind::Page).unwrap();
        assert_eq!(chunk.offset, 12);
        assert_eq!(chunk.data, b"ab");
        assert!(cursor.is_at_end());
    }

    #[test]
    fn occurrence_limits() {
        assert_eq!(ChunkKind::Titl.max_occurrences(), Some(8));
        assert_eq!(ChunkKind::Lyrc.max_occurrences(), Some(1));
        assert_eq!(ChunkKind::Bdat.max_occurrences(), None);
        assert_eq!(ChunkKind::from_tag(Tag::new(b"XXXX")), None);
        assert_eq!(ChunkKind::from_tag(ChunkKind::Pcpr.tag()), Some(ChunkKind::Pcpr));
    }
}
