//! Parsers for the individual OVE chunks.
//!
//! Each parser decodes one chunk payload into the score model. They share
//! a handful of field groups that recur across records, defined here.

pub mod bars;
pub mod bdat;
pub mod header;
pub mod layout;
pub mod lyric;
pub mod title;
pub mod track;

use log::{debug, warn};

use crate::chunk::ByteCursor;
use crate::error::Result;
use crate::model::{CrossShape, FormatVersion, MeasurePos, MusicData, MusicKind, Offset};

/// Tick, start offset and (Overture 4) colour, the block every positioned
/// record starts with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Common {
    pub tick: i32,
    pub offset: i32,
    pub color: u8,
}

impl Common {
    /// Music data of `kind` positioned at this block; `stop` equals `start`.
    pub fn into_data(self, kind: MusicKind) -> MusicData {
        let mut data = MusicData::new(kind);
        data.tick = self.tick;
        data.start.offset = self.offset;
        data.stop = data.start;
        data.color = self.color;
        data
    }
}

pub(crate) fn read_common(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<Common> {
    let tick = cur.i16()?;
    let offset = cur.i16()?;
    let mut color = 0;
    if version.is_v4() {
        color = cur.u8()?;
        cur.skip(1)?;
    }
    Ok(Common { tick, offset, color })
}

/// Stop position: measure count relative to the start, then offset.
pub(crate) fn read_stop(cur: &mut ByteCursor<'_>) -> Result<MeasurePos> {
    let measure = i32::from(cur.u16()?);
    let offset = cur.i16()?;
    Ok(MeasurePos { measure, offset })
}

pub(crate) fn read_offset(cur: &mut ByteCursor<'_>) -> Result<Offset> {
    let x = cur.i16()?;
    let y = cur.i16()?;
    Ok(Offset { x, y })
}

/// Pair lines, stop position and both shoulders, the layout shared by
/// ties, slurs, glissandi, pedals and tuplets.
pub(crate) fn read_span(cur: &mut ByteCursor<'_>) -> Result<(CrossShape, MeasurePos)> {
    let left_line = cur.i16()?;
    let right_line = cur.i16()?;
    let stop = read_stop(cur)?;
    let left_shoulder = read_offset(cur)?;
    let right_shoulder = read_offset(cur)?;
    Ok((CrossShape { left_line, right_line, left_shoulder, right_shoulder }, stop))
}

/// Length-prefixed text: `size` bytes cut at the first NUL.
pub(crate) fn read_text(cur: &mut ByteCursor<'_>, size: usize) -> Result<String> {
    cur.fixed_text(size)
}

/// Framing of one COND or BDAT item: a 2-byte size and a 1-byte type tag.
/// The payload that follows is `size - 7` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordHeader {
    pub tag: u8,
    pub payload: usize,
}

pub(crate) fn read_record_header(cur: &mut ByteCursor<'_>) -> Result<RecordHeader> {
    let size = usize::from(cur.u16()?);
    let tag = cur.u8()?;
    Ok(RecordHeader { tag, payload: size.saturating_sub(7) })
}

/// Move the cursor to the end of a record whose payload began at `start`.
/// Parsers that stop short leave padding behind; parsers that read past
/// the declared length are trusted, as Overture itself does.
pub(crate) fn finish_record(cur: &mut ByteCursor<'_>, start: usize, payload: usize, what: &str) -> Result<()> {
    let consumed = cur.position() - start;
    if consumed < payload {
        cur.skip(payload - consumed)?;
    } else if consumed > payload {
        debug!("{what}: read {consumed} bytes of a {payload}-byte record");
    }
    Ok(())
}

/// Warn about a tolerated inconsistency inside a record.
pub(crate) fn tolerate(what: &str, detail: std::fmt::Arguments<'_>) {
    warn!("{what}: {detail}");
}
