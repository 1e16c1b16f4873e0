//! `MEAS` and `COND` chunks: the measure shell and its conductor data.
//!
//! The measure shell is shared by every track. Conductor records that are
//! positioned in the score (tempo, text, repeats, endings) land in the
//! first track's cell of the measure.

use log::trace;

use crate::chunk::{high_nibble, low_nibble, ByteCursor, SizeChunk};
use crate::error::Result;
use crate::model::{
    BarlineType, CrossShape, FormatVersion, Measure, MeasureData, MusicData, MusicKind,
    NumericEnding, Offset, RepeatSymbol, Tempo, TimeSignature,
};
use crate::parser::bdat::{decorator, expressions, text};
use crate::parser::{finish_record, read_common, read_offset, read_record_header, read_text, tolerate};
use crate::tables::{repeat_type, CondTag};

/// Decode a `MEAS` chunk into the measure shell.
pub fn parse_meas(chunk: &SizeChunk<'_>, version: FormatVersion, measure: &mut Measure) -> Result<()> {
    let mut cur = ByteCursor::over(chunk);

    cur.skip(2)?;
    measure.is_multi_measure_rest = cur.flag()?;
    measure.is_pickup = cur.flag()?;
    cur.skip(4)?;
    measure.left_barline = BarlineType::from_code(cur.u8()?);
    measure.right_barline = BarlineType::from_code(cur.u8()?);

    let tempo = f64::from(cur.u16()?);
    measure.type_tempo = if version.is_v4() { tempo / 100.0 } else { tempo };

    measure.length = i32::from(cur.u16()?);
    cur.skip(6)?;
    measure.bar_number.offset = read_offset(&mut cur)?;
    cur.skip(2)?;
    measure.multi_measure_rest_count = cur.u16()?;

    Ok(())
}

/// Decode a `COND` chunk: the time signature block, then conductor records.
pub fn parse_cond(
    chunk: &SizeChunk<'_>,
    version: FormatVersion,
    measure: &mut Measure,
    md: &mut MeasureData,
) -> Result<()> {
    let mut cur = ByteCursor::over(chunk);

    let count = cur.u16()?;
    read_time_signature(&mut cur, &mut measure.time)?;

    for _ in 0..count {
        let header = read_record_header(&mut cur)?;
        let start = cur.position();

        let Some(tag) = CondTag::from_byte(header.tag) else {
            tolerate(
                "COND",
                format_args!("unknown record tag {:#04x}, {} bytes skipped", header.tag, header.payload),
            );
            cur.skip(header.payload)?;
            continue;
        };
        trace!("COND {:?}, {} bytes", tag, header.payload);

        match tag {
            CondTag::TimeParameters => time_parameters(&mut cur, version, header.payload, &mut measure.time)?,
            CondTag::BarNumber => bar_number(&mut cur, version, measure)?,
            CondTag::BarlineParameters => {
                cur.skip(version.pick(12, 10))?;
                measure.backward_repeat_count = cur.u8()?;
                cur.skip(6)?;
            }
            CondTag::Decorator => md.music.push(decorator(&mut cur, version)?),
            CondTag::Tempo => md.music.push(tempo(&mut cur, version)?),
            CondTag::Text => md.music.push(text(&mut cur, version, header.payload)?),
            CondTag::Expression => md.music.push(expressions(&mut cur, version, header.payload)?),
            CondTag::Repeat => md.music.push(repeat(&mut cur, version)?),
            CondTag::NumericEnding => md.music.push(numeric_ending(&mut cur, version)?),
        }

        finish_record(&mut cur, start, header.payload, "COND record")?;
    }

    Ok(())
}

/// The fixed 36-byte time signature block at the head of a COND chunk.
fn read_time_signature(cur: &mut ByteCursor<'_>, time: &mut TimeSignature) -> Result<()> {
    time.numerator = i32::from(cur.u8()?);
    time.denominator = i32::from(cur.u8()?);
    cur.skip(2)?;
    time.beat_length = i32::from(cur.u16()?);
    time.bar_length = i32::from(cur.u16()?);
    cur.skip(4)?;
    time.is_symbol = cur.flag()?;
    cur.skip(1)?;
    time.replace_font = cur.flag()?;
    time.color = cur.u8()?;
    time.show = cur.flag()?;
    time.show_beat_group = cur.flag()?;
    cur.skip(6)?;

    for n in time.group_numerators.iter_mut() {
        *n = cur.u8()?;
    }
    for d in time.group_denominators.iter_mut() {
        *d = cur.u8()?;
    }
    for g in time.beam_groups.iter_mut() {
        *g = cur.u8()?;
    }
    time.beam_count_16th = cur.u8()?;
    time.beam_count_32nd = cur.u8()?;

    Ok(())
}

/// Beat table: one 8-byte entry per beat of the numerator.
fn time_parameters(
    cur: &mut ByteCursor<'_>,
    version: FormatVersion,
    payload: usize,
    time: &mut TimeSignature,
) -> Result<()> {
    cur.skip(version.pick(10, 8))?;
    let numerator = usize::from(cur.u8()?);

    let table = payload.saturating_sub(version.pick(11, 9));
    if table % 8 != 0 || table / 8 != numerator {
        tolerate("time parameters", format_args!("{numerator} beats declared in a {table}-byte table"));
    }

    time.beats.clear();
    for _ in 0..numerator {
        let start_unit = i32::from(cur.u16()?);
        let length_unit = i32::from(cur.u16()?);
        cur.skip(2)?;
        let start_tick = i32::from(cur.u16()?);
        time.add_beat(start_unit, length_unit, start_tick);
    }
    time.end_add_beat();

    Ok(())
}

fn bar_number(cur: &mut ByteCursor<'_>, version: FormatVersion, measure: &mut Measure) -> Result<()> {
    let bar = &mut measure.bar_number;

    cur.skip(2)?;
    bar.show_on_paragraph_start = low_nibble(cur.u8()?) == 8;
    cur.skip(version.pick(9, 7))?;
    bar.align = cur.u8()?;
    cur.skip(4)?;
    bar.show_flag = cur.u8()?;
    cur.skip(10)?;
    bar.show_every_bar_count = cur.u8()?;
    bar.prefix = cur.fixed_text(2)?;
    cur.skip(18)?;

    Ok(())
}

fn tempo(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;
    let mut tempo = Tempo::default();

    let b = cur.u8()?;
    tempo.show_mark = high_nibble(b) & 0x4 == 0x4;
    tempo.show_before_text = high_nibble(b) & 0x8 == 0x8;
    tempo.show_parenthesis = high_nibble(b) & 0x1 == 0x1;
    tempo.left_note_type = low_nibble(b);
    cur.skip(1)?;

    if version.is_v4() {
        cur.skip(2)?;
        tempo.type_tempo = i32::from(cur.u16()?) / 100;
    } else {
        tempo.type_tempo = i32::from(cur.u16()?);
        cur.skip(2)?;
    }

    tempo.offset = read_offset(cur)?;
    cur.skip(16)?;
    tempo.left_text = read_text(cur, 31)?;

    let b = cur.u8()?;
    tempo.swing_eighth = high_nibble(b) != 8;
    tempo.right_note_type = low_nibble(b);

    if version.is_v4() {
        tempo.right_text = read_text(cur, 31)?;
        cur.skip(1)?;
    }

    Ok(common.into_data(MusicKind::Tempo(tempo)))
}

/// Segno, coda, D.C./D.S. and fine marks.
fn repeat(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;
    let repeat_type = repeat_type(cur.u8()?);
    cur.skip(13)?;
    let offset = read_offset(cur)?;
    cur.skip(15)?;

    let size = usize::from(cur.u16()?);
    let text = read_text(cur, size)?;
    if size % 2 == 0 {
        cur.skip(1)?;
    }

    Ok(common.into_data(MusicKind::RepeatSymbol(RepeatSymbol { repeat_type, text, offset })))
}

fn numeric_ending(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;
    cur.skip(6)?;
    let stop_measure = i32::from(cur.u16()?);
    cur.skip(2)?;

    let mut shape = CrossShape::default();
    shape.left_shoulder.x = cur.i16()?;
    let height = i32::from(cur.u16()?);
    shape.right_shoulder.x = cur.i16()?;
    cur.skip(2)?;
    let y = cur.i16()?;
    shape.left_shoulder.y = y;
    shape.right_shoulder.y = y;
    let numeric_handle = Offset { x: cur.i16()?, y: cur.i16()? };
    cur.skip(6)?;

    let size = usize::from(cur.u8()?);
    let text = read_text(cur, size)?;
    if size % 2 == 0 {
        cur.skip(1)?;
    }

    let mut data = common.into_data(MusicKind::NumericEnding(NumericEnding {
        text,
        height,
        numeric_handle,
        shape,
    }));
    data.stop.measure = stop_measure;
    Ok(data)
}
