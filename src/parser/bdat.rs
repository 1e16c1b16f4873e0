//! `BDAT` records: the notes, spanning elements and decorations of one
//! track in one measure.
//!
//! A BDAT payload is a 2-byte item count followed by tagged records (see
//! [`BdatTag`]). Each record is decoded from the shared cursor and then
//! framed by its declared size, so a parser that stops short never
//! desynchronizes the stream.

use log::trace;

use crate::chunk::{high_nibble, low_nibble, signed_bits, ByteCursor, SizeChunk};
use crate::error::Result;
use crate::model::{
    Articulation, Beam, BeamLine, ClefChange, ClefType, CrossShape, Decorator, Dynamics,
    Expressions, FormatVersion, Glissando, Harmony, HarpPedal, KeySignature, KuoHao, Lyric,
    MeasureData, MeasurePos, MeasureRepeat, MidiData, MidiKind, MusicData, MusicKind, Note,
    NoteContainer, NoteType, OctaveShift, Offset, Pedal, Slur, Text, TextType, Tie, TrillInterval,
    Tuplet, VelocityType, Wedge, WedgeType,
};
use crate::parser::{
    finish_record, read_common, read_offset, read_record_header, read_span, read_stop, read_text,
    tolerate,
};
use crate::tables::{
    accidental_type, articulation_type, decorator_code, dynamics_type, harmony_type,
    harmony_type_by_index, kuohao_type, note_head_type, octave_shift, ove_key_to_key, BdatTag,
    DecoratorCode,
};

/// Decode one BDAT chunk into `md`.
pub fn parse_bdat(chunk: &SizeChunk<'_>, version: FormatVersion, md: &mut MeasureData) -> Result<()> {
    let mut cur = ByteCursor::over(chunk);
    let count = cur.u16()?;

    for _ in 0..count {
        let header = read_record_header(&mut cur)?;
        let start = cur.position();

        let Some(tag) = BdatTag::from_byte(header.tag) else {
            tolerate(
                "BDAT",
                format_args!("unknown record tag {:#04x}, {} bytes skipped", header.tag, header.payload),
            );
            cur.skip(header.payload)?;
            continue;
        };
        trace!("BDAT {:?}, {} bytes", tag, header.payload);

        let data = match tag {
            BdatTag::RawNote | BdatTag::Rest | BdatTag::Note => {
                let container = note_container(&mut cur, version, header.payload, tag)?;
                md.containers.push(container);
                None
            }
            BdatTag::Key => {
                md.key = key(&mut cur, version)?;
                None
            }
            BdatTag::MidiController
            | BdatTag::MidiProgramChange
            | BdatTag::MidiChannelPressure
            | BdatTag::MidiPitchWheel => {
                md.midi.push(midi(&mut cur, version, tag)?);
                None
            }
            BdatTag::Beam => Some(beam(&mut cur, version, header.payload)?),
            BdatTag::Harmony => Some(harmony(&mut cur, version)?),
            BdatTag::HarmonyGuitarFrame => Some(harmony_guitar_frame(&mut cur, version)?),
            BdatTag::Clef => Some(clef(&mut cur, version)?),
            BdatTag::Wedge => Some(wedge(&mut cur, version, header.payload)?),
            BdatTag::Dynamics => Some(dynamics(&mut cur, version)?),
            BdatTag::Glissando => Some(glissando(&mut cur, version)?),
            BdatTag::Decorator => Some(decorator(&mut cur, version)?),
            BdatTag::Lyric => Some(lyric(&mut cur, version, header.payload)?),
            BdatTag::OctaveShift => Some(octave(&mut cur, version)?),
            BdatTag::Slur => Some(slur(&mut cur, version)?),
            BdatTag::Text => Some(text(&mut cur, version, header.payload)?),
            BdatTag::Tie => Some(tie(&mut cur, version)?),
            BdatTag::Tuplet => Some(tuplet(&mut cur, version)?),
            BdatTag::Pedal => Some(pedal(&mut cur, version, header.payload)?),
            BdatTag::KuoHao => Some(kuohao(&mut cur, version)?),
            BdatTag::Expressions => Some(expressions(&mut cur, version, header.payload)?),
            BdatTag::HarpPedal => Some(harp_pedal(&mut cur, version)?),
            BdatTag::MultiMeasureRest => Some(multi_measure_rest(&mut cur, version)?),
            // layout-only records
            BdatTag::GuitarBend | BdatTag::GuitarBarre | BdatTag::Graphics | BdatTag::BarEnd => None,
        };
        if let Some(data) = data {
            md.music.push(data);
        }

        finish_record(&mut cur, start, header.payload, "BDAT record")?;
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Notes and rests
// ═══════════════════════════════════════════════════════════════════════

fn note_container(
    cur: &mut ByteCursor<'_>,
    version: FormatVersion,
    payload: usize,
    tag: BdatTag,
) -> Result<NoteContainer> {
    let start = cur.position();
    let mut c = NoteContainer {
        is_rest: tag == BdatTag::Rest,
        is_raw: tag == BdatTag::RawNote,
        ..Default::default()
    };

    let grace = cur.u16()?;
    c.is_grace = grace == 0x3C00;
    c.is_cue = grace == 0x4B40 || grace == 0x3240;

    let b = cur.u8()?;
    c.show = low_nibble(b) != 0x8;
    c.voice = low_nibble(b) & 0x7;

    let common = read_common(cur, version)?;
    c.tick = common.tick;
    c.start.offset = common.offset;
    c.stop = c.start;
    c.color = common.color;

    c.tuplet = cur.u8()?;
    c.space = cur.u8()?;

    let b = cur.u8()?;
    c.in_beam = high_nibble(b) & 0x1 == 0x1;
    c.grace_note_type = high_nibble(b);
    c.dot = low_nibble(b) & 0x03;

    let code = low_nibble(cur.u8()?);
    c.note_type = NoteType::from_code(code).unwrap_or_else(|| {
        tolerate("note", format_args!("unknown duration class {code}"));
        NoteType::Quarter
    });

    if c.is_rest {
        let line = cur.i8()?;
        cur.skip(1)?;
        c.notes.push(Note { line, show: c.show, ..Default::default() });
    } else {
        let b = cur.u8()?;
        c.stem_up = high_nibble(b) & 0x8 == 0x8;
        c.stem_length = signed_bits(u32::from(b % 0x80), 7) + 7;
        // 0x00 shows the stem, 0x40 hides it
        c.show_stem = high_nibble(cur.u8()?) != 0x4;
        cur.skip(1)?;

        let count = cur.u8()?;
        for _ in 0..count {
            let (note, length) = note(cur)?;
            c.length = length;
            c.notes.push(note);
        }
    }

    while cur.position() - start < payload {
        c.articulations.push(articulation(cur, version)?);
    }

    Ok(c)
}

/// One 16-byte notehead; also returns the container length it carries.
fn note(cur: &mut ByteCursor<'_>) -> Result<(Note, i32)> {
    let mut note = Note::default();

    let b = cur.u8()?;
    note.show = b & 0x80 != 0x80;
    note.head_type = note_head_type(b & 0x7F);
    note.tie_pos = high_nibble(cur.u8()?);
    note.offset_staff = match low_nibble(cur.u8()?) {
        1 => 1,
        7 => -1,
        _ => 0,
    };

    let b = cur.u8()?;
    note.accidental = accidental_type(low_nibble(b));
    // 0: implied by the key, 4: implied by an earlier accidental
    note.show_accidental = !matches!(high_nibble(b), 0 | 4);

    cur.skip(1)?;
    note.line = cur.i8()?;
    cur.skip(1)?;
    note.note = cur.u8()?;
    note.on_velocity = cur.u8()?;
    note.off_velocity = cur.u8()?;
    cur.skip(2)?;
    let length = i32::from(cur.u16()?);
    note.offset_tick = cur.i16()?;

    Ok((note, length))
}

/// Articulation block. The block size counts its own 2-byte field.
fn articulation(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<Articulation> {
    let start = cur.position();
    let block = usize::from(cur.u16()?);

    let mut art = Articulation { art_type: articulation_type(cur.u8()?), ..Default::default() };
    // 0x00 below, 0x30 above
    art.placement_above = cur.u8()? != 0x00;
    art.offset = read_offset(cur)?;

    if version.is_v4() {
        let settings = cur.u8()?;
        art.change_sound_effect = settings & 0x1 == 0x1;
        art.change_length = settings & 0x2 == 0x2;
        art.change_velocity = settings & 0x4 == 0x4;
        cur.skip(8)?;

        let velocity_type = cur.u8()?;
        if art.change_velocity {
            art.velocity_type = match velocity_type {
                1 => VelocityType::SetValue,
                2 => VelocityType::Percentage,
                _ => VelocityType::Offset,
            };
        }
        cur.skip(14)?;

        let from = cur.i16()?;
        let to = cur.i16()?;
        if art.change_sound_effect {
            art.sound_effect = (from, to);
        }
        cur.skip(1)?;

        let percentage = cur.u8()?;
        if art.change_length {
            art.length_percentage = i32::from(percentage);
        }
        let velocity = cur.i16()?;
        if art.change_velocity {
            art.velocity_value = velocity;
        }

        if art.art_type.is_trill() {
            cur.skip(8)?;
            art.trill_note_length = i32::from(cur.u8()?);
            let b = cur.u8()?;
            art.trill_rate = match high_nibble(b) {
                0 => None,
                2 => Some(NoteType::N32),
                3 => Some(NoteType::N64),
                4 => Some(NoteType::N128),
                _ => Some(NoteType::Sixteenth),
            };
            art.accelerate_type = low_nibble(b);
            cur.skip(1)?;
            art.auxiliary_first = cur.flag()?;
            cur.skip(1)?;
            art.trill_interval = match cur.u8()? {
                0 => TrillInterval::Diatonic,
                2 => TrillInterval::Whole,
                _ => TrillInterval::Chromatic,
            };
        }
    }

    finish_record(cur, start, block, "articulation")?;
    Ok(art)
}

// ═══════════════════════════════════════════════════════════════════════
// Spanning elements
// ═══════════════════════════════════════════════════════════════════════

fn beam(cur: &mut ByteCursor<'_>, version: FormatVersion, payload: usize) -> Result<MusicData> {
    let grace = cur.flag()?;
    cur.skip(1)?;
    let voice = low_nibble(cur.u8()?) & 0x7;
    let common = read_common(cur, version)?;
    cur.skip(2)?;
    let beam_count = usize::from(cur.u8()?);
    cur.skip(1)?;

    let mut shape = CrossShape { left_line: cur.i8()?, right_line: cur.i8()?, ..Default::default() };
    if version.is_v4() {
        cur.skip(8)?;
    }

    let header = version.pick(23, 13);
    let count = payload.saturating_sub(header) / 16;
    if count != beam_count {
        tolerate("beam", format_args!("{beam_count} lines declared, {count} stored"));
    }

    let mut lines = Vec::with_capacity(count);
    for i in 0..count {
        cur.skip(1)?;
        let tuplet = cur.u8()?;
        let start_measure = i32::from(cur.u8()?);
        let stop_measure = i32::from(cur.u8()?);
        let start_offset = cur.i16()?;
        let stop_offset = cur.i16()?;
        lines.push(BeamLine {
            tuplet,
            start: MeasurePos::new(start_measure, start_offset),
            stop: MeasurePos::new(stop_measure, stop_offset),
        });

        if i == 0 {
            cur.skip(4)?;
            // up +4, down -4
            shape.left_shoulder.y = cur.i16()?;
            shape.right_shoulder.y = cur.i16()?;
        } else {
            cur.skip(8)?;
        }
    }

    let stop = lines.iter().map(|l| l.stop).max().unwrap_or_default();
    let mut data = common.into_data(MusicKind::Beam(Beam { grace, lines, shape }));
    data.voice = voice;
    data.stop = stop;
    Ok(data)
}

fn tie(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;
    cur.skip(1)?;
    let note = cur.u8()?;
    let (shape, stop) = read_span(cur)?;
    let height = i32::from(cur.u16()?);

    let mut data = common.into_data(MusicKind::Tie(Tie { note, height, shape }));
    data.stop = stop;
    Ok(data)
}

fn tuplet(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;
    cur.skip(2)?;
    let (shape, stop) = read_span(cur)?;
    cur.skip(2)?;
    let height = i32::from(cur.u16()?);
    let ratio = i32::from(cur.u8()?);
    let space = i32::from(cur.u8()?);
    let mark_handle = read_offset(cur)?;

    let mut data = common.into_data(MusicKind::Tuplet(Tuplet {
        tuplet: ratio,
        space,
        height,
        mark_handle,
        shape,
        ..Default::default()
    }));
    data.stop = stop;
    Ok(data)
}

fn slur(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<MusicData> {
    cur.skip(2)?;
    let voice = low_nibble(cur.u8()?) & 0x7;
    let common = read_common(cur, version)?;
    let show_on_top = high_nibble(cur.u8()?) == 0x8;
    cur.skip(1)?;
    let (shape, stop) = read_span(cur)?;
    let handle2 = read_offset(cur)?;
    let handle3 = read_offset(cur)?;

    let mut note_time_percent = 100;
    if version.is_v4() {
        cur.skip(3)?;
        note_time_percent = i32::from(cur.u8()?);
        cur.skip(36)?;
    }

    let mut data = common.into_data(MusicKind::Slur(Slur {
        show_on_top,
        note_time_percent,
        shape,
        handle2,
        handle3,
    }));
    data.voice = voice;
    data.stop = stop;
    Ok(data)
}

fn glissando(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;
    let straight_wavy = high_nibble(cur.u8()?) == 4;
    cur.skip(1)?;
    let (shape, stop) = read_span(cur)?;

    let mut line_thick = 0;
    let mut text = String::new();
    if version.is_v4() {
        cur.skip(1)?;
        line_thick = i32::from(cur.u8()?);
        cur.skip(12)?;
        text = read_text(cur, 32)?;
        cur.skip(6)?;
    }

    let mut data = common.into_data(MusicKind::Glissando(Glissando {
        straight_wavy,
        line_thick,
        text,
        shape,
    }));
    data.stop = stop;
    Ok(data)
}

fn pedal(cur: &mut ByteCursor<'_>, version: FormatVersion, payload: usize) -> Result<MusicData> {
    cur.skip(1)?;
    let playback = high_nibble(cur.u8()?) != 4;
    cur.skip(1)?;
    let common = read_common(cur, version)?;
    cur.skip(2)?;
    let (shape, stop) = read_span(cur)?;

    let half = payload > version.pick(0x45, 0x23);
    cur.skip(version.pick(42, 10))?;
    let mut handle = None;
    if half {
        cur.skip(2)?;
        handle = Some(Offset { x: cur.i16()?, y: 0 });
        cur.skip(6)?;
    }

    let mut data = common.into_data(MusicKind::Pedal(Pedal { half, playback, handle, shape }));
    data.stop = stop;
    Ok(data)
}

/// Octave shift; its endpoints are produced when the score is organized.
fn octave(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;
    let (shift_type, positions) = octave_shift(low_nibble(cur.u8()?));
    cur.skip(1)?;
    let y = cur.i16()?;
    cur.skip(4)?;
    let length = i32::from(cur.u16()?);
    let end_tick = i32::from(cur.u16()?);

    let mut data = common.into_data(MusicKind::OctaveShift(OctaveShift {
        shift_type,
        positions: positions.to_vec(),
        length,
        end_tick,
    }));
    data.offset.y = y;
    Ok(data)
}

/// A hairpin, or the text form of crescendo/decrescendo which decodes as
/// an expression.
fn wedge(cur: &mut ByteCursor<'_>, version: FormatVersion, payload: usize) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;

    let b = cur.u8()?;
    let (mut wedge_type, mut is_line) = match high_nibble(b) {
        0x4 => (WedgeType::DecrescLine, true),
        0x6 => (WedgeType::Decresc, false),
        0x2 => (WedgeType::Cres, false),
        _ => (WedgeType::CresLine, true),
    };
    // 0xB in Overture 4, 0x8 in Overture 3
    if low_nibble(b) & 0x8 == 0x8 {
        wedge_type = WedgeType::DoubleLine;
        is_line = true;
    }
    cur.skip(1)?;
    let y = cur.i16()?;

    let mut data = if is_line {
        cur.skip(2)?;
        let height = i32::from(cur.u16()?);
        let stop = read_stop(cur)?;
        let mut data = common.into_data(MusicKind::Wedge(Wedge { wedge_type, height }));
        data.stop = stop;
        data
    } else {
        cur.skip(4)?;
        let stop = read_stop(cur)?;
        let text = if version.is_v4() {
            cur.skip(18)?;
            if payload > 39 {
                read_text(cur, payload - 39)?
            } else {
                String::new()
            }
        } else {
            cur.skip(8)?;
            let text = if wedge_type == WedgeType::Cres { "cresc" } else { "decresc" };
            text.to_string()
        };
        let mut data = common.into_data(MusicKind::Expressions(Expressions {
            text,
            bar_offset: 0,
            tempo1: 0,
            tempo2: 0,
        }));
        data.stop = stop;
        data
    };
    data.offset.y = y;
    Ok(data)
}

// ═══════════════════════════════════════════════════════════════════════
// Single-measure data
// ═══════════════════════════════════════════════════════════════════════

fn harmony(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;
    let bass_on_bottom = high_nibble(cur.u8()?) == 0x4;
    cur.skip(1)?;
    let y = cur.i16()?;
    let harmony_type = harmony_type(cur.u16()?);
    let root = cur.i8()?;
    let bass = cur.i8()?;
    let angle = cur.i16()?;
    let mut length = 0;
    if version.is_v4() {
        length = i32::from(cur.u16()?);
        cur.skip(4)?;
    }

    let mut data = common.into_data(MusicKind::Harmony(Harmony {
        harmony_type,
        root,
        bass,
        bass_on_bottom,
        angle,
        length,
        guitar_frame: false,
    }));
    data.offset.y = y;
    Ok(data)
}

fn harmony_guitar_frame(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;
    let root = i32::from(cur.u8()?);
    let harmony_type = harmony_type_by_index(cur.u8()?);
    let bass = i32::from(cur.u8()?);

    Ok(common.into_data(MusicKind::Harmony(Harmony {
        harmony_type,
        root,
        bass,
        bass_on_bottom: false,
        angle: 0,
        length: 0,
        guitar_frame: true,
    })))
}

fn clef(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;
    let clef = ClefType::from_code(cur.u8()?);
    let line = cur.i8()?;
    cur.skip(2)?;
    Ok(common.into_data(MusicKind::Clef(ClefChange { clef, line })))
}

fn dynamics(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<MusicData> {
    cur.skip(1)?;
    let playback = high_nibble(cur.u8()?) != 0x4;
    cur.skip(1)?;
    let common = read_common(cur, version)?;
    let y = cur.i16()?;
    let dynamics_type = dynamics_type(low_nibble(cur.u8()?));
    let velocity = cur.u8()?;
    cur.skip(version.pick(4, 2))?;

    let mut data = common.into_data(MusicKind::Dynamics(Dynamics { dynamics_type, velocity, playback }));
    data.offset.y = y;
    Ok(data)
}

fn key(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<KeySignature> {
    cur.skip(version.pick(9, 7))?;
    let key = ove_key_to_key(cur.u8()?);
    let previous_key = ove_key_to_key(cur.u8()?);
    cur.skip(3)?;
    let symbol_count = cur.u8()?;
    cur.skip(4)?;
    Ok(KeySignature { key, previous_key, set: true, symbol_count })
}

fn lyric(cur: &mut ByteCursor<'_>, version: FormatVersion, payload: usize) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;
    cur.skip(2)?;
    let offset = read_offset(cur)?;
    cur.skip(7)?;
    let verse = cur.u8()?;
    let mut text = String::new();
    if version.is_v4() {
        cur.skip(6)?;
        if payload > 29 {
            text = read_text(cur, payload - 29)?;
        }
    }

    let mut data = common.into_data(MusicKind::Lyric(Lyric { verse, text }));
    data.offset = offset;
    Ok(data)
}

fn kuohao(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;
    cur.skip(2)?;
    let left_line = cur.i16()?;
    let right_line = cur.i16()?;
    cur.skip(4)?;
    let left_shoulder = read_offset(cur)?;
    let right_shoulder = read_offset(cur)?;
    let kuohao_type = kuohao_type(cur.u8()?);
    let height = i32::from(cur.u8()?);
    cur.skip(version.pick(40, 8))?;

    Ok(common.into_data(MusicKind::KuoHao(KuoHao {
        kuohao_type,
        height,
        shape: CrossShape { left_line, right_line, left_shoulder, right_shoulder },
    })))
}

fn harp_pedal(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;
    cur.skip(2)?;
    let y = cur.i16()?;
    let show_type = cur.u8()?;
    let show_char_flag = cur.u8()?;
    cur.skip(8)?;

    let mut data = common.into_data(MusicKind::HarpPedal(HarpPedal { show_type, show_char_flag }));
    data.offset.y = y;
    Ok(data)
}

fn multi_measure_rest(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;
    cur.skip(6)?;
    Ok(common.into_data(MusicKind::MultiMeasureRest))
}

// ═══════════════════════════════════════════════════════════════════════
// Records shared with COND
// ═══════════════════════════════════════════════════════════════════════

/// Dotted barline, single-note articulation or measure repeat.
pub(crate) fn decorator(cur: &mut ByteCursor<'_>, version: FormatVersion) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;
    cur.skip(2)?;
    let y = cur.i16()?;
    cur.skip(2)?;

    let kind = match decorator_code(cur.u8()?) {
        DecoratorCode::MeasureRepeat { single } => MusicKind::MeasureRepeat(MeasureRepeat { single }),
        DecoratorCode::Decorator(decorator_type, articulation) => {
            MusicKind::Decorator(Decorator { decorator_type, articulation })
        }
    };
    let mut data = common.into_data(kind);
    data.offset.y = y;
    Ok(data)
}

/// Rehearsal mark, system text or measure text.
pub(crate) fn text(cur: &mut ByteCursor<'_>, version: FormatVersion, payload: usize) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;

    let b = cur.u8()?;
    let include_line_break = high_nibble(b) & 0x2 != 0x2;
    let text_type = match low_nibble(b) {
        0 => TextType::MeasureText,
        1 => TextType::SystemText,
        _ => TextType::Rehearsal,
    };
    cur.skip(1)?;

    let x = cur.i32()?;
    let y = cur.i32()?;
    let width = cur.u32()?;
    let height = cur.u32()?;
    cur.skip(7)?;
    let horizontal_margin = cur.u8()?;
    cur.skip(1)?;
    let vertical_margin = cur.u8()?;
    cur.skip(1)?;
    let line_thick = cur.u8()?;
    cur.skip(2)?;
    let size = usize::from(cur.u16()?);
    let content = read_text(cur, size)?;

    if include_line_break {
        // up to two blocks of 8-byte line parameters follow the text
        let mut cursor = version.pick(43, 41) + size;
        for i in 0..2 {
            if cursor >= payload {
                break;
            }
            let lines = usize::from(cur.u16()?);
            let end = cursor + 2 + 8 * lines;
            if end > payload || (i == 1 && end != payload) {
                tolerate("text", format_args!("line block ends at {end} in a {payload}-byte record"));
                break;
            }
            cur.skip(8 * lines)?;
            cursor = end;
        }
    } else {
        cur.skip(6)?;
    }

    Ok(common.into_data(MusicKind::Text(Text {
        text_type,
        text: content,
        x,
        y,
        width,
        height,
        horizontal_margin,
        vertical_margin,
        line_thick,
        include_line_break,
    })))
}

pub(crate) fn expressions(cur: &mut ByteCursor<'_>, version: FormatVersion, payload: usize) -> Result<MusicData> {
    cur.skip(3)?;
    let common = read_common(cur, version)?;
    cur.skip(2)?;
    let y = cur.i16()?;
    let bar_offset = i32::from(cur.u16()?);
    cur.skip(10)?;
    let tempo1 = i32::from(cur.u16()?);
    let tempo2 = i32::from(cur.u16()?);
    cur.skip(6)?;

    let header = version.pick(35, 33);
    let text = if payload > header { read_text(cur, payload - header)? } else { String::new() };

    let mut data = common.into_data(MusicKind::Expressions(Expressions { text, bar_offset, tempo1, tempo2 }));
    data.offset.y = y;
    Ok(data)
}

// ═══════════════════════════════════════════════════════════════════════
// Raw MIDI
// ═══════════════════════════════════════════════════════════════════════

fn midi(cur: &mut ByteCursor<'_>, version: FormatVersion, tag: BdatTag) -> Result<MidiData> {
    cur.skip(3)?;
    let tick = i32::from(cur.u16()?);

    let kind = match tag {
        BdatTag::MidiController => {
            let value = cur.u8()?;
            let controller = cur.u8()?;
            MidiKind::Controller { controller, value }
        }
        BdatTag::MidiProgramChange => {
            cur.skip(1)?;
            MidiKind::ProgramChange { patch: cur.u8()? }
        }
        BdatTag::MidiChannelPressure => {
            cur.skip(1)?;
            MidiKind::ChannelPressure { pressure: cur.u8()? }
        }
        _ => MidiKind::PitchWheel { value: cur.u16()? },
    };
    if version.is_v4() {
        cur.skip(2)?;
    }

    Ok(MidiData { tick, kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Tag;
    use crate::model::{ArticulationType, OctaveShiftPosition, OctaveShiftType};

    /// Frame records into a BDAT payload.
    fn bdat(records: &[(u8, Vec<u8>)]) -> Vec<u8> {
        let mut out = (records.len() as u16).to_be_bytes().to_vec();
        for (tag, payload) in records {
            out.extend(((payload.len() + 7) as u16).to_be_bytes());
            out.push(*tag);
            out.extend(payload);
        }
        out
    }

    fn decode(version: FormatVersion, records: &[(u8, Vec<u8>)]) -> MeasureData {
        let data = bdat(records);
        let mut md = MeasureData::default();
        parse_bdat(&SizeChunk { tag: Tag::new(b"BDAT"), offset: 0, data: &data }, version, &mut md).unwrap();
        md
    }

    fn common_v4(tick: i16, offset: i16) -> Vec<u8> {
        let mut v = tick.to_be_bytes().to_vec();
        v.extend(offset.to_be_bytes());
        v.extend([0, 0]);
        v
    }

    fn note_record(tick: i16, offset: i16, pitch: u8, articulations: &[Vec<u8>]) -> Vec<u8> {
        let mut r = vec![0x00, 0x00, 0x01]; // not grace, voice 1
        r.extend(common_v4(tick, offset));
        r.extend([0, 0, 0x00, 0x03]); // no tuplet, quarter
        r.extend([0x80, 0x00, 0x00, 1]); // stem up, shown, one note
        r.extend([0x00, 0x00, 0x00, 0x00, 0, 2, 0, pitch, 90, 64, 0, 0]);
        r.extend(480u16.to_be_bytes());
        r.extend(0i16.to_be_bytes());
        for a in articulations {
            r.extend(a);
        }
        r
    }

    fn articulation_v4(code: u8, settings: u8, length_pct: u8) -> Vec<u8> {
        let mut a = vec![0u8; 40];
        a[..2].copy_from_slice(&40u16.to_be_bytes());
        a[2] = code;
        a[3] = 0x30;
        a[8] = settings;
        a[37] = length_pct;
        a
    }

    #[test]
    fn note_with_articulations() {
        let staccato = articulation_v4(0x18, 0x02, 50);
        let fermata = articulation_v4(0x26, 0x00, 0);
        let md = decode(FormatVersion::V4, &[(0x90, note_record(240, 64, 62, &[staccato, fermata]))]);

        assert_eq!(md.containers.len(), 1);
        let c = &md.containers[0];
        assert_eq!((c.tick, c.start.offset, c.voice), (240, 64, 1));
        assert_eq!(c.note_type, NoteType::Quarter);
        assert!(c.stem_up && c.show_stem);
        assert_eq!(c.length, 480);
        assert_eq!(c.notes[0].note, 62);
        assert_eq!(c.notes[0].on_velocity, 90);
        assert_eq!(c.articulations.len(), 2);
        assert_eq!(c.articulations[0].art_type, ArticulationType::Staccato);
        assert!(c.articulations[0].change_length);
        assert_eq!(c.articulations[0].length_percentage, 50);
        assert_eq!(c.articulations[1].art_type, ArticulationType::Fermata);
        assert_eq!(c.articulations[1].length_percentage, 100);
    }

    #[test]
    fn hidden_stem_is_read_from_its_own_byte() {
        let mut record = note_record(0, 0, 60, &[]);
        record[13] = 0x40;
        let md = decode(FormatVersion::V4, &[(0x90, record)]);
        assert!(!md.containers[0].show_stem);
        assert!(md.containers[0].stem_up);
    }

    #[test]
    fn rest_carries_its_line() {
        let mut r = vec![0x00, 0x00, 0x00];
        r.extend(common_v4(0, 0));
        r.extend([0, 0, 0x00, 0x02, 0xFE, 0x00]);
        let md = decode(FormatVersion::V4, &[(0x80, r)]);
        let c = &md.containers[0];
        assert!(c.is_rest);
        assert_eq!(c.note_type, NoteType::Half);
        assert_eq!(c.notes[0].line, -2);
    }

    #[test]
    fn unknown_and_padded_records_keep_framing() {
        let mut key = vec![0u8; 9];
        key.extend([10, 0, 0, 0, 0, 3, 0, 0, 0, 0]);
        key.extend([0xAA; 5]); // padding past the fields
        let md = decode(FormatVersion::V4, &[(0x5A, vec![1, 2, 3]), (0x17, key), (0x80, {
            let mut r = vec![0x00, 0x00, 0x00];
            r.extend(common_v4(0, 0));
            r.extend([0, 0, 0x00, 0x03, 0x00, 0x00]);
            r
        })]);
        assert_eq!(md.key.key, 3);
        assert!(md.key.set);
        assert_eq!(md.containers.len(), 1);
    }

    #[test]
    fn beam_keeps_lines_and_tuplet_hint() {
        let mut r = vec![0x00, 0x00, 0x02];
        r.extend(common_v4(0, 0));
        r.extend([0, 0, 2, 0, 0xFC, 0xFD]);
        r.extend([0u8; 8]);
        // two lines, 16 bytes each
        r.extend([0, 3, 0, 0, 0, 0, 0, 0x80, 0, 0, 0, 0, 0, 4, 0, 4]);
        r.extend([0, 3, 0, 1, 0, 0x40, 0, 0x20, 0, 0, 0, 0, 0, 0, 0, 0]);
        let md = decode(FormatVersion::V4, &[(0x10, r)]);

        let data = &md.music[0];
        assert_eq!(data.voice, 2);
        assert_eq!(data.stop, MeasurePos::new(1, 0x20));
        let MusicKind::Beam(beam) = &data.kind else { panic!("not a beam") };
        assert_eq!(beam.lines.len(), 2);
        assert_eq!(beam.lines[0].tuplet, 3);
        assert_eq!(beam.lines[0].stop, MeasurePos::new(0, 0x80));
        assert_eq!(beam.shape.left_line, -4);
        assert_eq!(beam.shape.right_shoulder.y, 4);
    }

    #[test]
    fn octave_shift_record() {
        let mut r = vec![0, 0, 0];
        r.extend(common_v4(120, 32));
        r.extend([0x0C, 0, 0, 0, 0, 0, 0, 0]);
        r.extend(240u16.to_be_bytes());
        r.extend(360u16.to_be_bytes());
        let md = decode(FormatVersion::V4, &[(0x19, r)]);
        let MusicKind::OctaveShift(shift) = &md.music[0].kind else { panic!("not an octave shift") };
        assert_eq!(shift.shift_type, OctaveShiftType::Up8);
        assert_eq!(shift.positions, vec![OctaveShiftPosition::Start, OctaveShiftPosition::Stop]);
        assert_eq!((shift.length, shift.end_tick), (240, 360));
    }

    #[test]
    fn double_line_wedge_and_text_crescendo() {
        let mut line = vec![0, 0, 0];
        line.extend(common_v4(0, 0));
        line.extend([0x0B, 0, 0, 5, 0, 0, 0, 9, 0, 2, 0, 0x10]);
        let mut text = vec![0, 0, 0];
        text.extend(common_v4(0, 0));
        text.extend([0x20, 0, 0, 0]);
        text.extend([0u8; 4]);
        text.extend([0, 0, 0, 0]);
        text.extend([0u8; 18]);

        let md = decode(FormatVersion::V4, &[(0x13, line)]);
        let data = &md.music[0];
        assert_eq!(data.stop, MeasurePos::new(2, 0x10));
        let MusicKind::Wedge(w) = &data.kind else { panic!("not a wedge") };
        assert_eq!(w.wedge_type, WedgeType::DoubleLine);
        assert_eq!(w.height, 9);

        let md = decode(FormatVersion::V4, &[(0x13, text)]);
        assert!(matches!(md.music[0].kind, MusicKind::Expressions(_)));
    }

    #[test]
    fn midi_events() {
        let controller = vec![0, 0, 0, 0, 0x10, 100, 7, 0, 0];
        let wheel = vec![0, 0, 0, 0, 0x20, 0x20, 0x00, 0, 0];
        let md = decode(FormatVersion::V4, &[(0xAB, controller), (0xAE, wheel)]);
        assert_eq!(md.midi[0], MidiData { tick: 16, kind: MidiKind::Controller { controller: 7, value: 100 } });
        assert_eq!(md.midi[1], MidiData { tick: 32, kind: MidiKind::PitchWheel { value: 0x2000 } });
    }

    #[test]
    fn truncated_record_is_an_error() {
        let mut data = bdat(&[(0x90, note_record(0, 0, 60, &[]))]);
        data.truncate(data.len() - 4);
        let mut md = MeasureData::default();
        let err = parse_bdat(&SizeChunk { tag: Tag::new(b"BDAT"), offset: 0, data: &data }, FormatVersion::V4, &mut md)
            .unwrap_err();
        assert!(err.is_truncation());
    }
}
