//! Track records (`TRAK` chunks, or fixed 314-byte blocks in Overture 3).

use crate::chunk::{ByteCursor, SizeChunk};
use crate::error::{OveError, Result};
use crate::model::{ClefType, Track};
use crate::tables::ove_key_to_key;

/// Size of an untagged Overture 3 track record.
pub const V3_TRACK_SIZE: usize = 0x13A;

/// Decode one track; any short read is reported against the track index.
pub fn parse_track(chunk: &SizeChunk<'_>, index: usize) -> Result<Track> {
    let mut cur = ByteCursor::over(chunk);
    read_track(&mut cur).map_err(|e| {
        if e.is_truncation() {
            OveError::TruncatedTrackRecord { index }
        } else {
            e
        }
    })
}

fn read_track(cur: &mut ByteCursor<'_>) -> Result<Track> {
    let mut track = Track::default();

    track.name = cur.fixed_text(32)?;
    track.brief_name = cur.fixed_text(32)?;
    cur.skip(9)?;

    track.patch = cur.i8()? & 0x7F;
    track.show_name = cur.flag()?;
    track.show_brief_name = cur.flag()?;
    cur.skip(1)?;
    track.show_transpose = cur.flag()?;
    cur.skip(1)?;
    track.mute = cur.flag()?;
    track.solo = cur.flag()?;
    cur.skip(1)?;
    track.show_key_each_line = cur.flag()?;
    track.voice_count = cur.u8()?;
    cur.skip(3)?;
    track.transpose = cur.i8()?;
    cur.skip(2)?;
    track.start_clef = ClefType::from_code(cur.u8()?);
    track.transpose_clef = ClefType::from_code(cur.u8()?);
    track.start_key = ove_key_to_key(cur.u8()?);
    track.display_percent = cur.u8()?;
    track.show_leger_line = cur.flag()?;
    track.show_clef = cur.flag()?;
    track.show_time_signature = cur.flag()?;
    track.show_key_signature = cur.flag()?;
    track.show_barline = cur.flag()?;
    track.fill_with_rest = cur.flag()?;
    track.flat_tail = cur.flag()?;
    track.show_clef_each_line = cur.flag()?;
    cur.skip(12)?;

    for voice in track.voices.iter_mut() {
        cur.skip(5)?;
        voice.channel = cur.u8()?;
        voice.volume = cur.i8()?;
        voice.pitch_shift = cur.i8()?;
        voice.pan = cur.i8()?;
        cur.skip(6)?;
        voice.patch = cur.i8()?;
    }

    // second pass over the voices
    for voice in track.voices.iter_mut() {
        voice.stem_type = cur.u8()?;
    }

    for drum in track.drums.iter_mut() {
        drum.line = cur.i8()?;
    }
    for drum in track.drums.iter_mut() {
        drum.head_type = cur.u8()?;
    }
    for drum in track.drums.iter_mut() {
        drum.pitch = cur.u8()?;
    }
    for drum in track.drums.iter_mut() {
        drum.voice = cur.u8()?;
    }

    Ok(track)
}
