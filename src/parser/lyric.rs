//! `LYRC` chunk written by Overture 3: lyric text kept outside the measures.

use log::warn;

use crate::chunk::{ByteCursor, SizeChunk};
use crate::error::Result;
use crate::model::LyricInfo;

/// Decode every lyric record of the chunk. A short payload keeps the
/// records read before it.
pub fn parse_lyric_chunk(chunk: &SizeChunk<'_>) -> Vec<LyricInfo> {
    let mut cur = ByteCursor::over(chunk);
    let mut infos = Vec::new();
    if let Err(e) = read_infos(&mut cur, &mut infos) {
        warn!("LYRC: {e}");
    }
    infos
}

fn read_infos(cur: &mut ByteCursor<'_>, infos: &mut Vec<LyricInfo>) -> Result<()> {
    cur.skip(4)?;
    let count = cur.u16()?;
    for _ in 0..count {
        infos.push(read_info(cur)?);
    }
    Ok(())
}

fn read_info(cur: &mut ByteCursor<'_>) -> Result<LyricInfo> {
    let mut info = LyricInfo::default();

    // record size, then 0x0D00
    cur.skip(4)?;
    info.voice = cur.u8()?;
    info.verse = cur.u8()?;
    info.track = usize::from(cur.u8()?);
    cur.skip(1)?;
    info.measure = usize::from(cur.u16()?);
    info.word_count = cur.u16()?;
    let lyric_size = usize::from(cur.u16()?);
    cur.skip(6)?;
    info.name = cur.fixed_text(32)?;

    if lyric_size > 0 {
        info.lyric = cur.fixed_text(lyric_size)?;
        cur.skip(4)?;
        info.font = cur.u16()?;
        cur.skip(1)?;
        info.font_size = cur.u8()?;
        info.font_style = cur.u8()?;
        cur.skip(1)?;
        cur.skip(8 * usize::from(info.word_count))?;
    }

    Ok(info)
}

impl LyricInfo {
    /// Words of the lyric, split on spaces and newlines.
    pub fn words(&self) -> Vec<&str> {
        self.lyric
            .split([' ', '\n'])
            .filter(|w| !w.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Tag;

    fn record(track: u8, measure: u16, lyric: &str) -> Vec<u8> {
        let mut r = vec![0, 0, 0x0D, 0, 1, 2, track, 0];
        r.extend(measure.to_be_bytes());
        r.extend(2u16.to_be_bytes()); // word count
        r.extend((lyric.len() as u16).to_be_bytes());
        r.extend([0u8; 6]);
        let mut name = [0u8; 32];
        name[..5].copy_from_slice(b"Verse");
        r.extend(name);
        r.extend(lyric.as_bytes());
        r.extend([0, 0, 0, 0, 0, 7, 0, 12, 1, 0]);
        r.extend([0u8; 16]);
        r
    }

    #[test]
    fn decodes_records() {
        let mut data = vec![0, 0, 0, 0, 0, 2];
        data.extend(record(0, 3, "la di"));
        data.extend(record(1, 0, "da"));
        let infos = parse_lyric_chunk(&SizeChunk { tag: Tag::new(b"LYRC"), offset: 0, data: &data });
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].name, "Verse");
        assert_eq!((infos[0].voice, infos[0].verse, infos[0].measure), (1, 2, 3));
        assert_eq!(infos[0].font, 7);
        assert_eq!(infos[0].font_size, 12);
        assert_eq!(infos[0].words(), vec!["la", "di"]);
        assert_eq!(infos[1].track, 1);
    }

    #[test]
    fn short_chunk_keeps_earlier_records() {
        let mut data = vec![0, 0, 0, 0, 0, 2];
        data.extend(record(0, 0, "one"));
        data.extend([0u8; 5]);
        let infos = parse_lyric_chunk(&SizeChunk { tag: Tag::new(b"LYRC"), offset: 0, data: &data });
        assert_eq!(infos.len(), 1);
    }
}
