//! Top-level chunk dispatch.
//!
//! An OVE file is an `OVSC` header followed by list chunks in a fixed
//! order. The decoder walks them, hands each payload to its parser, and
//! stops at the first tag it does not recognise. The score is organized
//! once every chunk has been read.

use std::collections::HashMap;

use log::{debug, info, trace};

use crate::chunk::{
    expect_size_chunk, read_fixed_block, read_group_count, read_size_chunk, ByteCursor, ChunkKind,
    SizeChunk,
};
use crate::error::{OveError, Result};
use crate::lyrics::associate_lyrics;
use crate::model::{Line, Measure, MeasureData, Score};
use crate::organizer::organize;
use crate::parser::bars::{parse_cond, parse_meas};
use crate::parser::bdat::parse_bdat;
use crate::parser::header::parse_header;
use crate::parser::layout::{line_staff_count, parse_line, parse_page, parse_staff};
use crate::parser::lyric::parse_lyric_chunk;
use crate::parser::title::parse_title;
use crate::parser::track::{parse_track, V3_TRACK_SIZE};

/// Passes run after the chunks are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Group tracks, propagate attributes and resolve spanning elements.
    pub organize: bool,
    /// Fill Overture 3 lyric slots from the `LYRC` chunk.
    pub associate_lyrics: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions { organize: true, associate_lyrics: true }
    }
}

/// Reported after every `BDAT` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub measure: usize,
    pub measure_count: usize,
    pub track: usize,
    pub track_count: usize,
}

/// Decoder for one in-memory OVE file.
pub struct FileDecoder<'a> {
    data: &'a [u8],
    options: DecodeOptions,
    progress: Option<&'a mut dyn FnMut(Progress)>,
}

impl<'a> FileDecoder<'a> {
    pub fn new(data: &'a [u8], options: DecodeOptions) -> Self {
        FileDecoder { data, options, progress: None }
    }

    /// Install a callback invoked after each measure of each track.
    pub fn with_progress(mut self, callback: &'a mut dyn FnMut(Progress)) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Decode the whole buffer. Any failure discards the score.
    pub fn decode(mut self) -> Result<Score> {
        let mut cur = ByteCursor::new(self.data);
        let mut score = read_header(&mut cur)?;

        let mut seen: HashMap<ChunkKind, usize> = HashMap::new();
        seen.insert(ChunkKind::Ovsc, 1);

        while cur.remaining() >= 4 {
            let tag = cur.tag()?;
            let Some(kind) = ChunkKind::from_tag(tag) else {
                debug!("stream ends at unrecognised tag '{tag}' (offset {})", cur.offset() - 4);
                break;
            };

            let count = seen.entry(kind).or_insert(0);
            *count += 1;
            if let Some(max) = kind.max_occurrences() {
                if *count > max {
                    return Err(OveError::MalformedChunkSequence(format!(
                        "chunk '{tag}' appears more than {max} time(s)"
                    )));
                }
            }

            debug!("chunk '{tag}' at offset {}", cur.offset() - 4);
            match kind {
                ChunkKind::Trkl => read_tracks(&mut cur, &mut score)?,
                ChunkKind::Pagl => read_pages(&mut cur, &mut score)?,
                ChunkKind::Linl => read_lines(&mut cur, &mut score)?,
                ChunkKind::Barl => self.read_bars(&mut cur, &mut score)?,
                ChunkKind::Lyrc => {
                    let chunk = read_size_chunk(&mut cur, tag)?;
                    score.lyric_infos = parse_lyric_chunk(&chunk);
                }
                ChunkKind::Titl => {
                    let chunk = read_size_chunk(&mut cur, tag)?;
                    parse_title(&chunk, &mut score);
                }
                ChunkKind::Pach
                | ChunkKind::Fnts
                | ChunkKind::Odev
                | ChunkKind::Alot
                | ChunkKind::Engr
                | ChunkKind::Fmap
                | ChunkKind::Pcpr => {
                    let chunk = read_size_chunk(&mut cur, tag)?;
                    debug!("skipped '{tag}' ({} bytes)", chunk.len());
                }
                ChunkKind::Ovsc
                | ChunkKind::Trak
                | ChunkKind::Page
                | ChunkKind::Line
                | ChunkKind::Staf
                | ChunkKind::Meas
                | ChunkKind::Cond
                | ChunkKind::Bdat => {
                    return Err(OveError::MalformedChunkSequence(format!(
                        "chunk '{tag}' outside of its list"
                    )));
                }
            }
        }

        info!("{} tracks, {} measures", score.track_count(), score.measure_count());

        if self.options.associate_lyrics && !score.version.is_v4() && !score.lyric_infos.is_empty() {
            associate_lyrics(&mut score);
        }
        if self.options.organize {
            organize(&mut score);
        }

        Ok(score)
    }

    fn read_bars(&mut self, cur: &mut ByteCursor<'_>, score: &mut Score) -> Result<()> {
        let measure_count = read_group_count(cur).map_err(|e| e.in_bars("BARL", 0, 0))?;
        if measure_count == 0 {
            return Err(OveError::MalformedChunkSequence("BARL declares no measures".into()));
        }
        let track_count = score.track_count();
        let version = score.version;

        score.measures = (0..measure_count).map(Measure::new).collect();
        score.measure_data = vec![MeasureData::default(); track_count * measure_count];

        for (i, measure) in score.measures.iter_mut().enumerate() {
            let chunk = expect_size_chunk(cur, ChunkKind::Meas).map_err(|e| e.in_bars("MEAS", i, 0))?;
            parse_meas(&chunk, version, measure).map_err(|e| e.in_bars("MEAS", i, 0))?;
        }

        let mut conductor = vec![MeasureData::default(); measure_count];
        for (i, md) in conductor.iter_mut().enumerate() {
            let chunk = expect_size_chunk(cur, ChunkKind::Cond).map_err(|e| e.in_bars("COND", i, 0))?;
            parse_cond(&chunk, version, &mut score.measures[i], md).map_err(|e| e.in_bars("COND", i, 0))?;
        }
        if track_count > 0 {
            for (cell, md) in score.measure_data.iter_mut().zip(conductor) {
                *cell = md;
            }
        }

        for i in 0..track_count * measure_count {
            let (track, measure) = (i / measure_count, i % measure_count);
            let chunk = expect_size_chunk(cur, ChunkKind::Bdat).map_err(|e| e.in_bars("BDAT", measure, track))?;
            trace!("BDAT track {track} measure {measure}: {} bytes", chunk.len());
            parse_bdat(&chunk, version, &mut score.measure_data[i]).map_err(|e| e.in_bars("BDAT", measure, track))?;

            if let Some(callback) = self.progress.as_deref_mut() {
                callback(Progress { measure, measure_count, track, track_count });
            }
        }

        Ok(())
    }
}

/// Decode `data` with default options.
pub fn decode(data: &[u8]) -> Result<Score> {
    FileDecoder::new(data, DecodeOptions::default()).decode()
}

fn read_header(cur: &mut ByteCursor<'_>) -> Result<Score> {
    let chunk = match cur.tag() {
        Ok(tag) if ChunkKind::from_tag(tag) == Some(ChunkKind::Ovsc) => {
            read_size_chunk(cur, tag).map_err(|_| OveError::NotAnOveFile)?
        }
        _ => return Err(OveError::NotAnOveFile),
    };
    parse_header(&chunk).map_err(|_| OveError::NotAnOveFile)
}

fn read_tracks(cur: &mut ByteCursor<'_>, score: &mut Score) -> Result<()> {
    let count = read_group_count(cur)?;
    for index in 0..count {
        let chunk: SizeChunk<'_> = if score.version.is_v4() {
            expect_size_chunk(cur, ChunkKind::Trak)?
        } else {
            read_fixed_block(cur, ChunkKind::Trak.tag(), V3_TRACK_SIZE)?
        };
        score.tracks.push(parse_track(&chunk, index)?);
    }
    Ok(())
}

fn read_pages(cur: &mut ByteCursor<'_>, score: &mut Score) -> Result<()> {
    let count = read_group_count(cur)?;
    for _ in 0..count {
        let chunk = expect_size_chunk(cur, ChunkKind::Page)?;
        score.pages.push(parse_page(&chunk)?);
    }
    Ok(())
}

fn read_lines(cur: &mut ByteCursor<'_>, score: &mut Score) -> Result<()> {
    let count = read_group_count(cur)?;
    for _ in 0..count {
        let chunk = expect_size_chunk(cur, ChunkKind::Line)?;
        let mut line: Line = parse_line(&chunk)?;
        for _ in 0..line_staff_count(&chunk)? {
            let staff = expect_size_chunk(cur, ChunkKind::Staf)?;
            line.staves.push(parse_staff(&staff, score.version)?);
        }
        score.lines.push(line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = tag.to_vec();
        out.extend((payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn header() -> Vec<u8> {
        let mut payload = vec![4u8];
        payload.extend([0u8; 15]);
        chunk(b"OVSC", &payload)
    }

    #[test]
    fn missing_header_is_not_an_ove_file() {
        assert_eq!(decode(b"RIFF\0\0\0\0").unwrap_err(), OveError::NotAnOveFile);
        assert_eq!(decode(b"OV").unwrap_err(), OveError::NotAnOveFile);
        assert_eq!(decode(b"OVSC\0\0\0\x40").unwrap_err(), OveError::NotAnOveFile);
    }

    #[test]
    fn header_alone_decodes_to_an_empty_score() {
        let score = decode(&header()).unwrap();
        assert!(score.version.is_v4());
        assert_eq!(score.track_count(), 0);
        assert!(score.measure_data.is_empty());
    }

    #[test]
    fn unknown_tag_ends_the_stream() {
        let mut data = header();
        data.extend(b"\xFF\xFF\xFF\xFF\0\0\0\0");
        data.extend(chunk(b"PACH", &[0; 4]));
        data.extend(chunk(b"PACH", &[0; 4]));
        assert!(decode(&data).is_ok());
    }

    #[test]
    fn repeated_admin_chunk_is_malformed() {
        let mut data = header();
        data.extend(chunk(b"FNTS", &[1, 2, 3]));
        data.extend(chunk(b"FNTS", &[]));
        assert!(matches!(decode(&data), Err(OveError::MalformedChunkSequence(_))));
    }

    #[test]
    fn nested_chunk_at_top_level_is_malformed() {
        let mut data = header();
        data.extend(chunk(b"BDAT", &[0, 0]));
        assert!(matches!(decode(&data), Err(OveError::MalformedChunkSequence(_))));
    }

    #[test]
    fn empty_bar_list_is_malformed() {
        let mut data = header();
        data.extend(b"BARL\0\0");
        assert!(matches!(decode(&data), Err(OveError::MalformedChunkSequence(_))));
    }
}
