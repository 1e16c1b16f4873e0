//! `OVSC` header: format generation and global display settings.

use log::info;

use crate::chunk::{ByteCursor, SizeChunk};
use crate::error::Result;
use crate::model::{FormatVersion, PlayStyle, Score};

/// Decode the header into a fresh score.
pub fn parse_header(chunk: &SizeChunk<'_>) -> Result<Score> {
    let mut cur = ByteCursor::over(chunk);

    let version = if cur.u8()? == 4 { FormatVersion::V4 } else { FormatVersion::V3 };
    info!(
        "This file is created by Overture {}",
        if version.is_v4() { "4" } else { "3" }
    );
    let mut score = Score::new(version);

    cur.skip(6)?;
    score.show_page_margin = cur.flag()?;
    cur.skip(1)?;
    score.show_transpose_track = cur.flag()?;
    score.play_repeat = cur.flag()?;
    score.play_style = match cur.u8()? {
        1 => PlayStyle::Swing,
        2 => PlayStyle::Notation,
        _ => PlayStyle::Record,
    };
    score.show_line_break = cur.flag()?;
    score.show_ruler = cur.flag()?;
    score.show_color = cur.flag()?;

    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Tag;

    fn header(bytes: &[u8]) -> Result<Score> {
        parse_header(&SizeChunk { tag: Tag::new(b"OVSC"), offset: 8, data: bytes })
    }

    #[test]
    fn reads_version_and_flags() {
        let bytes = [4, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 2, 1, 0, 1];
        let score = header(&bytes).unwrap();
        assert_eq!(score.version, FormatVersion::V4);
        assert!(score.show_page_margin);
        assert!(!score.show_transpose_track);
        assert!(score.play_repeat);
        assert_eq!(score.play_style, PlayStyle::Notation);
        assert!(score.show_line_break);
        assert!(!score.show_ruler);
        assert!(score.show_color);
    }

    #[test]
    fn any_other_version_byte_is_legacy() {
        let bytes = [3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(header(&bytes).unwrap().version, FormatVersion::V3);
    }

    #[test]
    fn short_header_is_truncated() {
        assert!(header(&[4, 0, 0]).is_err());
    }
}
