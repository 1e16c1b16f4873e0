//! `TITL` chunks: title, annotation, writer, copyright, header and footer
//! text.

use log::warn;

use crate::chunk::{text_until_nul, ByteCursor, SizeChunk};
use crate::error::Result;
use crate::model::Score;

/// Which text list a `TITL` chunk fills, from its leading 4-byte code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleKind {
    Title,
    Annotate,
    Writer,
    Copyright,
    Header,
    Footer,
}

impl TitleKind {
    pub fn from_code(code: u32) -> Option<Self> {
        let kind = match code {
            0x0000_0001 => TitleKind::Title,
            0x0001_0000 => TitleKind::Annotate,
            0x0002_0002 => TitleKind::Writer,
            0x0003_0001 => TitleKind::Copyright,
            0x0004_0000 => TitleKind::Header,
            0x0005_0002 => TitleKind::Footer,
            _ => return None,
        };
        Some(kind)
    }

    fn list<'s>(self, score: &'s mut Score) -> &'s mut Vec<String> {
        match self {
            TitleKind::Title => &mut score.titles,
            TitleKind::Annotate => &mut score.annotates,
            TitleKind::Writer => &mut score.writers,
            TitleKind::Copyright => &mut score.copyrights,
            TitleKind::Header => &mut score.headers,
            TitleKind::Footer => &mut score.footers,
        }
    }
}

/// Decode a `TITL` chunk into the matching text list of `score`.
///
/// Title chunks never abort a decode: an unknown code or a short payload is
/// logged and whatever was read before it is kept.
pub fn parse_title(chunk: &SizeChunk<'_>, score: &mut Score) {
    let mut cur = ByteCursor::over(chunk);
    let code = match cur.u32() {
        Ok(code) => code,
        Err(e) => {
            warn!("TITL: {e}");
            return;
        }
    };
    let Some(kind) = TitleKind::from_code(code) else {
        warn!("TITL: unknown title code {code:#010x}");
        return;
    };

    let mut texts = Vec::new();
    if let Err(e) = read_texts(&mut cur, kind, &mut texts) {
        warn!("TITL: {e}");
    }
    kind.list(score)
        .extend(texts.into_iter().filter(|t| !t.is_empty()));
}

fn read_texts(cur: &mut ByteCursor<'_>, kind: TitleKind, out: &mut Vec<String>) -> Result<()> {
    match kind {
        TitleKind::Header | TitleKind::Footer => {
            cur.skip(10)?;
            out.push(sized_text(cur)?);
            cur.skip(6)?;
        }
        _ => {
            cur.skip(4)?;
            for i in 0..4 {
                if i > 0 {
                    cur.skip(6)?;
                }
                out.push(sized_text(cur)?);
            }
        }
    }
    Ok(())
}

fn sized_text(cur: &mut ByteCursor<'_>) -> Result<String> {
    let size = usize::from(cur.u16()?);
    cur.read(size).map(text_until_nul)
}
