//! Page, line (system) and staff layout records.

use crate::chunk::{unsigned, ByteCursor, SizeChunk};
use crate::error::Result;
use crate::model::{ClefType, FormatVersion, GroupType, Line, Page, Staff};
use crate::tables::ove_key_to_key;

pub fn parse_page(chunk: &SizeChunk<'_>) -> Result<Page> {
    let mut cur = ByteCursor::over(chunk);
    let mut page = Page::default();

    page.begin_line = cur.u16()?;
    page.line_count = cur.u16()?;
    cur.skip(4)?;
    page.staff_interval = cur.u16()?;
    page.line_interval = cur.u16()?;
    page.staff_inline_interval = cur.u16()?;
    page.line_bar_count = cur.u16()?;
    page.page_line_count = cur.u16()?;
    page.left_margin = cur.u32()?;
    page.top_margin = cur.u32()?;
    page.right_margin = cur.u32()?;
    page.bottom_margin = cur.u32()?;
    page.page_width = cur.u32()?;
    page.page_height = cur.u32()?;

    Ok(page)
}

/// Number of `STAF` chunks that follow a `LINE` chunk, stored at payload
/// offset 6.
pub fn line_staff_count(chunk: &SizeChunk<'_>) -> Result<usize> {
    let mut cur = ByteCursor::over(chunk);
    cur.skip(6)?;
    Ok(unsigned(cur.read(2)?) as usize)
}

/// Decode a line; its staves are attached by the caller.
pub fn parse_line(chunk: &SizeChunk<'_>) -> Result<Line> {
    let mut cur = ByteCursor::over(chunk);
    let mut line = Line::default();

    cur.skip(2)?;
    line.begin_bar = cur.u16()?;
    line.bar_count = cur.u16()?;
    cur.skip(6)?;
    line.y_offset = cur.i16()?;
    line.left_x = cur.i16()?;
    line.right_x = cur.i16()?;
    cur.skip(4)?;

    Ok(line)
}

pub fn parse_staff(chunk: &SizeChunk<'_>, version: FormatVersion) -> Result<Staff> {
    let mut cur = ByteCursor::over(chunk);
    let mut staff = Staff::default();

    cur.skip(7)?;
    staff.clef = ClefType::from_code(cur.u8()?);
    staff.key = ove_key_to_key(cur.u8()?);
    cur.skip(2)?;
    staff.visible = cur.flag()?;
    cur.skip(12)?;
    staff.y_offset = cur.i16()?;
    cur.skip(version.pick(26, 18))?;
    staff.group_type = match cur.u8()? {
        1 => GroupType::Brace,
        2 => GroupType::Bracket,
        _ => GroupType::None,
    };
    staff.group_staff_count = cur.u8()?;

    Ok(staff)
}
