//! The score root, tracks and page layout.

use serde::{Deserialize, Serialize};

use super::{ClefType, FormatVersion, Measure, MeasureData, MusicData, MusicRef, QUARTER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayStyle {
    Record,
    Swing,
    Notation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupType {
    None,
    Brace,
    Bracket,
}

/// Playback settings of one of a track's eight voices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub channel: u8,
    /// -1 when the voice keeps the track volume
    pub volume: i32,
    pub pitch_shift: i32,
    pub pan: i32,
    /// -1 when the voice keeps the track patch
    pub patch: i32,
    pub stem_type: u8,
}

impl Default for Voice {
    fn default() -> Self {
        Voice { channel: 0, volume: -1, pitch_shift: 0, pan: 0, patch: -1, stem_type: 0 }
    }
}

/// Percussion map entry: staff line, head shape, pitch and voice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrumEntry {
    pub line: i32,
    pub head_type: u8,
    pub pitch: u8,
    pub voice: u8,
}

/// An instrument track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub brief_name: String,
    pub patch: i32,
    pub show_name: bool,
    pub show_brief_name: bool,
    pub show_transpose: bool,
    pub mute: bool,
    pub solo: bool,
    pub show_key_each_line: bool,
    pub voice_count: u8,
    /// Semitones between written and sounding pitch
    pub transpose: i32,
    pub start_clef: ClefType,
    pub transpose_clef: ClefType,
    pub start_key: i32,
    pub display_percent: u8,
    pub show_leger_line: bool,
    pub show_clef: bool,
    pub show_time_signature: bool,
    pub show_key_signature: bool,
    pub show_barline: bool,
    pub fill_with_rest: bool,
    pub flat_tail: bool,
    pub show_clef_each_line: bool,
    /// Always eight entries
    pub voices: Vec<Voice>,
    /// Always sixteen entries
    pub drums: Vec<DrumEntry>,
    /// Set by the organizer
    pub part: usize,
    pub staff: usize,
}

impl Default for Track {
    fn default() -> Self {
        Track {
            name: String::new(),
            brief_name: String::new(),
            patch: 0,
            show_name: true,
            show_brief_name: false,
            show_transpose: false,
            mute: false,
            solo: false,
            show_key_each_line: false,
            voice_count: 8,
            transpose: 0,
            start_clef: ClefType::Treble,
            transpose_clef: ClefType::Treble,
            start_key: 0,
            display_percent: 100,
            show_leger_line: true,
            show_clef: true,
            show_time_signature: true,
            show_key_signature: true,
            show_barline: true,
            fill_with_rest: true,
            flat_tail: false,
            show_clef_each_line: false,
            voices: vec![Voice::default(); 8],
            drums: vec![DrumEntry::default(); 16],
            part: 0,
            staff: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub begin_line: u16,
    pub line_count: u16,
    pub staff_interval: u16,
    pub line_interval: u16,
    pub staff_inline_interval: u16,
    pub line_bar_count: u16,
    pub page_line_count: u16,
    pub left_margin: u32,
    pub top_margin: u32,
    pub right_margin: u32,
    pub bottom_margin: u32,
    pub page_width: u32,
    pub page_height: u32,
}

/// Per-line settings of one track's staff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    pub clef: ClefType,
    pub key: i32,
    pub visible: bool,
    pub y_offset: i32,
    pub group_type: GroupType,
    pub group_staff_count: u8,
}

impl Default for Staff {
    fn default() -> Self {
        Staff {
            clef: ClefType::Treble,
            key: 0,
            visible: true,
            y_offset: 0,
            group_type: GroupType::None,
            group_staff_count: 0,
        }
    }
}

/// A system: a run of measures laid out on one line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub begin_bar: u16,
    pub bar_count: u16,
    pub y_offset: i32,
    pub left_x: i32,
    pub right_x: i32,
    pub staves: Vec<Staff>,
}

/// Lyric text stored outside the measures by Overture 3.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LyricInfo {
    pub name: String,
    pub lyric: String,
    pub voice: u8,
    pub verse: u8,
    pub track: usize,
    pub measure: usize,
    pub word_count: u16,
    pub font: u16,
    pub font_size: u8,
    pub font_style: u8,
}

/// A complete decoded OVE score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub version: FormatVersion,
    /// Ticks per quarter note
    pub quarter: i32,
    pub show_page_margin: bool,
    pub show_transpose_track: bool,
    pub play_repeat: bool,
    pub play_style: PlayStyle,
    pub show_line_break: bool,
    pub show_ruler: bool,
    pub show_color: bool,

    pub titles: Vec<String>,
    pub annotates: Vec<String>,
    pub writers: Vec<String>,
    pub copyrights: Vec<String>,
    pub headers: Vec<String>,
    pub footers: Vec<String>,

    pub tracks: Vec<Track>,
    pub pages: Vec<Page>,
    pub lines: Vec<Line>,
    pub measures: Vec<Measure>,
    /// `tracks.len() * measures.len()` cells, track-major
    pub measure_data: Vec<MeasureData>,
    pub lyric_infos: Vec<LyricInfo>,
    /// Staves per part, filled by the organizer
    pub part_staff_counts: Vec<usize>,
}

impl Score {
    pub fn new(version: FormatVersion) -> Self {
        Score {
            version,
            quarter: QUARTER,
            show_page_margin: false,
            show_transpose_track: false,
            play_repeat: true,
            play_style: PlayStyle::Record,
            show_line_break: false,
            show_ruler: false,
            show_color: true,
            titles: Vec::new(),
            annotates: Vec::new(),
            writers: Vec::new(),
            copyrights: Vec::new(),
            headers: Vec::new(),
            footers: Vec::new(),
            tracks: Vec::new(),
            pages: Vec::new(),
            lines: Vec::new(),
            measures: Vec::new(),
            measure_data: Vec::new(),
            lyric_infos: Vec::new(),
            part_staff_counts: Vec::new(),
        }
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn measure_count(&self) -> usize {
        self.measures.len()
    }

    fn cell(&self, track: usize, measure: usize) -> Option<usize> {
        if track < self.track_count() && measure < self.measure_count() {
            Some(track * self.measure_count() + measure)
        } else {
            None
        }
    }

    pub fn measure_data(&self, track: usize, measure: usize) -> Option<&MeasureData> {
        self.cell(track, measure).and_then(|i| self.measure_data.get(i))
    }

    pub fn measure_data_mut(&mut self, track: usize, measure: usize) -> Option<&mut MeasureData> {
        self.cell(track, measure).and_then(move |i| self.measure_data.get_mut(i))
    }

    pub fn part_count(&self) -> usize {
        self.part_staff_counts.len()
    }

    pub fn staff_count(&self, part: usize) -> usize {
        self.part_staff_counts.get(part).copied().unwrap_or(0)
    }

    /// Track index of a (part, staff) pair.
    pub fn part_staff_to_track(&self, part: usize, staff: usize) -> Option<usize> {
        if staff >= self.staff_count(part) {
            return None;
        }
        let before: usize = self.part_staff_counts.iter().take(part).sum();
        let track = before + staff;
        (track < self.track_count()).then_some(track)
    }

    /// (part, staff) pair of a track. Before grouping every track is its
    /// own part.
    pub fn track_to_part_staff(&self, track: usize) -> (usize, usize) {
        let mut first = 0;
        for (part, &count) in self.part_staff_counts.iter().enumerate() {
            if track < first + count {
                return (part, track - first);
            }
            first += count;
        }
        (track, 0)
    }

    pub fn measure_data_at(&self, part: usize, staff: usize, measure: usize) -> Option<&MeasureData> {
        self.part_staff_to_track(part, staff)
            .and_then(|t| self.measure_data(t, measure))
    }

    /// Follow a stop-measure back-reference to the element it names.
    pub fn resolve(&self, r: &MusicRef) -> Option<&MusicData> {
        self.measure_data(r.track, r.measure)
            .and_then(|md| md.music.get(r.index))
    }
}
