//! Measure shells and the per-(track, measure) content cells.

use serde::{Deserialize, Serialize};

use super::{MidiData, MusicData, MusicKind, NoteContainer, Offset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarlineType {
    Default,
    Double,
    RepeatLeft,
    RepeatRight,
    Final,
    Dashed,
    Null,
}

impl BarlineType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => BarlineType::Default,
            1 => BarlineType::Double,
            2 => BarlineType::RepeatLeft,
            3 => BarlineType::RepeatRight,
            4 => BarlineType::Final,
            5 => BarlineType::Dashed,
            _ => BarlineType::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClefType {
    Treble,
    Bass,
    Alto,
    UpAlto,
    DownDownAlto,
    DownAlto,
    UpUpAlto,
    Treble8va,
    Bass8va,
    Treble8vb,
    Bass8vb,
    Percussion1,
    Percussion2,
    Tab,
}

impl ClefType {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => ClefType::Bass,
            2 => ClefType::Alto,
            3 => ClefType::UpAlto,
            4 => ClefType::DownDownAlto,
            5 => ClefType::DownAlto,
            6 => ClefType::UpUpAlto,
            7 => ClefType::Treble8va,
            8 => ClefType::Bass8va,
            9 => ClefType::Treble8vb,
            10 => ClefType::Bass8vb,
            11 => ClefType::Percussion1,
            12 => ClefType::Percussion2,
            13 => ClefType::Tab,
            _ => ClefType::Treble,
        }
    }
}

/// One beat of an irregular meter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatNode {
    pub start_unit: i32,
    pub length_unit: i32,
    pub start_tick: i32,
}

/// Time signature owned by a measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: i32,
    pub denominator: i32,
    pub is_symbol: bool,
    pub beat_length: i32,
    pub bar_length: i32,
    /// Measure length in placement units, the sum of the beat table
    pub units: i32,
    pub replace_font: bool,
    pub color: u8,
    pub show: bool,
    pub show_beat_group: bool,
    pub group_numerators: [u8; 3],
    pub group_denominators: [u8; 3],
    pub beam_groups: [u8; 4],
    pub beam_count_16th: u8,
    pub beam_count_32nd: u8,
    pub beats: Vec<BeatNode>,
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature {
            numerator: 4,
            denominator: 4,
            is_symbol: false,
            beat_length: 480,
            bar_length: 1920,
            units: 0x400,
            replace_font: false,
            color: 0,
            show: true,
            show_beat_group: false,
            group_numerators: [0; 3],
            group_denominators: [4; 3],
            beam_groups: [4, 0, 0, 0],
            beam_count_16th: 4,
            beam_count_32nd: 1,
            beats: Vec::new(),
        }
    }
}

impl TimeSignature {
    pub fn add_beat(&mut self, start_unit: i32, length_unit: i32, start_tick: i32) {
        self.beats.push(BeatNode { start_unit, length_unit, start_tick });
    }

    /// Recompute `units` from the beat table.
    pub fn end_add_beat(&mut self) {
        self.units = self.beats.iter().map(|b| b.length_unit).sum();
    }

    /// Common time is drawn as a symbol.
    pub fn shows_as_symbol(&self) -> bool {
        (self.numerator == 2 && self.denominator == 2) || self.is_symbol
    }
}

/// Bar-number display settings of a measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarNumber {
    pub index: usize,
    pub offset: Offset,
    pub show_on_paragraph_start: bool,
    pub align: u8,
    pub show_flag: u8,
    pub show_every_bar_count: u8,
    pub prefix: String,
}

impl BarNumber {
    pub fn new(index: usize) -> Self {
        BarNumber {
            index,
            offset: Offset::default(),
            show_on_paragraph_start: false,
            align: 0,
            show_flag: 1,
            show_every_bar_count: 1,
            prefix: String::new(),
        }
    }
}

/// Shell of one measure, shared by all tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub bar_number: BarNumber,
    pub is_multi_measure_rest: bool,
    pub is_pickup: bool,
    pub left_barline: BarlineType,
    pub right_barline: BarlineType,
    pub backward_repeat_count: u8,
    /// Nominal tempo in beats per minute
    pub type_tempo: f64,
    /// Length in ticks as stored in the file
    pub length: i32,
    pub multi_measure_rest_count: u16,
    pub time: TimeSignature,
}

impl Measure {
    pub fn new(index: usize) -> Self {
        Measure {
            bar_number: BarNumber::new(index),
            is_multi_measure_rest: false,
            is_pickup: false,
            left_barline: BarlineType::Default,
            right_barline: BarlineType::Default,
            backward_repeat_count: 1,
            type_tempo: 96.0,
            length: 0x780,
            multi_measure_rest_count: 0,
            time: TimeSignature::default(),
        }
    }

    pub fn index(&self) -> usize {
        self.bar_number.index
    }
}

/// Key signature in effect for a measure. Positive values count sharps,
/// negative values count flats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeySignature {
    pub key: i32,
    pub previous_key: i32,
    /// True when the measure contains an explicit key change
    pub set: bool,
    pub symbol_count: u8,
}

/// Index of a [`MusicData`] owned by another cell of the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MusicRef {
    pub track: usize,
    pub measure: usize,
    pub index: usize,
}

/// Musical content of one track in one measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureData {
    pub key: KeySignature,
    pub clef: ClefType,
    pub containers: Vec<NoteContainer>,
    /// Owned elements, including spanning elements that start here
    pub music: Vec<MusicData>,
    /// Spanning elements owned by an earlier measure that stop here
    pub stop_refs: Vec<MusicRef>,
    pub midi: Vec<MidiData>,
}

impl Default for MeasureData {
    fn default() -> Self {
        MeasureData {
            key: KeySignature::default(),
            clef: ClefType::Treble,
            containers: Vec::new(),
            music: Vec::new(),
            stop_refs: Vec::new(),
            midi: Vec::new(),
        }
    }
}

impl MeasureData {
    /// Elements of one kind, selected by a pattern.
    pub fn music_where<'a, F>(&'a self, pred: F) -> impl Iterator<Item = &'a MusicData> + 'a
    where
        F: Fn(&MusicKind) -> bool + 'a,
    {
        self.music.iter().filter(move |m| pred(&m.kind))
    }

    /// Spanning elements that start in this measure.
    pub fn cross_starts(&self) -> impl Iterator<Item = &MusicData> {
        self.music.iter().filter(|m| m.is_cross_measure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beat_table_defines_units() {
        let mut time = TimeSignature::default();
        assert_eq!(time.units, 0x400);
        time.add_beat(0, 256, 0);
        time.add_beat(256, 256, 480);
        time.add_beat(512, 256, 960);
        time.end_add_beat();
        assert_eq!(time.units, 768);
    }

    #[test]
    fn measure_defaults() {
        let m = Measure::new(3);
        assert_eq!(m.index(), 3);
        assert_eq!(m.backward_repeat_count, 1);
        assert_eq!(m.length, 0x780);
        assert_eq!(m.left_barline, BarlineType::Default);
    }

    #[test]
    fn barline_codes() {
        assert_eq!(BarlineType::from_code(3), BarlineType::RepeatRight);
        assert_eq!(BarlineType::from_code(200), BarlineType::Null);
    }
}
