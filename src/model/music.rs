//! Note containers and the music data that decorates a measure.

use serde::{Deserialize, Serialize};

use super::{ClefType, MeasurePos, Offset};

// ═══════════════════════════════════════════════════════════════════════
// Notes
// ═══════════════════════════════════════════════════════════════════════

/// Duration class of a container, `DoubleWhole` = 0 … `N256` = 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NoteType {
    DoubleWhole,
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    N32,
    N64,
    N128,
    N256,
}

impl NoteType {
    pub fn from_code(code: u8) -> Option<Self> {
        let t = match code {
            0 => NoteType::DoubleWhole,
            1 => NoteType::Whole,
            2 => NoteType::Half,
            3 => NoteType::Quarter,
            4 => NoteType::Eighth,
            5 => NoteType::Sixteenth,
            6 => NoteType::N32,
            7 => NoteType::N64,
            8 => NoteType::N128,
            9 => NoteType::N256,
            _ => return None,
        };
        Some(t)
    }

    /// Length of one undotted note of this class in ticks.
    pub fn ticks(self, quarter: i32) -> i32 {
        quarter * 8 / (1 << self as i32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccidentalType {
    Normal,
    Sharp,
    Flat,
    Natural,
    DoubleSharp,
    DoubleFlat,
    SharpCaution,
    FlatCaution,
    NaturalCaution,
    DoubleSharpCaution,
    DoubleFlatCaution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteHeadType {
    Standard,
    Invisible,
    RhythmicSlash,
    Percussion,
    ClosedRhythm,
    OpenRhythm,
    ClosedSlash,
    OpenSlash,
    ClosedDo,
    OpenDo,
    ClosedRe,
    OpenRe,
    ClosedMi,
    OpenMi,
    ClosedFa,
    OpenFa,
    ClosedSol,
    OpenSol,
    ClosedLa,
    OpenLa,
    ClosedTi,
    OpenTi,
}

/// Tie-position bit: the note starts a tie.
pub const TIE_LEFT_END: u8 = 0x01;
/// Tie-position bit: the note ends a tie.
pub const TIE_RIGHT_END: u8 = 0x02;

/// One notehead of a chord.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub show: bool,
    pub head_type: NoteHeadType,
    /// Combination of [`TIE_LEFT_END`] and [`TIE_RIGHT_END`]
    pub tie_pos: u8,
    /// Cross-staff displacement: -1, 0 or +1
    pub offset_staff: i32,
    pub accidental: AccidentalType,
    /// False when the accidental is implied by the key or an earlier note
    pub show_accidental: bool,
    pub line: i32,
    /// MIDI note number
    pub note: u8,
    pub on_velocity: u8,
    pub off_velocity: u8,
    pub offset_tick: i32,
}

impl Default for Note {
    fn default() -> Self {
        Note {
            show: true,
            head_type: NoteHeadType::Standard,
            tie_pos: 0,
            offset_staff: 0,
            accidental: AccidentalType::Normal,
            show_accidental: false,
            line: 0,
            note: 60,
            on_velocity: 0x50,
            off_velocity: 0x40,
            offset_tick: 0,
        }
    }
}

impl Note {
    /// Right ends of ties continue a sounding note.
    pub fn has_note_on(&self) -> bool {
        self.tie_pos & TIE_RIGHT_END == 0
    }

    /// Left ends of ties are released by the note they tie into.
    pub fn has_note_off(&self) -> bool {
        self.tie_pos & TIE_LEFT_END == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArticulationType {
    MajorTrill,
    MinorTrill,
    TrillSection,
    InvertedShortMordent,
    InvertedLongMordent,
    ShortMordent,
    Turn,
    Finger1,
    Finger2,
    Finger3,
    Finger4,
    Finger5,
    FlatAccidentalForTrill,
    SharpAccidentalForTrill,
    NaturalAccidentalForTrill,
    Marcato,
    MarcatoDot,
    HeavyAttack,
    SForzando,
    SForzandoDot,
    HeavierAttack,
    SForzandoInverted,
    SForzandoDotInverted,
    Staccatissimo,
    Staccato,
    Tenuto,
    UpBow,
    DownBow,
    UpBowInverted,
    DownBowInverted,
    Arpeggio,
    TremoloEighth,
    TremoloSixteenth,
    TremoloThirtySecond,
    TremoloSixtyFourth,
    NaturalHarmonic,
    ArtificialHarmonic,
    PlusSign,
    Fermata,
    FermataInverted,
    PedalDown,
    PedalUp,
    Pause,
    GrandPause,
    ToePedal,
    HeelPedal,
    ToeToHeelPedal,
    HeelToToePedal,
    OpenString,
    GuitarLift,
    GuitarSlideUp,
    GuitarRip,
    GuitarFallOff,
    GuitarSlideDown,
    GuitarSpill,
    GuitarFlip,
    GuitarSmear,
    GuitarBend,
    GuitarDoit,
    GuitarPlop,
    GuitarWowWow,
    GuitarThumb,
    GuitarIndexFinger,
    GuitarMiddleFinger,
    GuitarRingFinger,
    GuitarPinkyFinger,
    GuitarTap,
    GuitarHammer,
    GuitarPluck,
    None,
}

impl ArticulationType {
    pub fn is_trill(self) -> bool {
        matches!(
            self,
            ArticulationType::MajorTrill | ArticulationType::MinorTrill | ArticulationType::TrillSection
        )
    }

    /// Number of repeated notes a tremolo splits its note into.
    pub fn tremolo_count(self) -> Option<i32> {
        match self {
            ArticulationType::TremoloEighth => Some(2),
            ArticulationType::TremoloSixteenth => Some(4),
            ArticulationType::TremoloThirtySecond => Some(8),
            ArticulationType::TremoloSixtyFourth => Some(16),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VelocityType {
    Offset,
    SetValue,
    Percentage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrillInterval {
    Diatonic,
    Chromatic,
    Whole,
}

/// Articulation attached to a note container, with optional playback
/// overrides (Overture 4 only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Articulation {
    pub art_type: ArticulationType,
    pub placement_above: bool,
    pub offset: Offset,
    pub change_sound_effect: bool,
    /// Arpeggio spread range (from, to)
    pub sound_effect: (i32, i32),
    pub change_length: bool,
    pub length_percentage: i32,
    pub change_velocity: bool,
    pub velocity_type: VelocityType,
    pub velocity_value: i32,
    pub trill_note_length: i32,
    /// `None` when the trill has no written rate
    pub trill_rate: Option<NoteType>,
    pub accelerate_type: u8,
    pub auxiliary_first: bool,
    pub trill_interval: TrillInterval,
}

impl Default for Articulation {
    fn default() -> Self {
        Articulation {
            art_type: ArticulationType::None,
            placement_above: true,
            offset: Offset::default(),
            change_sound_effect: false,
            sound_effect: (0, 0),
            change_length: false,
            length_percentage: 100,
            change_velocity: false,
            velocity_type: VelocityType::Offset,
            velocity_value: 0,
            trill_note_length: 60,
            trill_rate: Some(NoteType::Sixteenth),
            accelerate_type: 0,
            auxiliary_first: false,
            trill_interval: TrillInterval::Chromatic,
        }
    }
}

/// A rest, or a chord of one or more notes sharing a stem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteContainer {
    pub tick: i32,
    pub start: MeasurePos,
    /// `stop.offset` is the start offset of the next container in the
    /// measure, or the measure's unit length for the last one.
    pub stop: MeasurePos,
    pub color: u8,
    pub show: bool,
    pub voice: u8,
    pub is_grace: bool,
    pub is_cue: bool,
    pub is_rest: bool,
    /// Decoded from a raw note record
    pub is_raw: bool,
    pub tuplet: u8,
    pub space: u8,
    pub in_beam: bool,
    pub grace_note_type: u8,
    pub dot: u8,
    pub note_type: NoteType,
    pub stem_up: bool,
    pub stem_length: i32,
    pub show_stem: bool,
    /// Semitones applied by an enclosing octave shift
    pub note_shift: i32,
    /// Sounding length in ticks
    pub length: i32,
    pub notes: Vec<Note>,
    pub articulations: Vec<Articulation>,
}

impl Default for NoteContainer {
    fn default() -> Self {
        NoteContainer {
            tick: 0,
            start: MeasurePos::default(),
            stop: MeasurePos::default(),
            color: 0,
            show: true,
            voice: 0,
            is_grace: false,
            is_cue: false,
            is_rest: false,
            is_raw: false,
            tuplet: 0,
            space: 0,
            in_beam: false,
            grace_note_type: 0,
            dot: 0,
            note_type: NoteType::Quarter,
            stem_up: true,
            stem_length: 7,
            show_stem: true,
            note_shift: 0,
            length: 0,
            notes: Vec::new(),
            articulations: Vec::new(),
        }
    }
}

impl NoteContainer {
    /// Written duration in ticks, counting dots and tuplet ratio.
    pub fn duration(&self, quarter: i32) -> i32 {
        let base = self.note_type.ticks(quarter);
        let mut length = base;
        for i in 1..=i32::from(self.dot) {
            length += base >> i;
        }
        if self.tuplet > 0 && self.space > 0 {
            length = length * i32::from(self.space) / i32::from(self.tuplet);
        }
        length
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Music data
// ═══════════════════════════════════════════════════════════════════════

/// Staff lines and shoulder points shared by spanning elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossShape {
    pub left_line: i32,
    pub right_line: i32,
    pub left_shoulder: Offset,
    pub right_shoulder: Offset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tie {
    pub note: u8,
    pub height: i32,
    pub shape: CrossShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slur {
    pub show_on_top: bool,
    pub note_time_percent: i32,
    pub shape: CrossShape,
    pub handle2: Offset,
    pub handle3: Offset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuplet {
    pub tuplet: i32,
    pub space: i32,
    pub height: i32,
    /// Duration class of the notes under the bracket, taken from the
    /// container at the tuplet's tick
    pub note_type: NoteType,
    pub mark_handle: Offset,
    pub shape: CrossShape,
    /// Created from a beam's tuplet hint rather than read from the file
    pub synthesized: bool,
}

impl Default for Tuplet {
    fn default() -> Self {
        Tuplet {
            tuplet: 3,
            space: 2,
            height: 0,
            note_type: NoteType::Quarter,
            mark_handle: Offset::default(),
            shape: CrossShape::default(),
            synthesized: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Glissando {
    pub straight_wavy: bool,
    pub line_thick: i32,
    pub text: String,
    pub shape: CrossShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pedal {
    pub half: bool,
    pub playback: bool,
    /// Half-pedal handle, present only for half pedals
    pub handle: Option<Offset>,
    pub shape: CrossShape,
}

/// One stem group inside a beam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamLine {
    /// Tuplet ratio hint, 0 when the group is not a tuplet
    pub tuplet: u8,
    pub start: MeasurePos,
    pub stop: MeasurePos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beam {
    pub grace: bool,
    pub lines: Vec<BeamLine>,
    pub shape: CrossShape,
}

/// A 1st/2nd ending bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericEnding {
    pub text: String,
    pub height: i32,
    pub numeric_handle: Offset,
    pub shape: CrossShape,
}

impl NumericEnding {
    /// Ending numbers written in the text, e.g. `"1, 2."` gives `[1, 2]`.
    pub fn numbers(&self) -> Vec<i32> {
        self.text
            .split(',')
            .filter_map(|s| {
                let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
                digits.parse().ok()
            })
            .collect()
    }

    /// Count of leading numbers that run 1, 2, 3 … in order.
    pub fn jump_count(&self) -> usize {
        self.numbers()
            .iter()
            .enumerate()
            .take_while(|(i, n)| **n == *i as i32 + 1)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureRepeat {
    pub single: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OctaveShiftType {
    /// 8va, sounds an octave higher
    Up8,
    /// 8vb
    Down8,
    /// 15ma
    Up15,
    /// 15mb
    Down15,
}

impl OctaveShiftType {
    pub fn note_shift(self) -> i32 {
        match self {
            OctaveShiftType::Up8 => 12,
            OctaveShiftType::Down8 => -12,
            OctaveShiftType::Up15 => 24,
            OctaveShiftType::Down15 => -24,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OctaveShiftPosition {
    Start,
    Continue,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OctaveShift {
    pub shift_type: OctaveShiftType,
    /// Endpoints encoded in the record, one or two
    pub positions: Vec<OctaveShiftPosition>,
    pub length: i32,
    pub end_tick: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OctaveShiftEndPoint {
    pub shift_type: OctaveShiftType,
    pub position: OctaveShiftPosition,
    pub end_tick: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WedgeType {
    /// `<`
    CresLine,
    /// `<>`
    DoubleLine,
    /// `>`
    DecrescLine,
    /// "cresc." text
    Cres,
    /// "decresc." text
    Decresc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wedge {
    pub wedge_type: WedgeType,
    pub height: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WedgeEndPoint {
    pub wedge_type: WedgeType,
    pub wedge_start: bool,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DynamicsType {
    Pppp,
    Ppp,
    Pp,
    P,
    Mp,
    Mf,
    F,
    Ff,
    Fff,
    Ffff,
    Sf,
    Fz,
    Sfz,
    Sffz,
    Fp,
    Sfp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dynamics {
    pub dynamics_type: DynamicsType,
    pub velocity: u8,
    pub playback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expressions {
    pub text: String,
    pub bar_offset: i32,
    pub tempo1: i32,
    pub tempo2: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextType {
    Rehearsal,
    SystemText,
    MeasureText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub text_type: TextType,
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub horizontal_margin: u8,
    pub vertical_margin: u8,
    pub line_thick: u8,
    pub include_line_break: bool,
}

/// A metronome mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    pub show_mark: bool,
    pub show_before_text: bool,
    pub show_parenthesis: bool,
    pub left_note_type: u8,
    pub right_note_type: u8,
    pub swing_eighth: bool,
    /// Beats per minute of `left_note_type` notes
    pub type_tempo: i32,
    pub left_text: String,
    pub right_text: String,
    pub offset: Offset,
}

impl Default for Tempo {
    fn default() -> Self {
        Tempo {
            show_mark: false,
            show_before_text: false,
            show_parenthesis: false,
            left_note_type: 3,
            right_note_type: 3,
            swing_eighth: false,
            type_tempo: 96,
            left_text: String::new(),
            right_text: String::new(),
            offset: Offset::default(),
        }
    }
}

impl Tempo {
    /// Tempo converted to quarter notes per minute.
    pub fn quarter_tempo(&self) -> i32 {
        let exp = 3 - i32::from(self.left_note_type);
        (f64::from(self.type_tempo) * 2f64.powi(exp)) as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepeatType {
    Segno,
    Coda,
    ToCoda,
    DSAlCoda,
    DSAlFine,
    DCAlCoda,
    DCAlFine,
    Fine,
    Null,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatSymbol {
    pub repeat_type: RepeatType,
    pub text: String,
    pub offset: Offset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecoratorType {
    DottedBarline,
    Articulation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decorator {
    pub decorator_type: DecoratorType,
    pub articulation: ArticulationType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HarmonyType {
    Maj,
    Min,
    Aug,
    Dim,
    Dim7,
    Sus2,
    Sus4,
    Sus24,
    Add2,
    Add9,
    Omit3,
    Omit5,
    H2,
    H5,
    H6,
    H69,
    H7,
    H7b5,
    H7b9,
    H7s9,
    H7s11,
    H7b5s9,
    H7b5b9,
    H7b9s9,
    H7b9s11,
    H7sus4,
    H9,
    H9b5,
    H9s11,
    H9sus4,
    H11,
    H13,
    H13b5,
    H13b9,
    H13s9,
    H13s11,
    H13sus4,
    MinAdd2,
    MinAdd9,
    MinMaj7,
    Min6,
    Min6Add9,
    Min7,
    Min7b5,
    Min7Add4,
    Min7Add11,
    Min9,
    Min9b5,
    Min9Maj7,
    Min11,
    Min13,
    Maj7,
    Maj7b5,
    Maj7s5,
    Maj7_69,
    Maj7Add9,
    Maj7s11,
    Maj9,
    Maj9Sus4,
    Maj9b5,
    Maj9s5,
    Maj9s11,
    Maj13,
    Maj13b5,
    Maj13b9,
    Maj13b9b5,
    Maj13s11,
    Aug7,
    Aug7b9,
    Aug7s9,
}

/// A chord symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Harmony {
    pub harmony_type: HarmonyType,
    pub root: i32,
    pub bass: i32,
    pub bass_on_bottom: bool,
    pub angle: i32,
    /// Sounding length in ticks (Overture 4 only)
    pub length: i32,
    /// Decoded from a guitar-frame record
    pub guitar_frame: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClefChange {
    pub clef: ClefType,
    pub line: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lyric {
    pub verse: u8,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarpPedal {
    pub show_type: u8,
    pub show_char_flag: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KuoHaoType {
    Parentheses,
    Brace,
    Bracket,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KuoHao {
    pub kuohao_type: KuoHaoType,
    pub height: i32,
    pub shape: CrossShape,
}

/// Everything that can decorate a measure besides note containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MusicKind {
    // cross-measure elements
    Tie(Tie),
    Slur(Slur),
    Tuplet(Tuplet),
    Glissando(Glissando),
    Pedal(Pedal),
    Beam(Beam),
    NumericEnding(NumericEnding),
    MeasureRepeat(MeasureRepeat),
    OctaveShift(OctaveShift),
    Wedge(Wedge),
    // endpoints produced by the organizer
    OctaveShiftEndPoint(OctaveShiftEndPoint),
    WedgeEndPoint(WedgeEndPoint),
    // single-measure data
    Dynamics(Dynamics),
    Expressions(Expressions),
    Text(Text),
    Tempo(Tempo),
    RepeatSymbol(RepeatSymbol),
    Decorator(Decorator),
    Harmony(Harmony),
    Clef(ClefChange),
    Lyric(Lyric),
    HarpPedal(HarpPedal),
    KuoHao(KuoHao),
    MultiMeasureRest,
}

/// A positioned element of a measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicData {
    pub tick: i32,
    pub start: MeasurePos,
    /// Equal to `start` for single-measure data
    pub stop: MeasurePos,
    pub color: u8,
    pub voice: u8,
    pub show: bool,
    pub offset: Offset,
    pub kind: MusicKind,
}

impl MusicData {
    pub fn new(kind: MusicKind) -> Self {
        MusicData {
            tick: 0,
            start: MeasurePos::default(),
            stop: MeasurePos::default(),
            color: 0,
            voice: 0,
            show: true,
            offset: Offset::default(),
            kind,
        }
    }

    /// Copy tick, position, colour and voice from another element.
    pub fn with_common(mut self, other: &MusicData) -> Self {
        self.tick = other.tick;
        self.start = other.start;
        self.stop = other.start;
        self.color = other.color;
        self.voice = other.voice;
        self.offset = other.offset;
        self
    }

    /// Whether this element spans from its start measure to a stop measure.
    pub fn is_cross_measure(&self) -> bool {
        matches!(
            self.kind,
            MusicKind::Tie(_)
                | MusicKind::Slur(_)
                | MusicKind::Tuplet(_)
                | MusicKind::Glissando(_)
                | MusicKind::Pedal(_)
                | MusicKind::Beam(_)
                | MusicKind::NumericEnding(_)
                | MusicKind::MeasureRepeat(_)
                | MusicKind::OctaveShift(_)
                | MusicKind::Wedge(_)
        )
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            MusicKind::Tie(_) => "Tie",
            MusicKind::Slur(_) => "Slur",
            MusicKind::Tuplet(_) => "Tuplet",
            MusicKind::Glissando(_) => "Glissando",
            MusicKind::Pedal(_) => "Pedal",
            MusicKind::Beam(_) => "Beam",
            MusicKind::NumericEnding(_) => "NumericEnding",
            MusicKind::MeasureRepeat(_) => "MeasureRepeat",
            MusicKind::OctaveShift(_) => "OctaveShift",
            MusicKind::Wedge(_) => "Wedge",
            MusicKind::OctaveShiftEndPoint(_) => "OctaveShiftEndPoint",
            MusicKind::WedgeEndPoint(_) => "WedgeEndPoint",
            MusicKind::Dynamics(_) => "Dynamics",
            MusicKind::Expressions(_) => "Expressions",
            MusicKind::Text(_) => "Text",
            MusicKind::Tempo(_) => "Tempo",
            MusicKind::RepeatSymbol(_) => "RepeatSymbol",
            MusicKind::Decorator(_) => "Decorator",
            MusicKind::Harmony(_) => "Harmony",
            MusicKind::Clef(_) => "Clef",
            MusicKind::Lyric(_) => "Lyric",
            MusicKind::HarpPedal(_) => "HarpPedal",
            MusicKind::KuoHao(_) => "KuoHao",
            MusicKind::MultiMeasureRest => "MultiMeasureRest",
        }
    }
}

/// Raw MIDI events stored in a measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MidiKind {
    Controller { controller: u8, value: u8 },
    ProgramChange { patch: u8 },
    ChannelPressure { pressure: u8 },
    PitchWheel { value: u16 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiData {
    /// Tick inside the measure
    pub tick: i32,
    pub kind: MidiKind,
}
