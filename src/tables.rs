//! Fixed code tables of the OVE format.
//!
//! The numeric values here are bit-exact with files written by Overture;
//! entries that look redundant are aliases that occur in real files.

use crate::model::{
    AccidentalType, ArticulationType, DecoratorType, DynamicsType, HarmonyType, KuoHaoType,
    NoteHeadType, OctaveShiftPosition, OctaveShiftType, RepeatType,
};

// ═══════════════════════════════════════════════════════════════════════
// Record tags
// ═══════════════════════════════════════════════════════════════════════

/// Sub-record kinds of a COND (conductor) chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondTag {
    TimeParameters,
    BarNumber,
    Decorator,
    Tempo,
    Text,
    Expression,
    BarlineParameters,
    Repeat,
    NumericEnding,
}

impl CondTag {
    pub fn from_byte(b: u8) -> Option<Self> {
        let tag = match b {
            0x09 => CondTag::TimeParameters,
            0x0A => CondTag::BarNumber,
            0x16 => CondTag::Decorator,
            0x1C => CondTag::Tempo,
            0x1D => CondTag::Text,
            0x25 => CondTag::Expression,
            0x30 => CondTag::BarlineParameters,
            0x31 => CondTag::Repeat,
            0x32 => CondTag::NumericEnding,
            _ => return None,
        };
        Some(tag)
    }
}

/// Sub-record kinds of a BDAT (per-track measure) chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BdatTag {
    RawNote,
    Rest,
    Note,
    Beam,
    Harmony,
    Clef,
    Wedge,
    Dynamics,
    Glissando,
    Decorator,
    Key,
    Lyric,
    OctaveShift,
    Slur,
    Text,
    Tie,
    Tuplet,
    GuitarBend,
    GuitarBarre,
    Pedal,
    KuoHao,
    Expressions,
    HarpPedal,
    MultiMeasureRest,
    HarmonyGuitarFrame,
    Graphics,
    MidiController,
    MidiProgramChange,
    MidiChannelPressure,
    MidiPitchWheel,
    BarEnd,
}

impl BdatTag {
    pub fn from_byte(b: u8) -> Option<Self> {
        let tag = match b {
            0x70 => BdatTag::RawNote,
            0x80 => BdatTag::Rest,
            0x90 => BdatTag::Note,
            0x10 => BdatTag::Beam,
            0x11 => BdatTag::Harmony,
            0x12 => BdatTag::Clef,
            0x13 => BdatTag::Wedge,
            0x14 => BdatTag::Dynamics,
            0x15 => BdatTag::Glissando,
            0x16 => BdatTag::Decorator,
            0x17 => BdatTag::Key,
            0x18 => BdatTag::Lyric,
            0x19 => BdatTag::OctaveShift,
            0x1B => BdatTag::Slur,
            0x1D => BdatTag::Text,
            0x1E => BdatTag::Tie,
            0x1F => BdatTag::Tuplet,
            0x21 => BdatTag::GuitarBend,
            0x22 => BdatTag::GuitarBarre,
            0x23 => BdatTag::Pedal,
            0x24 => BdatTag::KuoHao,
            0x25 => BdatTag::Expressions,
            0x26 => BdatTag::HarpPedal,
            0x27 => BdatTag::MultiMeasureRest,
            0x28 => BdatTag::HarmonyGuitarFrame,
            0x40..=0x46 => BdatTag::Graphics,
            0xAB => BdatTag::MidiController,
            0xAC => BdatTag::MidiProgramChange,
            0xAD => BdatTag::MidiChannelPressure,
            0xAE => BdatTag::MidiPitchWheel,
            0xFF => BdatTag::BarEnd,
            _ => return None,
        };
        Some(tag)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Harmony
// ═══════════════════════════════════════════════════════════════════════

/// Chord-quality bit patterns, searched in order; the first match wins.
pub const HARMONY_PATTERNS: &[(u16, HarmonyType)] = &[
    (0x0091, HarmonyType::Maj),
    (0x0089, HarmonyType::Min),
    (0x0489, HarmonyType::Min7),
    (0x0491, HarmonyType::H7),
    (0x0495, HarmonyType::H9),
    (0x0449, HarmonyType::Min7b5),
    (0x04A1, HarmonyType::H7sus4),
    (0x00A1, HarmonyType::Sus4),
    (0x0049, HarmonyType::Dim),
    (0x0249, HarmonyType::Dim7),
    (0x0111, HarmonyType::Aug),
    (0x0511, HarmonyType::Aug7),
    (0x044D, HarmonyType::Min9b5),
    (0x0499, HarmonyType::H7s9),
    (0x0615, HarmonyType::H13),
    (0x0289, HarmonyType::Min6),
    (0x0291, HarmonyType::H6),
    (0x0295, HarmonyType::H6),
    (0x0095, HarmonyType::Min),
    (0x008D, HarmonyType::Maj7),
    (0x0891, HarmonyType::Maj7),
    (0x0881, HarmonyType::Maj7s5),
    (0x0911, HarmonyType::Maj7s5),
    (0x0991, HarmonyType::Maj7s11),
    (0x0851, HarmonyType::Maj7s11),
    (0x08D1, HarmonyType::Maj9),
    (0x0895, HarmonyType::Maj9s5),
    (0x0995, HarmonyType::Maj13s11),
    (0x0855, HarmonyType::Maj9s11),
    (0x08D5, HarmonyType::Maj13),
    (0x0A95, HarmonyType::Maj13s11),
    (0x0A55, HarmonyType::Maj13),
    (0x0A85, HarmonyType::Maj9s5),
    (0x0B45, HarmonyType::H7b9),
    (0x0493, HarmonyType::H7b5),
    (0x0451, HarmonyType::H9b5),
    (0x0455, HarmonyType::H7s9),
    (0x0519, HarmonyType::H7b9),
    (0x0513, HarmonyType::Aug7),
    (0x0515, HarmonyType::Sus4),
    (0x04A5, HarmonyType::H13b9),
    (0x0613, HarmonyType::H13b9),
    (0x0611, HarmonyType::H13),
    (0x0653, HarmonyType::Min),
    (0x0889, HarmonyType::Min9),
    (0x088D, HarmonyType::Min11),
    (0x04AD, HarmonyType::H9s11),
    (0x04D5, HarmonyType::H7sus4),
    (0x0421, HarmonyType::Min11),
    (0x04A9, HarmonyType::Min9),
    (0x048D, HarmonyType::H7b5b9),
    (0x0453, HarmonyType::Maj),
    (0x0011, HarmonyType::Maj7),
    (0x0081, HarmonyType::H7),
    (0x0481, HarmonyType::H7),
    (0x0411, HarmonyType::H6),
    // shadowed by the 0x0291 entry above
    (0x0291, HarmonyType::Sus4),
    (0x00A5, HarmonyType::H13s9),
    (0x0659, HarmonyType::Sus4),
    (0x0021, HarmonyType::H7b5b9),
    (0x045B, HarmonyType::H13b5),
    (0x065B, HarmonyType::H13b9),
    (0x061B, HarmonyType::H7b9s9),
    (0x04B5, HarmonyType::H7),
];

/// Chord quality of an encoded bit pattern, major when unknown.
pub fn harmony_type(bits: u16) -> HarmonyType {
    HARMONY_PATTERNS
        .iter()
        .find(|(pattern, _)| *pattern == bits)
        .map(|(_, t)| *t)
        .unwrap_or(HarmonyType::Maj)
}

/// Chord quality by its position in the quality list (guitar frames store
/// the index directly).
pub fn harmony_type_by_index(index: u8) -> HarmonyType {
    use HarmonyType::*;
    const ALL: [HarmonyType; 70] = [
        Maj, Min, Aug, Dim, Dim7, Sus2, Sus4, Sus24, Add2, Add9, Omit3, Omit5, H2, H5, H6, H69, H7,
        H7b5, H7b9, H7s9, H7s11, H7b5s9, H7b5b9, H7b9s9, H7b9s11, H7sus4, H9, H9b5, H9s11, H9sus4,
        H11, H13, H13b5, H13b9, H13s9, H13s11, H13sus4, MinAdd2, MinAdd9, MinMaj7, Min6, Min6Add9,
        Min7, Min7b5, Min7Add4, Min7Add11, Min9, Min9b5, Min9Maj7, Min11, Min13, Maj7, Maj7b5,
        Maj7s5, Maj7_69, Maj7Add9, Maj7s11, Maj9, Maj9Sus4, Maj9b5, Maj9s5, Maj9s11, Maj13,
        Maj13b5, Maj13b9, Maj13b9b5, Maj13s11, Aug7, Aug7b9, Aug7s9,
    ];
    ALL.get(usize::from(index)).copied().unwrap_or(Maj)
}

// ═══════════════════════════════════════════════════════════════════════
// Octave shift
// ═══════════════════════════════════════════════════════════════════════

/// Shift direction and endpoint positions of a 4-bit octave-shift code.
/// Codes 0xC–0xF carry both a start and a stop.
pub fn octave_shift(code: u8) -> (OctaveShiftType, &'static [OctaveShiftPosition]) {
    use OctaveShiftPosition::*;
    let shift = match code & 0x03 {
        0 => OctaveShiftType::Up8,
        1 => OctaveShiftType::Down8,
        2 => OctaveShiftType::Up15,
        _ => OctaveShiftType::Down15,
    };
    let positions: &'static [OctaveShiftPosition] = match (code & 0x0F) >> 2 {
        0 => &[Continue],
        1 => &[Stop],
        2 => &[Start],
        _ => &[Start, Stop],
    };
    (shift, positions)
}

// ═══════════════════════════════════════════════════════════════════════
// Decorators and articulations
// ═══════════════════════════════════════════════════════════════════════

/// What a decorator byte denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoratorCode {
    MeasureRepeat { single: bool },
    Decorator(DecoratorType, ArticulationType),
}

pub fn decorator_code(b: u8) -> DecoratorCode {
    use ArticulationType as A;
    let art = match b {
        0x00 => return DecoratorCode::Decorator(DecoratorType::DottedBarline, A::None),
        0x8D => return DecoratorCode::MeasureRepeat { single: true },
        0x8E => return DecoratorCode::MeasureRepeat { single: false },
        0x30 => A::OpenString,
        0x31 => A::Finger1,
        0x32 => A::Finger2,
        0x33 => A::Finger3,
        0x34 => A::Finger4,
        0x35 => A::Finger5,
        0x6B => A::FlatAccidentalForTrill,
        0x6C => A::SharpAccidentalForTrill,
        0x6D => A::NaturalAccidentalForTrill,
        0xA0 => A::MinorTrill,
        0xA1 => A::MajorTrill,
        0xA2 => A::TrillSection,
        0xA6 => A::Turn,
        0xA8 => A::TremoloEighth,
        0xA9 => A::TremoloSixteenth,
        0xAA => A::TremoloThirtySecond,
        0xAB => A::TremoloSixtyFourth,
        0xB2 => A::Fermata,
        0xB3 => A::FermataInverted,
        0xB9 => A::Pause,
        0xBA => A::GrandPause,
        0xC0 => A::Marcato,
        0xC1 => A::MarcatoDot,
        0xC2 => A::SForzando,
        0xC3 => A::SForzandoDot,
        0xC4 => A::SForzandoInverted,
        0xC5 => A::SForzandoDotInverted,
        0xC6 => A::Staccatissimo,
        0xC7 => A::Staccato,
        0xC8 => A::Tenuto,
        0xC9 => A::NaturalHarmonic,
        0xCA => A::ArtificialHarmonic,
        0xCB => A::PlusSign,
        0xCC => A::UpBow,
        0xCD => A::DownBow,
        0xCE => A::UpBowInverted,
        0xCF => A::DownBowInverted,
        0xD0 => A::PedalDown,
        0xD1 => A::PedalUp,
        0xD6 => A::HeavyAttack,
        0xD7 => A::HeavierAttack,
        _ => A::None,
    };
    DecoratorCode::Decorator(DecoratorType::Articulation, art)
}

/// Articulation type of a note-attached articulation block.
pub fn articulation_type(code: u8) -> ArticulationType {
    use ArticulationType::*;
    const LOW: [ArticulationType; 0x31] = [
        MajorTrill, MinorTrill, TrillSection, InvertedShortMordent, InvertedLongMordent,
        ShortMordent, Turn, Finger1, Finger2, Finger3, Finger4, Finger5, FlatAccidentalForTrill,
        SharpAccidentalForTrill, NaturalAccidentalForTrill, Marcato, MarcatoDot, HeavyAttack,
        SForzando, SForzandoDot, HeavierAttack, SForzandoInverted, SForzandoDotInverted,
        Staccatissimo, Staccato, Tenuto, UpBow, DownBow, UpBowInverted, DownBowInverted, Arpeggio,
        TremoloEighth, TremoloSixteenth, TremoloThirtySecond, TremoloSixtyFourth, NaturalHarmonic,
        ArtificialHarmonic, PlusSign, Fermata, FermataInverted, PedalDown, PedalUp, Pause,
        GrandPause, ToePedal, HeelPedal, ToeToHeelPedal, HeelToToePedal, OpenString,
    ];
    const GUITAR: [ArticulationType; 12] = [
        GuitarLift, GuitarSlideUp, GuitarRip, GuitarFallOff, GuitarSlideDown, GuitarSpill,
        GuitarFlip, GuitarSmear, GuitarBend, GuitarDoit, GuitarPlop, GuitarWowWow,
    ];
    const FINGERING: [ArticulationType; 8] = [
        GuitarThumb, GuitarIndexFinger, GuitarMiddleFinger, GuitarRingFinger, GuitarPinkyFinger,
        GuitarTap, GuitarHammer, GuitarPluck,
    ];
    match code {
        0x00..=0x30 => LOW[usize::from(code)],
        0x46..=0x51 => GUITAR[usize::from(code - 0x46)],
        0x64..=0x6B => FINGERING[usize::from(code - 0x64)],
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Small enums
// ═══════════════════════════════════════════════════════════════════════

/// Signed accidental count of a stored key index: `0 → 0`, `1..=7` are
/// flats, `8..=14` are sharps.
pub fn ove_key_to_key(value: u8) -> i32 {
    let v = i32::from(value);
    if v == 0 {
        0
    } else if v > 7 {
        v - 7
    } else {
        -v
    }
}

pub fn accidental_type(code: u8) -> AccidentalType {
    match code {
        0x1 => AccidentalType::Sharp,
        0x2 => AccidentalType::Flat,
        0x3 => AccidentalType::Natural,
        0x4 => AccidentalType::DoubleSharp,
        0x5 => AccidentalType::DoubleFlat,
        0x9 => AccidentalType::SharpCaution,
        0xA => AccidentalType::FlatCaution,
        0xB => AccidentalType::NaturalCaution,
        0xC => AccidentalType::DoubleSharpCaution,
        0xD => AccidentalType::DoubleFlatCaution,
        _ => AccidentalType::Normal,
    }
}

pub fn note_head_type(code: u8) -> NoteHeadType {
    use NoteHeadType::*;
    const ALL: [NoteHeadType; 22] = [
        Standard, Invisible, RhythmicSlash, Percussion, ClosedRhythm, OpenRhythm, ClosedSlash,
        OpenSlash, ClosedDo, OpenDo, ClosedRe, OpenRe, ClosedMi, OpenMi, ClosedFa, OpenFa,
        ClosedSol, OpenSol, ClosedLa, OpenLa, ClosedTi, OpenTi,
    ];
    ALL.get(usize::from(code)).copied().unwrap_or(Standard)
}

pub fn dynamics_type(code: u8) -> DynamicsType {
    use DynamicsType::*;
    const ALL: [DynamicsType; 16] = [
        Pppp, Ppp, Pp, P, Mp, Mf, F, Ff, Fff, Ffff, Sf, Fz, Sfz, Sffz, Fp, Sfp,
    ];
    ALL.get(usize::from(code)).copied().unwrap_or(Pppp)
}

pub fn repeat_type(code: u8) -> RepeatType {
    use RepeatType::*;
    const ALL: [RepeatType; 8] = [Segno, Coda, ToCoda, DSAlCoda, DSAlFine, DCAlCoda, DCAlFine, Fine];
    ALL.get(usize::from(code)).copied().unwrap_or(Null)
}

pub fn kuohao_type(code: u8) -> KuoHaoType {
    match code {
        1 => KuoHaoType::Brace,
        2 => KuoHaoType::Bracket,
        _ => KuoHaoType::Parentheses,
    }
}

/// Largest power of two `a` with `a * 2 < tuplet`, the notated space of a
/// tuplet of `tuplet` notes.
pub fn tuplet_to_space(tuplet: i32) -> i32 {
    let mut a = 1;
    while a * 2 < tuplet {
        a *= 2;
    }
    a
}
