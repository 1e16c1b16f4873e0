//! Builds small synthetic OVE files byte by byte for the integration tests.
//!
//! Only the fields the decoder reads for these scenarios are filled in;
//! everything else stays zero.

#![allow(dead_code)]

use std::collections::BTreeMap;

/// One instrument track with a single configured voice.
#[derive(Debug, Clone)]
pub struct TrackSpec {
    pub name: String,
    pub channel: u8,
    pub patch: u8,
    pub key: i8,
    pub brace_next: bool,
}

impl TrackSpec {
    pub fn new(name: &str) -> Self {
        TrackSpec { name: name.to_string(), channel: 0, patch: 0, key: 0, brace_next: false }
    }

    pub fn channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    pub fn patch(mut self, patch: u8) -> Self {
        self.patch = patch;
        self
    }

    /// Sharps when positive, flats when negative.
    pub fn key(mut self, key: i8) -> Self {
        self.key = key;
        self
    }

    /// Brace this staff together with the following one.
    pub fn brace_next(mut self) -> Self {
        self.brace_next = true;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct MeasureSpec {
    numerator: u8,
    denominator: u8,
    tempo: u16,
}

/// Assembles a complete file: header, tracks, one line of staves, bars,
/// then the optional lyric and title chunks.
#[derive(Debug, Clone)]
pub struct OveBuilder {
    v4: bool,
    tracks: Vec<TrackSpec>,
    measures: Vec<MeasureSpec>,
    records: BTreeMap<(usize, usize), Vec<Vec<u8>>>,
    lyrics: Vec<Vec<u8>>,
    titles: Vec<Vec<u8>>,
}

impl Default for OveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OveBuilder {
    pub fn new() -> Self {
        OveBuilder {
            v4: true,
            tracks: Vec::new(),
            measures: Vec::new(),
            records: BTreeMap::new(),
            lyrics: Vec::new(),
            titles: Vec::new(),
        }
    }

    /// Write the Overture 3 layout instead.
    pub fn v3(mut self) -> Self {
        self.v4 = false;
        self
    }

    pub fn is_v4(&self) -> bool {
        self.v4
    }

    pub fn track(mut self, track: TrackSpec) -> Self {
        self.tracks.push(track);
        self
    }

    /// Append a measure in `numerator/denominator` at `tempo` beats per minute.
    pub fn measure(mut self, numerator: u8, denominator: u8, tempo: u16) -> Self {
        self.measures.push(MeasureSpec { numerator, denominator, tempo });
        self
    }

    pub fn measures(mut self, count: usize) -> Self {
        for _ in 0..count {
            self = self.measure(4, 4, 120);
        }
        self
    }

    /// Add a framed BDAT record (see the record helpers below).
    pub fn record(mut self, track: usize, measure: usize, record: Vec<u8>) -> Self {
        self.records.entry((track, measure)).or_default().push(record);
        self
    }

    pub fn lyric_info(mut self, voice: u8, verse: u8, track: u8, measure: u16, text: &str) -> Self {
        self.lyrics.push(lyric_info(voice, verse, track, measure, text));
        self
    }

    pub fn title(mut self, title: &str, subtitle: &str) -> Self {
        let mut payload = vec![0, 0, 0, 1, 0, 0, 0, 0];
        payload.extend(sized(title));
        for s in [subtitle, "", ""] {
            payload.extend([0u8; 6]);
            payload.extend(sized(s));
        }
        self.titles.push(payload);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();

        let mut header = vec![if self.v4 { 4 } else { 3 }];
        header.extend([0u8; 15]);
        out.extend(chunk(b"OVSC", &header));

        out.extend(b"TRKL");
        out.extend((self.tracks.len() as u16).to_be_bytes());
        for track in &self.tracks {
            let record = track_record(track);
            if self.v4 {
                out.extend(chunk(b"TRAK", &record));
            } else {
                out.extend(record);
            }
        }

        out.extend(b"PAGL");
        out.extend(0u16.to_be_bytes());

        out.extend(b"LINL");
        out.extend(1u16.to_be_bytes());
        let mut line = vec![0u8; 22];
        line[6..8].copy_from_slice(&(self.tracks.len() as u16).to_be_bytes());
        out.extend(chunk(b"LINE", &line));
        for track in &self.tracks {
            out.extend(chunk(b"STAF", &self.staff_record(track)));
        }

        out.extend(b"BARL");
        out.extend((self.measures.len() as u16).to_be_bytes());
        for m in &self.measures {
            out.extend(chunk(b"MEAS", &self.meas_record(m)));
        }
        for m in &self.measures {
            let mut cond = 0u16.to_be_bytes().to_vec();
            let mut time = [0u8; 36];
            time[0] = m.numerator;
            time[1] = m.denominator;
            cond.extend(time);
            out.extend(chunk(b"COND", &cond));
        }
        for track in 0..self.tracks.len() {
            for measure in 0..self.measures.len() {
                let records = self.records.get(&(track, measure)).cloned().unwrap_or_default();
                let mut bdat = (records.len() as u16).to_be_bytes().to_vec();
                for r in records {
                    bdat.extend(r);
                }
                out.extend(chunk(b"BDAT", &bdat));
            }
        }

        if !self.lyrics.is_empty() {
            let mut payload = vec![0u8; 4];
            payload.extend((self.lyrics.len() as u16).to_be_bytes());
            for l in &self.lyrics {
                payload.extend(l);
            }
            out.extend(chunk(b"LYRC", &payload));
        }
        for t in &self.titles {
            out.extend(chunk(b"TITL", t));
        }

        out
    }

    fn staff_record(&self, track: &TrackSpec) -> Vec<u8> {
        let mut b = vec![0u8; if self.v4 { 54 } else { 46 }];
        b[8] = ove_key_index(track.key);
        b[11] = 1;
        let group = b.len() - 2;
        if track.brace_next {
            b[group] = 1;
            b[group + 1] = 1;
        }
        b
    }

    fn meas_record(&self, m: &MeasureSpec) -> Vec<u8> {
        let mut b = vec![0u8; 28];
        let tempo = if self.v4 { m.tempo * 100 } else { m.tempo };
        b[10..12].copy_from_slice(&tempo.to_be_bytes());
        b[12..14].copy_from_slice(&0x780u16.to_be_bytes());
        b
    }
}

// ─── Framing ─────────────────────────────────────────────────────────

pub fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    out.extend((payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

fn sized(s: &str) -> Vec<u8> {
    let mut v = (s.len() as u16).to_be_bytes().to_vec();
    v.extend_from_slice(s.as_bytes());
    v
}

/// Size, tag, payload.
fn framed(tag: u8, payload: Vec<u8>) -> Vec<u8> {
    let mut out = ((payload.len() + 7) as u16).to_be_bytes().to_vec();
    out.push(tag);
    out.extend(payload);
    out
}

/// Tick, offset and (Overture 4) colour.
fn common(v4: bool, tick: i16, offset: i16) -> Vec<u8> {
    let mut out = tick.to_be_bytes().to_vec();
    out.extend(offset.to_be_bytes());
    if v4 {
        out.extend([0, 0]);
    }
    out
}

fn ove_key_index(key: i8) -> u8 {
    match key {
        k if k < 0 => (-k) as u8,
        k if k > 0 => 7 + k as u8,
        _ => 0,
    }
}

fn track_record(track: &TrackSpec) -> Vec<u8> {
    let mut b = vec![0u8; 0x13A];
    let name = track.name.as_bytes();
    b[..name.len().min(32)].copy_from_slice(&name[..name.len().min(32)]);
    b[73] = track.patch;
    b[83] = 1;
    b[92] = ove_key_index(track.key);
    for voice in 0..8 {
        let at = 114 + voice * 16;
        b[at + 6] = 0xFF;
        b[at + 15] = 0xFF;
    }
    b[114 + 5] = track.channel;
    b[114 + 6] = 100;
    b[114 + 15] = track.patch;
    b
}

// ─── BDAT records ────────────────────────────────────────────────────

/// A note for [`note`]: pitch and length in ticks.
#[derive(Debug, Clone, Copy)]
pub struct NoteSpec {
    pub pitch: u8,
    pub velocity: u8,
    pub length: u16,
    pub tie: u8,
}

impl NoteSpec {
    pub fn new(pitch: u8) -> Self {
        NoteSpec { pitch, velocity: 100, length: 480, tie: 0 }
    }

    pub fn length(mut self, length: u16) -> Self {
        self.length = length;
        self
    }
}

/// A quarter-note chord in `voice` at `tick`, placed at `offset` units.
pub fn note(v4: bool, voice: u8, tick: i16, offset: i16, notes: &[NoteSpec]) -> Vec<u8> {
    tuplet_note(v4, voice, tick, offset, 0, notes)
}

pub fn tuplet_note(v4: bool, voice: u8, tick: i16, offset: i16, tuplet: u8, notes: &[NoteSpec]) -> Vec<u8> {
    let mut p = vec![0, 0, voice];
    p.extend(common(v4, tick, offset));
    let space = if tuplet > 0 { 2 } else { 0 };
    p.extend([tuplet, space, 0, 3]);
    p.extend([0x80, 0x00, 0x00, notes.len() as u8]);
    for n in notes {
        p.extend([0x00, n.tie << 4, 0, 0, 0, 2, 0, n.pitch, n.velocity, 64, 0, 0]);
        p.extend(n.length.to_be_bytes());
        p.extend(0i16.to_be_bytes());
    }
    framed(0x90, p)
}

pub fn rest(v4: bool, voice: u8, tick: i16, offset: i16) -> Vec<u8> {
    let mut p = vec![0, 0, voice];
    p.extend(common(v4, tick, offset));
    p.extend([0, 0, 0, 3, 0, 0]);
    framed(0x80, p)
}

/// Double hairpin spanning `measures` bars from its start.
pub fn double_wedge(v4: bool, tick: i16, offset: i16, measures: u16, stop_offset: i16) -> Vec<u8> {
    let mut p = vec![0, 0, 0];
    p.extend(common(v4, tick, offset));
    p.extend([if v4 { 0x0B } else { 0x08 }, 0]);
    p.extend(0i16.to_be_bytes());
    p.extend([0, 0]);
    p.extend(10u16.to_be_bytes());
    p.extend(measures.to_be_bytes());
    p.extend(stop_offset.to_be_bytes());
    framed(0x13, p)
}

/// 8va with both endpoints in the record, covering ticks up to `end_tick`.
pub fn octave_up(v4: bool, tick: i16, offset: i16, length: u16, end_tick: u16) -> Vec<u8> {
    let mut p = vec![0, 0, 0];
    p.extend(common(v4, tick, offset));
    p.extend([0x0C, 0]);
    p.extend(0i16.to_be_bytes());
    p.extend([0u8; 4]);
    p.extend(length.to_be_bytes());
    p.extend(end_tick.to_be_bytes());
    framed(0x19, p)
}

/// Beam over `lines` groups in one measure, each carrying `tuplet`.
pub fn beam(v4: bool, voice: u8, tick: i16, offset: i16, tuplet: u8, lines: &[(i16, i16)]) -> Vec<u8> {
    let mut p = vec![0, 0, voice];
    p.extend(common(v4, tick, offset));
    p.extend([0, 0, lines.len() as u8, 0, 0, 0]);
    if v4 {
        p.extend([0u8; 8]);
    }
    for &(start, stop) in lines {
        p.extend([0, tuplet, 0, 0]);
        p.extend(start.to_be_bytes());
        p.extend(stop.to_be_bytes());
        p.extend([0u8; 8]);
    }
    framed(0x10, p)
}

/// Lyric slot; Overture 4 stores the text inline.
pub fn lyric(v4: bool, tick: i16, offset: i16, verse: u8, text: &str) -> Vec<u8> {
    let mut p = vec![0, 0, 0];
    p.extend(common(v4, tick, offset));
    p.extend([0u8; 2 + 4 + 7]);
    p.push(verse);
    if v4 {
        p.extend([0u8; 6]);
        p.extend(text.as_bytes());
        p.push(0);
    }
    framed(0x18, p)
}

/// One record of the Overture 3 `LYRC` chunk.
fn lyric_info(voice: u8, verse: u8, track: u8, measure: u16, text: &str) -> Vec<u8> {
    let words = text.split_whitespace().count() as u16;
    let mut r = vec![0, 0, 0x0D, 0, voice, verse, track, 0];
    r.extend(measure.to_be_bytes());
    r.extend(words.to_be_bytes());
    r.extend((text.len() as u16).to_be_bytes());
    r.extend([0u8; 6]);
    let mut name = [0u8; 32];
    name[..5].copy_from_slice(b"Verse");
    r.extend(name);
    r.extend(text.as_bytes());
    r.extend([0, 0, 0, 0, 0, 1, 0, 12, 0, 0]);
    r.extend(vec![0u8; 8 * usize::from(words)]);
    r
}
