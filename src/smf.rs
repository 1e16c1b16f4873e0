//! Standard MIDI File export.
//!
//! [`SmfWriter`] collects the event stream and produces an SMF Type 1 as
//! raw bytes. Track 0 holds the tempo, time and key signatures; each OVE
//! track follows as its own MTrk chunk.

use crate::events::{convert, ConvertOptions, EventHandler, TrackInfo};
use crate::model::Score;

/// A single MIDI event (note on/off, program change, etc.)
#[derive(Debug, Clone)]
pub struct MidiEvent {
    /// Absolute time in ticks from the start of the track
    pub tick: u32,
    /// Raw MIDI message bytes (status + data)
    pub bytes: Vec<u8>,
}

/// Ticks per quarter note written when no header event was seen.
pub const TICKS_PER_QUARTER: u16 = 480;

#[derive(Debug, Clone, Default)]
struct TrackBuffer {
    name: String,
    events: Vec<MidiEvent>,
}

/// Event handler that renders the stream as a Standard MIDI File.
#[derive(Debug, Clone)]
pub struct SmfWriter {
    division: u16,
    conductor: Vec<MidiEvent>,
    tracks: Vec<TrackBuffer>,
}

impl Default for SmfWriter {
    fn default() -> Self {
        SmfWriter { division: TICKS_PER_QUARTER, conductor: Vec::new(), tracks: Vec::new() }
    }
}

impl SmfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn track_mut(&mut self, track: usize) -> &mut TrackBuffer {
        if track >= self.tracks.len() {
            self.tracks.resize_with(track + 1, TrackBuffer::default);
        }
        &mut self.tracks[track]
    }

    fn push(&mut self, track: usize, tick: i32, bytes: Vec<u8>) {
        let tick = tick.max(0) as u32;
        self.track_mut(track).events.push(MidiEvent { tick, bytes });
    }

    fn push_conductor(&mut self, tick: i32, bytes: Vec<u8>) {
        let tick = tick.max(0) as u32;
        self.conductor.push(MidiEvent { tick, bytes });
    }

    /// The complete file: the conductor track, then one track per OVE track.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut tracks = vec![encode_track(&self.conductor, "Tempo")];
        tracks.extend(self.tracks.iter().map(|t| encode_track(&t.events, &t.name)));
        build_smf(&tracks, self.division)
    }
}

impl EventHandler for SmfWriter {
    fn header(&mut self, quarter: i32, track_count: usize) {
        self.division = u16::try_from(quarter).unwrap_or(TICKS_PER_QUARTER);
        self.tracks = vec![TrackBuffer::default(); track_count];
    }

    fn track(&mut self, track: usize, info: &TrackInfo) {
        self.track_mut(track).name = info.name.clone();
    }

    fn note_on(&mut self, track: usize, tick: i32, channel: u8, pitch: u8, velocity: u8) {
        self.push(track, tick, vec![0x90 | (channel & 0x0F), pitch & 0x7F, velocity & 0x7F]);
    }

    fn note_off(&mut self, track: usize, tick: i32, channel: u8, pitch: u8, velocity: u8) {
        self.push(track, tick, vec![0x80 | (channel & 0x0F), pitch & 0x7F, velocity & 0x7F]);
    }

    fn controller(&mut self, track: usize, tick: i32, channel: u8, controller: u8, value: u8) {
        self.push(track, tick, vec![0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F]);
    }

    fn program(&mut self, track: usize, tick: i32, channel: u8, patch: u8) {
        self.push(track, tick, vec![0xC0 | (channel & 0x0F), patch & 0x7F]);
    }

    fn pressure(&mut self, track: usize, tick: i32, channel: u8, pressure: u8) {
        self.push(track, tick, vec![0xD0 | (channel & 0x0F), pressure & 0x7F]);
    }

    fn pitch_bend(&mut self, track: usize, tick: i32, channel: u8, value: u16) {
        let value = value.min(0x3FFF);
        self.push(track, tick, vec![0xE0 | (channel & 0x0F), (value & 0x7F) as u8, (value >> 7) as u8]);
    }

    fn text(&mut self, track: usize, tick: i32, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut bytes = vec![0xFF, 0x01];
        write_vlq(&mut bytes, text.len() as u32);
        bytes.extend_from_slice(text.as_bytes());
        self.push(track, tick, bytes);
    }

    fn time_sig(&mut self, _measure: usize, tick: i32, numerator: i32, denominator: i32) {
        // FF 58 04 nn dd cc bb, denominator as a power of two
        let power = (denominator.max(1) as u32).trailing_zeros() as u8;
        self.push_conductor(tick, vec![0xFF, 0x58, 0x04, numerator.clamp(1, 255) as u8, power, 24, 8]);
    }

    fn key_sig(&mut self, _measure: usize, tick: i32, key: i32) {
        let sharps = key.clamp(-7, 7) as i8;
        self.push_conductor(tick, vec![0xFF, 0x59, 0x02, sharps as u8, 0]);
    }

    fn tempo(&mut self, tick: i32, tempo: i32) {
        // tempo is beats per minute times 100
        let uspq = (6_000_000_000u64 / tempo.max(1) as u64).min(0xFF_FFFF) as u32;
        self.push_conductor(
            tick,
            vec![0xFF, 0x51, 0x03, ((uspq >> 16) & 0xFF) as u8, ((uspq >> 8) & 0xFF) as u8, (uspq & 0xFF) as u8],
        );
    }
}

/// Render an organized score straight to SMF bytes.
pub fn score_to_smf(score: &Score) -> Vec<u8> {
    let mut writer = SmfWriter::new();
    convert(score, &mut writer, &ConvertOptions::default());
    writer.to_bytes()
}

// ═══════════════════════════════════════════════════════════════════════
// SMF byte encoding
// ═══════════════════════════════════════════════════════════════════════

/// Build the complete Standard MIDI File bytes.
fn build_smf(tracks: &[Vec<u8>], division: u16) -> Vec<u8> {
    let mut out = Vec::new();

    // MThd header
    out.extend_from_slice(b"MThd");
    out.extend_from_slice(&6u32.to_be_bytes()); // header length
    out.extend_from_slice(&1u16.to_be_bytes()); // format type 1
    out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    out.extend_from_slice(&division.to_be_bytes());

    for track_data in tracks {
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        out.extend_from_slice(track_data);
    }

    out
}

/// Encode a track's events into raw MTrk bytes (delta-time encoded).
fn encode_track(events: &[MidiEvent], name: &str) -> Vec<u8> {
    let mut data = Vec::new();

    // Track name meta event
    let name_bytes = name.as_bytes();
    data.push(0x00);
    data.push(0xFF);
    data.push(0x03);
    write_vlq(&mut data, name_bytes.len() as u32);
    data.extend_from_slice(name_bytes);

    // stable, so same-tick events keep stream order
    let mut sorted: Vec<&MidiEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.tick);

    let mut last_tick: u32 = 0;
    for event in &sorted {
        let delta = event.tick.saturating_sub(last_tick);
        write_vlq(&mut data, delta);
        data.extend_from_slice(&event.bytes);
        last_tick = event.tick;
    }

    // End of track
    data.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

    data
}

/// Write a variable-length quantity (VLQ) to a byte vector.
fn write_vlq(out: &mut Vec<u8>, mut value: u32) {
    if value == 0 {
        out.push(0);
        return;
    }
    let mut buf = [0u8; 5];
    let mut i = 0;
    while value > 0 {
        buf[i] = (value & 0x7F) as u8;
        value >>= 7;
        if i > 0 {
            buf[i] |= 0x80;
        }
        i += 1;
    }
    for j in (0..i).rev() {
        out.push(buf[j]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vlq_encoding() {
        let mut buf = Vec::new();
        write_vlq(&mut buf, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        write_vlq(&mut buf, 127);
        assert_eq!(buf, vec![0x7F]);

        buf.clear();
        write_vlq(&mut buf, 128);
        assert_eq!(buf, vec![0x81, 0x00]);

        buf.clear();
        write_vlq(&mut buf, 480);
        assert_eq!(buf, vec![0x83, 0x60]);
    }

    #[test]
    fn smf_header_valid() {
        let track = encode_track(&[], "Test");
        let smf = build_smf(&[track], TICKS_PER_QUARTER);
        assert_eq!(&smf[0..4], b"MThd");
        assert_eq!(&smf[8..10], &1u16.to_be_bytes()); // format 1
        assert_eq!(&smf[12..14], &TICKS_PER_QUARTER.to_be_bytes());
        assert!(smf.windows(4).any(|w| w == b"MTrk"));
    }

    #[test]
    fn events_are_written_with_deltas() {
        let mut writer = SmfWriter::new();
        writer.header(480, 1);
        writer.track(0, &TrackInfo { name: "A".into(), channel: 1, volume: -1, pan: 0, patch: 0 });
        writer.note_off(0, 480, 1, 60, 64);
        writer.note_on(0, 0, 1, 60, 100);

        let smf = writer.to_bytes();
        assert_eq!(&smf[10..12], &2u16.to_be_bytes());
        let expected: &[u8] = &[0x00, 0x91, 60, 100, 0x83, 0x60, 0x81, 60, 64, 0x00, 0xFF, 0x2F, 0x00];
        assert!(smf.windows(expected.len()).any(|w| w == expected));
    }

    #[test]
    fn tempo_and_meter_go_to_the_first_track() {
        let mut writer = SmfWriter::new();
        writer.header(480, 0);
        writer.tempo(0, 12000);
        writer.time_sig(0, 0, 6, 8);
        let smf = writer.to_bytes();
        // 500000 microseconds per quarter
        assert!(smf.windows(6).any(|w| w == [0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]));
        assert!(smf.windows(5).any(|w| w == [0xFF, 0x58, 0x04, 6, 3]));
    }
}
