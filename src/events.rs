//! Conversion of a decoded score into a stream of MIDI-like events.
//!
//! The stream starts with a header, then the conductor events (tempo,
//! time and key signatures), then every track in part/staff order, and
//! ends with an end-of-file notification. Ticks are absolute and never
//! negative.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::decoder::{DecodeOptions, FileDecoder};
use crate::error::Result;
use crate::model::{
    ArticulationType, DecoratorType, MeasureData, MidiKind, MusicKind, NoteContainer, Score, Track,
    VelocityType,
};
use crate::timemap::MeasureToTick;

/// MIDI controller numbers used by the conversion.
const CC_BANK: u8 = 0;
const CC_VOLUME: u8 = 7;
const CC_PAN: u8 = 10;
const CC_SUSTAIN: u8 = 64;
const PAN_CENTER: i32 = 64;

// ═══════════════════════════════════════════════════════════════════════
// Events
// ═══════════════════════════════════════════════════════════════════════

/// Playback settings announced when a track starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub name: String,
    pub channel: u8,
    /// -1 when the track keeps the default volume
    pub volume: i32,
    pub pan: i32,
    pub patch: u8,
}

/// One element of the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Header { quarter: i32, track_count: usize },
    Track { track: usize, info: TrackInfo },
    NoteOn { track: usize, tick: i32, channel: u8, pitch: u8, velocity: u8 },
    NoteOff { track: usize, tick: i32, channel: u8, pitch: u8, velocity: u8 },
    Controller { track: usize, tick: i32, channel: u8, controller: u8, value: u8 },
    Program { track: usize, tick: i32, channel: u8, patch: u8 },
    Pressure { track: usize, tick: i32, channel: u8, pressure: u8 },
    PitchBend { track: usize, tick: i32, channel: u8, value: u16 },
    Text { track: usize, tick: i32, text: String },
    TimeSig { measure: usize, tick: i32, numerator: i32, denominator: i32 },
    KeySig { measure: usize, tick: i32, key: i32 },
    /// Beats per minute times 100
    Tempo { tick: i32, tempo: i32 },
    EndOfFile,
    Error { message: String },
}

/// Receiver of the event stream. Every method defaults to doing nothing.
#[allow(unused_variables)]
pub trait EventHandler {
    fn header(&mut self, quarter: i32, track_count: usize) {}
    fn track(&mut self, track: usize, info: &TrackInfo) {}
    fn note_on(&mut self, track: usize, tick: i32, channel: u8, pitch: u8, velocity: u8) {}
    fn note_off(&mut self, track: usize, tick: i32, channel: u8, pitch: u8, velocity: u8) {}
    fn controller(&mut self, track: usize, tick: i32, channel: u8, controller: u8, value: u8) {}
    fn program(&mut self, track: usize, tick: i32, channel: u8, patch: u8) {}
    fn pressure(&mut self, track: usize, tick: i32, channel: u8, pressure: u8) {}
    fn pitch_bend(&mut self, track: usize, tick: i32, channel: u8, value: u16) {}
    fn text(&mut self, track: usize, tick: i32, text: &str) {}
    fn time_sig(&mut self, measure: usize, tick: i32, numerator: i32, denominator: i32) {}
    fn key_sig(&mut self, measure: usize, tick: i32, key: i32) {}
    fn tempo(&mut self, tick: i32, tempo: i32) {}
    fn end_of_file(&mut self) {}
    fn error(&mut self, message: &str) {}
}

/// Handler that records every event in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    pub events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes_on(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|e| matches!(e, Event::NoteOn { .. }))
    }
}

impl EventHandler for EventLog {
    fn header(&mut self, quarter: i32, track_count: usize) {
        self.events.push(Event::Header { quarter, track_count });
    }

    fn track(&mut self, track: usize, info: &TrackInfo) {
        self.events.push(Event::Track { track, info: info.clone() });
    }

    fn note_on(&mut self, track: usize, tick: i32, channel: u8, pitch: u8, velocity: u8) {
        self.events.push(Event::NoteOn { track, tick, channel, pitch, velocity });
    }

    fn note_off(&mut self, track: usize, tick: i32, channel: u8, pitch: u8, velocity: u8) {
        self.events.push(Event::NoteOff { track, tick, channel, pitch, velocity });
    }

    fn controller(&mut self, track: usize, tick: i32, channel: u8, controller: u8, value: u8) {
        self.events.push(Event::Controller { track, tick, channel, controller, value });
    }

    fn program(&mut self, track: usize, tick: i32, channel: u8, patch: u8) {
        self.events.push(Event::Program { track, tick, channel, patch });
    }

    fn pressure(&mut self, track: usize, tick: i32, channel: u8, pressure: u8) {
        self.events.push(Event::Pressure { track, tick, channel, pressure });
    }

    fn pitch_bend(&mut self, track: usize, tick: i32, channel: u8, value: u16) {
        self.events.push(Event::PitchBend { track, tick, channel, value });
    }

    fn text(&mut self, track: usize, tick: i32, text: &str) {
        self.events.push(Event::Text { track, tick, text: text.to_string() });
    }

    fn time_sig(&mut self, measure: usize, tick: i32, numerator: i32, denominator: i32) {
        self.events.push(Event::TimeSig { measure, tick, numerator, denominator });
    }

    fn key_sig(&mut self, measure: usize, tick: i32, key: i32) {
        self.events.push(Event::KeySig { measure, tick, key });
    }

    fn tempo(&mut self, tick: i32, tempo: i32) {
        self.events.push(Event::Tempo { tick, tempo });
    }

    fn end_of_file(&mut self) {
        self.events.push(Event::EndOfFile);
    }

    fn error(&mut self, message: &str) {
        self.events.push(Event::Error { message: message.to_string() });
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Conversion
// ═══════════════════════════════════════════════════════════════════════

/// Measure range to convert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    pub begin_measure: usize,
    /// Exclusive; `None` converts to the last measure
    pub end_measure: Option<usize>,
}

impl ConvertOptions {
    fn range(&self, score: &Score) -> (usize, usize) {
        let count = score.measure_count();
        let end = self.end_measure.map_or(count, |e| e.min(count));
        (self.begin_measure.min(end), end)
    }
}

/// Decode `data` and stream it to `handler`. A decode failure is reported
/// through [`EventHandler::error`] with its display message before being
/// returned.
pub fn decode_and_convert(data: &[u8], handler: &mut dyn EventHandler, options: &ConvertOptions) -> Result<Score> {
    match FileDecoder::new(data, DecodeOptions::default()).decode() {
        Ok(score) => {
            convert(&score, handler, options);
            Ok(score)
        }
        Err(e) => {
            handler.error(&e.diagnostic());
            Err(e)
        }
    }
}

/// Stream an organized score to `handler`.
pub fn convert(score: &Score, handler: &mut dyn EventHandler, options: &ConvertOptions) {
    let mtt = MeasureToTick::build(score);
    let (begin, end) = options.range(score);

    handler.header(score.quarter, score.track_count());
    convert_signatures(score, &mtt, handler, begin, end);

    for (number, &track_index) in track_order(score).iter().enumerate() {
        let Some(track) = score.tracks.get(track_index) else { continue };
        let transpose = if track.show_transpose { track.transpose } else { 0 };

        convert_track_header(track, number, handler);
        for measure in begin..end {
            let Some(md) = score.measure_data(track_index, measure) else { continue };
            let cell = Cell { track: number, measure, measure_tick: mtt.tick(measure, 0) };
            convert_measure(score, track, md, &cell, transpose, handler);
        }
    }

    handler.end_of_file();
}

/// Tracks in part/staff order, or file order before the score is organized.
fn track_order(score: &Score) -> Vec<usize> {
    if score.part_count() == 0 {
        return (0..score.track_count()).collect();
    }
    (0..score.part_count())
        .flat_map(|part| (0..score.staff_count(part)).filter_map(move |staff| score.part_staff_to_track(part, staff)))
        .collect()
}

fn conductor_track(score: &Score) -> Option<usize> {
    if score.part_count() == 0 {
        return (score.track_count() > 0).then_some(0);
    }
    score.part_staff_to_track(0, 0)
}

fn convert_signatures(score: &Score, mtt: &MeasureToTick, handler: &mut dyn EventHandler, begin: usize, end: usize) {
    let conductor = conductor_track(score);

    // tempo, keyed by tick so later marks at the same tick win
    let mut tempos: BTreeMap<i32, i32> = BTreeMap::new();
    if let Some(track) = conductor {
        for measure in begin..end {
            let shell = &score.measures[measure];
            let changed = measure == 0
                || score
                    .measures
                    .get(measure - 1)
                    .is_some_and(|prev| (shell.type_tempo - prev.type_tempo).abs() > 0.01);
            if changed {
                tempos.insert(mtt.tick(measure, 0), shell.type_tempo as i32);
            }

            let Some(md) = score.measure_data(track, measure) else { continue };
            for data in &md.music {
                if let MusicKind::Tempo(tempo) = &data.kind {
                    let tick = mtt.tick(shell.index(), data.tick);
                    tempos.insert(tick, tempo.quarter_tempo().max(1));
                }
            }
        }
    }

    let mut last = None;
    for (&tick, &tempo) in &tempos {
        if last != Some(tempo) {
            handler.tempo(tick, tempo * 100);
        }
        last = Some(tempo);
    }

    for bp in mtt.breakpoints() {
        if (begin..end).contains(&bp.measure) {
            handler.time_sig(bp.measure, bp.tick, bp.numerator, bp.denominator);
        }
    }

    let mut emitted = false;
    if let Some(track) = conductor {
        for measure in begin..end {
            let Some(md) = score.measure_data(track, measure) else { continue };
            if measure == 0 || md.key.key != md.key.previous_key {
                handler.key_sig(measure, mtt.tick(measure, 0), md.key.key);
                emitted = true;
            }
        }
    }
    if !emitted {
        handler.key_sig(0, 0, 0);
    }
}

fn convert_track_header(track: &Track, number: usize, handler: &mut dyn EventHandler) {
    let voices = track.voices.iter().take(usize::from(track.voice_count));

    let mut patches: BTreeMap<u8, i32> = BTreeMap::new();
    let mut pans: BTreeMap<u8, i32> = BTreeMap::new();
    let mut volumes: BTreeMap<u8, i32> = BTreeMap::new();
    let mut channel = 0;
    let mut volume = 100;

    for voice in voices {
        if voice.patch != -1 {
            patches.insert(voice.channel, voice.patch);
        }
        pans.insert(voice.channel, voice.pan);
        if voice.volume != -1 {
            volumes.insert(voice.channel, voice.volume);
        }
        channel = voice.channel;
        volume = voice.volume;
    }

    let patch = patches.values().next().copied().unwrap_or(track.patch);
    let info = TrackInfo {
        name: track.name.clone(),
        channel,
        volume,
        pan: pans.get(&channel).copied().unwrap_or(0),
        patch: midi_byte(patch),
    };
    handler.track(number, &info);

    let mut last_pan = PAN_CENTER;
    for &pan in pans.values() {
        if pan != 0 && pan != last_pan {
            handler.controller(number, 0, channel, CC_PAN, midi_byte(pan));
        }
        last_pan = pan;
    }
    for &volume in volumes.values() {
        handler.controller(number, 0, channel, CC_VOLUME, midi_byte(volume));
    }

    handler.controller(number, 0, channel, CC_BANK, 0);
    handler.program(number, 0, channel, info.patch);
}

/// Output track number, measure and the measure's first tick.
struct Cell {
    track: usize,
    measure: usize,
    measure_tick: i32,
}

fn convert_measure(
    score: &Score,
    track: &Track,
    md: &MeasureData,
    cell: &Cell,
    transpose: i32,
    handler: &mut dyn EventHandler,
) {
    for container in &md.containers {
        let voice = track.voices.get(usize::from(container.voice));
        let channel = voice.map_or(0, |v| v.channel);
        let pitch_shift = voice.map_or(0, |v| v.pitch_shift) - transpose;
        convert_notes(score.quarter, cell, container, channel, pitch_shift, handler);
    }

    let channel = track.voices.first().map_or(0, |v| v.channel);

    for midi in &md.midi {
        let tick = clamp_tick(cell.measure_tick + midi.tick);
        match midi.kind {
            MidiKind::Controller { controller, value } => {
                handler.controller(cell.track, tick, channel, controller, value)
            }
            MidiKind::ProgramChange { patch } => handler.program(cell.track, tick, channel, patch),
            MidiKind::ChannelPressure { pressure } => {
                handler.pressure(cell.track, tick, channel, pressure)
            }
            MidiKind::PitchWheel { value } => handler.pitch_bend(cell.track, tick, channel, value),
        }
    }

    for data in &md.music {
        let tick = clamp_tick(cell.measure_tick + data.tick);
        match &data.kind {
            MusicKind::Lyric(lyric) => handler.text(cell.track, tick, &lyric.text),
            MusicKind::Dynamics(dynamics) => {
                handler.controller(cell.track, tick, channel, CC_VOLUME, dynamics.velocity.min(127))
            }
            MusicKind::Decorator(decorator) if decorator.decorator_type == DecoratorType::Articulation => {
                if let Some(value) = sustain_value(decorator.articulation) {
                    handler.controller(cell.track, tick, channel, CC_SUSTAIN, value);
                }
            }
            _ => {}
        }
    }

    log::trace!("converted measure {} of track {}", cell.measure, cell.track);
}

fn sustain_value(art: ArticulationType) -> Option<u8> {
    match art {
        ArticulationType::PedalDown => Some(64),
        ArticulationType::PedalUp => Some(0),
        _ => None,
    }
}

fn convert_notes(
    quarter: i32,
    cell: &Cell,
    container: &NoteContainer,
    channel: u8,
    pitch_shift: i32,
    handler: &mut dyn EventHandler,
) {
    if container.is_rest {
        return;
    }
    let notes = &container.notes;
    let type_ticks = container.note_type.ticks(quarter);

    // tremolos replace the written note with repeated short notes
    let mut tremolo = false;
    for art in &container.articulations {
        let Some(count) = art.art_type.tremolo_count() else { continue };
        let step = type_ticks / count;
        for note in notes.iter().filter(|n| n.has_note_on()) {
            let pitch = midi_byte(i32::from(note.note) + container.note_shift + pitch_shift);
            let velocity = midi_byte(i32::from(note.on_velocity));
            let start = cell.measure_tick + container.tick + note.offset_tick;
            for k in 0..count {
                handler.note_on(cell.track, clamp_tick(start + k * step), channel, pitch, velocity);
                if k < count - 1 || note.has_note_off() {
                    handler.note_off(cell.track, clamp_tick(start + (k + 1) * step), channel, pitch, velocity);
                }
            }
        }
        tremolo = true;
    }
    if tremolo {
        return;
    }

    let chord = notes.len() as i32;
    for (i, note) in notes.iter().enumerate() {
        let pitch = midi_byte(i32::from(note.note) + container.note_shift + pitch_shift);
        let mut velocity = i32::from(note.on_velocity);
        let mut start = clamp_tick(cell.measure_tick + container.tick + note.offset_tick);
        let mut length = container.length;

        if note.has_note_on() {
            for art in &container.articulations {
                if art.change_length {
                    length = type_ticks * art.length_percentage / 100;
                }
                if art.change_velocity {
                    velocity = match art.velocity_type {
                        VelocityType::Offset => velocity + art.velocity_value,
                        VelocityType::Percentage => velocity * art.velocity_value / 100,
                        VelocityType::SetValue => art.velocity_value,
                    };
                }
                match art.art_type {
                    ArticulationType::PedalDown | ArticulationType::PedalUp => {
                        let value = sustain_value(art.art_type).unwrap_or(0);
                        handler.controller(cell.track, start, channel, CC_SUSTAIN, value);
                    }
                    ArticulationType::Arpeggio => {
                        let spread = art.sound_effect.0.abs() + art.sound_effect.1.abs();
                        start -= (spread / chord) * (chord - i as i32 - 1);
                    }
                    _ => {}
                }
            }
            handler.note_on(cell.track, clamp_tick(start), channel, pitch, midi_byte(velocity));
        }

        if note.has_note_off() {
            handler.note_off(cell.track, clamp_tick(start + length), channel, pitch, midi_byte(velocity));
        }
    }
}

fn clamp_tick(tick: i32) -> i32 {
    tick.max(0)
}

fn midi_byte(value: i32) -> u8 {
    value.clamp(0, 127) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Articulation, FormatVersion, KeySignature, Measure, MidiData, MusicData, Note, Tempo,
        TIE_LEFT_END, TIE_RIGHT_END,
    };

    fn score(measures: usize) -> Score {
        let mut score = Score::new(FormatVersion::V4);
        let mut track = Track { name: "Piano".into(), voice_count: 1, ..Default::default() };
        track.voices[0].channel = 2;
        score.tracks = vec![track];
        score.measures = (0..measures).map(Measure::new).collect();
        score.measure_data = vec![MeasureData::default(); measures];
        score.part_staff_counts = vec![1];
        score
    }

    fn chord(tick: i32, pitches: &[u8]) -> NoteContainer {
        NoteContainer {
            tick,
            length: 480,
            notes: pitches.iter().map(|&note| Note { note, ..Default::default() }).collect(),
            ..Default::default()
        }
    }

    fn run(score: &Score) -> Vec<Event> {
        let mut log = EventLog::new();
        convert(score, &mut log, &ConvertOptions::default());
        log.events
    }

    #[test]
    fn stream_has_header_conductor_and_end() {
        let mut score = score(2);
        score.measures[1].type_tempo = 120.0;
        let events = run(&score);
        assert_eq!(events[0], Event::Header { quarter: 480, track_count: 1 });
        assert!(events.contains(&Event::Tempo { tick: 0, tempo: 9600 }));
        assert!(events.contains(&Event::Tempo { tick: 1920, tempo: 12000 }));
        assert!(events.contains(&Event::TimeSig { measure: 0, tick: 0, numerator: 4, denominator: 4 }));
        assert!(events.contains(&Event::KeySig { measure: 0, tick: 0, key: 0 }));
        assert_eq!(events.last(), Some(&Event::EndOfFile));
    }

    #[test]
    fn notes_land_on_absolute_ticks() {
        let mut score = score(2);
        score.measure_data[1].containers = vec![chord(240, &[60, 64])];
        let events = run(&score);
        let on: Vec<_> = events.iter().filter(|e| matches!(e, Event::NoteOn { .. })).collect();
        assert_eq!(on.len(), 2);
        assert!(events.contains(&Event::NoteOn { track: 0, tick: 2160, channel: 2, pitch: 64, velocity: 0x50 }));
        assert!(events.contains(&Event::NoteOff { track: 0, tick: 2640, channel: 2, pitch: 60, velocity: 0x50 }));
    }

    #[test]
    fn ties_suppress_inner_events() {
        let mut score = score(1);
        let mut first = chord(0, &[60]);
        first.notes[0].tie_pos = TIE_LEFT_END;
        let mut second = chord(480, &[60]);
        second.notes[0].tie_pos = TIE_RIGHT_END;
        score.measure_data[0].containers = vec![first, second];
        let events = run(&score);
        let notes: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, Event::NoteOn { .. } | Event::NoteOff { .. }))
            .collect();
        assert_eq!(
            notes,
            vec![
                &Event::NoteOn { track: 0, tick: 0, channel: 2, pitch: 60, velocity: 0x50 },
                &Event::NoteOff { track: 0, tick: 960, channel: 2, pitch: 60, velocity: 0x50 },
            ]
        );
    }

    #[test]
    fn tremolo_repeats_the_note() {
        let mut score = score(1);
        let mut c = chord(0, &[67]);
        c.articulations.push(Articulation { art_type: ArticulationType::TremoloSixteenth, ..Default::default() });
        score.measure_data[0].containers = vec![c];
        let log = {
            let mut log = EventLog::new();
            convert(&score, &mut log, &ConvertOptions::default());
            log
        };
        let ticks: Vec<i32> = log
            .notes_on()
            .map(|e| match e {
                Event::NoteOn { tick, .. } => *tick,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ticks, vec![0, 120, 240, 360]);
    }

    #[test]
    fn articulation_overrides_length_and_velocity() {
        let mut score = score(1);
        let mut c = chord(0, &[60]);
        c.articulations.push(Articulation {
            art_type: ArticulationType::Staccato,
            change_length: true,
            length_percentage: 50,
            change_velocity: true,
            velocity_type: VelocityType::Offset,
            velocity_value: 10,
            ..Default::default()
        });
        score.measure_data[0].containers = vec![c];
        let events = run(&score);
        assert!(events.contains(&Event::NoteOn { track: 0, tick: 0, channel: 2, pitch: 60, velocity: 0x5A }));
        assert!(events.contains(&Event::NoteOff { track: 0, tick: 240, channel: 2, pitch: 60, velocity: 0x5A }));
    }

    #[test]
    fn raw_midi_and_tempo_marks() {
        let mut score = score(1);
        score.measure_data[0].midi.push(MidiData { tick: 100, kind: MidiKind::Controller { controller: 11, value: 90 } });
        let mut tempo = MusicData::new(MusicKind::Tempo(Tempo { type_tempo: 60, ..Default::default() }));
        tempo.tick = 960;
        score.measure_data[0].music.push(tempo);
        let events = run(&score);
        assert!(events.contains(&Event::Controller { track: 0, tick: 100, channel: 2, controller: 11, value: 90 }));
        assert!(events.contains(&Event::Tempo { tick: 960, tempo: 6000 }));
    }

    #[test]
    fn key_changes_are_reported() {
        let mut score = score(3);
        score.measure_data[0].key = KeySignature { key: 2, previous_key: 2, set: false, symbol_count: 0 };
        score.measure_data[2].key = KeySignature { key: -1, previous_key: 2, set: true, symbol_count: 0 };
        let keys: Vec<_> = run(&score).into_iter().filter(|e| matches!(e, Event::KeySig { .. })).collect();
        assert_eq!(
            keys,
            vec![
                Event::KeySig { measure: 0, tick: 0, key: 2 },
                Event::KeySig { measure: 2, tick: 3840, key: -1 },
            ]
        );
    }

    #[test]
    fn measure_range_limits_notes() {
        let mut score = score(3);
        for md in &mut score.measure_data {
            md.containers = vec![chord(0, &[72])];
        }
        let mut log = EventLog::new();
        convert(&score, &mut log, &ConvertOptions { begin_measure: 1, end_measure: Some(2) });
        assert_eq!(log.notes_on().count(), 1);
    }
}
