//! Second pass over a decoded score.
//!
//! Groups tracks into parts, propagates keys and clefs, closes note
//! containers, renumbers voices and resolves elements that span measures:
//! relative stop measures become absolute, stop measures receive a
//! [`MusicRef`] back to the owning element, and octave shifts, wedges and
//! tuplet-bearing beams produce the elements they imply.
//!
//! Nothing here fails. A spanning element whose stop measure does not exist
//! stays in its start measure without a stop reference.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::model::{
    GroupType, MeasureData, MeasurePos, MusicData, MusicKind, MusicRef, NoteType,
    OctaveShiftEndPoint, OctaveShiftPosition, Score, Tuplet, WedgeEndPoint, WedgeType,
};
use crate::tables::tuplet_to_space;

/// Run every organizer pass over `score`.
pub fn organize(score: &mut Score) {
    organize_tracks(score);
    organize_attributes(score);

    let voices = voice_tables(score);
    for part in 0..score.part_count() {
        for staff in 0..score.staff_count(part) {
            let Some(track) = score.part_staff_to_track(part, staff) else { continue };
            organize_track(score, track, &voices[track]);
            synthesize_tuplets(score, track);
        }
    }

    debug!(
        "organized {} tracks into {} parts over {} measures",
        score.track_count(),
        score.part_count(),
        score.measure_count()
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Parts, keys and clefs
// ═══════════════════════════════════════════════════════════════════════

/// A brace around one following staff on the first line joins two tracks
/// into one part.
fn organize_tracks(score: &mut Score) {
    let track_count = score.track_count();
    let first_line = score.lines.first();
    let joins_next = |track: usize| {
        first_line
            .and_then(|line| line.staves.get(track))
            .is_some_and(|s| s.group_type == GroupType::Brace && s.group_staff_count == 1)
    };

    let mut counts = Vec::new();
    let mut track = 0;
    while track < track_count {
        let staves = if joins_next(track) { 2 } else { 1 };
        counts.push(staves.min(track_count - track));
        track += staves;
    }
    score.part_staff_counts = counts;

    for track in 0..track_count {
        let (part, staff) = score.track_to_part_staff(track);
        score.tracks[track].part = part;
        score.tracks[track].staff = staff;
    }
}

fn organize_attributes(score: &mut Score) {
    let Some(line) = score.lines.first() else { return };
    let staves: Vec<_> = line.staves.iter().map(|s| (s.key, s.clef)).collect();
    let measure_count = score.measure_count();

    for (track, (staff_key, staff_clef)) in staves.into_iter().enumerate() {
        let mut last_key = staff_key;
        let mut last_clef = staff_clef;

        for measure in 0..measure_count {
            let Some(md) = score.measure_data_mut(track, measure) else { continue };

            let key = &mut md.key;
            if measure == 0 || !key.set {
                key.key = last_key;
                key.previous_key = last_key;
            } else {
                last_key = key.key;
            }

            md.clef = last_clef;
            for data in &md.music {
                if let MusicKind::Clef(change) = &data.kind {
                    last_clef = change.clef;
                }
            }
        }
    }
}

/// Dense, ordered voice numbers per track, computed over the whole piece.
fn voice_tables(score: &Score) -> Vec<BTreeMap<u8, u8>> {
    (0..score.track_count())
        .map(|track| {
            let used: BTreeSet<u8> = (0..score.measure_count())
                .filter_map(|m| score.measure_data(track, m))
                .flat_map(|md| md.containers.iter().map(|c| c.voice))
                .collect();
            used.into_iter().zip(0u8..).collect()
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Measures
// ═══════════════════════════════════════════════════════════════════════

fn organize_track(score: &mut Score, track: usize, voices: &BTreeMap<u8, u8>) {
    let units: Vec<i32> = score.measures.iter().map(|m| m.time.units).collect();
    let quarter = score.quarter;

    for measure in 0..units.len() {
        if let Some(md) = score.measure_data_mut(track, measure) {
            organize_containers(md, measure, units[measure], voices);
            organize_music(md, measure, voices);
        }
    }

    for measure in 0..units.len() {
        let Some(md) = score.measure_data_mut(track, measure) else { continue };

        let mut stops = Vec::new();
        let mut points = Vec::new();
        for (index, data) in md.music.iter_mut().enumerate() {
            if !data.is_cross_measure() {
                continue;
            }
            let stop = data.stop.measure as usize;
            if stop != measure {
                stops.push((stop, MusicRef { track, measure, index }));
            }
            if matches!(data.kind, MusicKind::Wedge(_)) {
                points.extend(wedge_points(data, &units));
            }
            if let MusicKind::Beam(beam) = &mut data.kind {
                for line in beam.lines.iter_mut() {
                    line.start.measure += measure as i32;
                    line.stop.measure += measure as i32;
                }
            }
        }

        anchor_tuplets(md, quarter);
        apply_octave_shifts(md);

        for (stop, r) in stops {
            match score.measure_data_mut(track, stop) {
                Some(dest) => dest.stop_refs.push(r),
                None => warn!("track {track}: element in measure {measure} stops in missing measure {stop}"),
            }
        }
        for (at, point) in points {
            if let Some(dest) = score.measure_data_mut(track, at) {
                dest.music.push(point);
            }
        }
    }
}

/// Close each container at the next one's offset, or at the end of the
/// measure, and renumber voices.
fn organize_containers(md: &mut MeasureData, measure: usize, units: i32, voices: &BTreeMap<u8, u8>) {
    let starts: Vec<i32> = md.containers.iter().map(|c| c.start.offset).collect();
    for (i, c) in md.containers.iter_mut().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(units);
        c.start.measure = measure as i32;
        c.stop = MeasurePos::new(measure as i32, end);
        if let Some(&v) = voices.get(&c.voice) {
            c.voice = v;
        }
    }
}

/// Stamp the measure index on every element; relative stop measures
/// become absolute.
fn organize_music(md: &mut MeasureData, measure: usize, voices: &BTreeMap<u8, u8>) {
    for data in md.music.iter_mut() {
        let span = data.stop.measure;
        data.start.measure = measure as i32;
        data.stop.measure = measure as i32 + span;
        if let Some(&v) = voices.get(&data.voice) {
            data.voice = v;
        }
    }
}

/// Take each tuplet's duration class from the container at its tick and
/// move a tuplet that starts off its grid back to the container that
/// opens the group.
fn anchor_tuplets(md: &mut MeasureData, quarter: i32) {
    let containers = &md.containers;
    for data in md.music.iter_mut() {
        let MusicKind::Tuplet(tuplet) = &mut data.kind else { continue };

        let tick = data.tick;
        if let Some(c) = containers.iter().take_while(|c| c.tick <= tick).filter(|c| c.tick == tick).last() {
            tuplet.note_type = c.note_type;
        }

        let grid = tuplet.note_type.ticks(quarter) * tuplet.space;
        if grid <= 0 || tick % grid == 0 {
            continue;
        }
        let anchor = tick / grid * grid;
        if let Some(c) = containers
            .iter()
            .filter(|c| c.tick == anchor && i32::from(c.tuplet) == tuplet.tuplet)
            .last()
        {
            data.tick = c.tick;
            data.start.offset = c.start.offset;
        }
    }
}

/// Shift the containers under each octave shift and emit its endpoints.
fn apply_octave_shifts(md: &mut MeasureData) {
    let mut points = Vec::new();

    for data in md.music.iter() {
        let MusicKind::OctaveShift(shift) = &data.kind else { continue };

        let semitones = shift.shift_type.note_shift();
        for c in md.containers.iter_mut() {
            if data.tick <= c.tick && c.tick < shift.end_tick {
                c.note_shift = semitones;
            }
        }

        for (i, &position) in shift.positions.iter().enumerate() {
            let mut point = MusicData::new(MusicKind::OctaveShiftEndPoint(OctaveShiftEndPoint {
                shift_type: shift.shift_type,
                position,
                end_tick: shift.end_tick,
            }))
            .with_common(data);
            if i > 0 || position == OctaveShiftPosition::Stop {
                point.start.offset = data.start.offset + shift.length;
                point.stop = point.start;
            }
            if i > 0 {
                point.tick = shift.end_tick;
            }
            points.push(point);
        }
    }

    md.music.extend(points);
}

/// Endpoints of a wedge with the measures they belong in. A double wedge
/// pivots at the tick-weighted middle of its span.
fn wedge_points(data: &MusicData, units: &[i32]) -> Vec<(usize, MusicData)> {
    let MusicKind::Wedge(wedge) = &data.kind else { return Vec::new() };
    let line = match wedge.wedge_type {
        WedgeType::DoubleLine => WedgeType::CresLine,
        other => other,
    };
    let point = |wedge_type, wedge_start, offset| {
        let mut p = MusicData::new(MusicKind::WedgeEndPoint(WedgeEndPoint {
            wedge_type,
            wedge_start,
            height: wedge.height,
        }))
        .with_common(data);
        p.start.offset = offset;
        p.stop = p.start;
        p
    };

    let start = data.start.measure as usize;
    let stop = data.stop.measure as usize;
    let mut points = vec![(start, point(line, true, data.start.offset))];
    if stop >= units.len() {
        return points;
    }

    let mut stop_point = point(line, false, data.stop.offset);
    stop_point.start.measure = stop as i32;
    stop_point.stop = stop_point.start;

    if wedge.wedge_type == WedgeType::DoubleLine {
        let (middle, offset) = middle_of(units, data.start, data.stop);
        for (wedge_type, wedge_start) in [(WedgeType::CresLine, false), (WedgeType::DecrescLine, true)] {
            let mut p = point(wedge_type, wedge_start, offset);
            p.start.measure = middle as i32;
            p.stop = p.start;
            points.push((middle, p));
        }
    }

    points.push((stop, stop_point));
    points
}

/// Halfway point between two positions, measured in placement units.
fn middle_of(units: &[i32], from: MeasurePos, to: MeasurePos) -> (usize, i32) {
    let first = from.measure as usize;
    let last = to.measure as usize;
    let total: i32 = units[first..last].iter().sum::<i32>() - from.offset + to.offset;

    let mut remaining = total / 2;
    let mut measure = first;
    let mut pos = from.offset;
    while measure < last && pos + remaining >= units[measure] {
        remaining -= units[measure] - pos;
        measure += 1;
        pos = 0;
    }
    (measure, pos + remaining)
}

// ═══════════════════════════════════════════════════════════════════════
// Tuplets implied by beams
// ═══════════════════════════════════════════════════════════════════════

/// A beam carrying a tuplet hint gets a tuplet over its span unless one
/// was written there.
fn synthesize_tuplets(score: &mut Score, track: usize) {
    let measure_count = score.measure_count();

    let written: Vec<(MeasurePos, MeasurePos)> = (0..measure_count)
        .filter_map(|m| score.measure_data(track, m))
        .flat_map(|md| md.music.iter())
        .filter(|d| matches!(d.kind, MusicKind::Tuplet(_)))
        .map(|d| (d.start, d.stop))
        .collect();

    for measure in 0..measure_count {
        let Some(md) = score.measure_data_mut(track, measure) else { continue };

        let mut created = Vec::new();
        for beam_data in md.music.iter() {
            let MusicKind::Beam(beam) = &beam_data.kind else { continue };
            let Some(hint) = beam.lines.iter().map(|l| l.tuplet).find(|&t| t > 0) else { continue };

            let (from, to) = (beam_data.start, beam_data.stop);
            if written.iter().any(|&(s, e)| s <= to && from <= e) {
                continue;
            }

            let note_type = md
                .containers
                .iter()
                .find(|c| c.tick == beam_data.tick)
                .map_or(NoteType::Quarter, |c| c.note_type);
            let tuplet = Tuplet {
                tuplet: i32::from(hint),
                space: tuplet_to_space(i32::from(hint)),
                note_type,
                synthesized: true,
                ..Default::default()
            };
            let mut data = MusicData::new(MusicKind::Tuplet(tuplet)).with_common(beam_data);
            data.stop = to;
            created.push(data);
        }
        if created.is_empty() {
            continue;
        }
        debug!("track {track}, measure {measure}: {} tuplet(s) taken from beams", created.len());

        let first = md.music.len();
        let stops: Vec<usize> = created.iter().map(|d| d.stop.measure as usize).collect();
        md.music.extend(created);

        for (i, stop) in stops.into_iter().enumerate() {
            if stop == measure {
                continue;
            }
            if let Some(dest) = score.measure_data_mut(track, stop) {
                dest.stop_refs.push(MusicRef { track, measure, index: first + i });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Beam, BeamLine, FormatVersion, Line, Measure, NoteContainer, OctaveShift, OctaveShiftType,
        Staff, Track, Wedge,
    };

    fn score(tracks: usize, measures: usize) -> Score {
        let mut score = Score::new(FormatVersion::V4);
        score.tracks = vec![Track::default(); tracks];
        score.measures = (0..measures).map(Measure::new).collect();
        score.measure_data = vec![MeasureData::default(); tracks * measures];
        score
    }

    fn container(tick: i32, offset: i32, voice: u8) -> NoteContainer {
        NoteContainer { tick, start: MeasurePos::new(0, offset), voice, ..Default::default() }
    }

    fn at(kind: MusicKind, tick: i32, offset: i32, span: i32, stop_offset: i32) -> MusicData {
        let mut d = MusicData::new(kind);
        d.tick = tick;
        d.start = MeasurePos::new(0, offset);
        d.stop = MeasurePos::new(span, stop_offset);
        d
    }

    #[test]
    fn brace_joins_two_tracks() {
        let mut s = score(3, 1);
        let mut line = Line::default();
        line.staves = vec![
            Staff { group_type: GroupType::Brace, group_staff_count: 1, ..Default::default() },
            Staff::default(),
            Staff::default(),
        ];
        s.lines.push(line);
        organize(&mut s);
        assert_eq!(s.part_staff_counts, vec![2, 1]);
        assert_eq!((s.tracks[1].part, s.tracks[1].staff), (0, 1));
        assert_eq!((s.tracks[2].part, s.tracks[2].staff), (1, 0));
    }

    #[test]
    fn containers_close_at_next_offset_and_voices_are_dense() {
        let mut s = score(1, 2);
        s.measure_data[0].containers = vec![container(0, 0, 3), container(480, 256, 5), container(960, 512, 3)];
        s.measure_data[1].containers = vec![container(0, 0, 5)];
        organize(&mut s);

        let cs = &s.measure_data[0].containers;
        assert_eq!(cs[0].stop.offset, 256);
        assert_eq!(cs[1].stop.offset, 512);
        assert_eq!(cs[2].stop.offset, s.measures[0].time.units);
        assert_eq!(cs.iter().map(|c| c.voice).collect::<Vec<_>>(), vec![0, 1, 0]);
        assert_eq!(s.measure_data[1].containers[0].voice, 1);
        assert_eq!(s.measure_data[1].containers[0].start.measure, 1);
    }

    #[test]
    fn keys_and_clefs_carry_forward() {
        use crate::model::{ClefChange, ClefType};
        let mut s = score(1, 3);
        let mut line = Line::default();
        line.staves = vec![Staff { key: 2, clef: ClefType::Bass, ..Default::default() }];
        s.lines.push(line);
        s.measure_data[1].key.set = true;
        s.measure_data[1].key.key = -1;
        s.measure_data[1].music.push(MusicData::new(MusicKind::Clef(ClefChange { clef: ClefType::Treble, line: 0 })));
        organize(&mut s);

        assert_eq!(s.measure_data[0].key.key, 2);
        assert_eq!(s.measure_data[1].key.key, -1);
        assert_eq!((s.measure_data[2].key.key, s.measure_data[2].key.previous_key), (-1, -1));
        assert_eq!(s.measure_data[0].clef, ClefType::Bass);
        assert_eq!(s.measure_data[1].clef, ClefType::Bass);
        assert_eq!(s.measure_data[2].clef, ClefType::Treble);
    }

    #[test]
    fn stop_measure_receives_back_reference() {
        let mut s = score(1, 3);
        s.measure_data[0].music.push(at(MusicKind::Slur(crate::model::Slur {
            show_on_top: true,
            note_time_percent: 100,
            shape: Default::default(),
            handle2: Default::default(),
            handle3: Default::default(),
        }), 0, 0, 2, 100));
        organize(&mut s);

        let r = MusicRef { track: 0, measure: 0, index: 0 };
        assert_eq!(s.measure_data[2].stop_refs, vec![r]);
        assert_eq!(s.resolve(&r).map(|d| d.stop), Some(MeasurePos::new(2, 100)));
        assert!(s.measure_data[1].stop_refs.is_empty());
    }

    #[test]
    fn missing_stop_measure_is_dropped() {
        let mut s = score(1, 2);
        s.measure_data[1].music.push(at(MusicKind::Tie(crate::model::Tie {
            note: 60,
            height: 0,
            shape: Default::default(),
        }), 0, 0, 5, 0));
        organize(&mut s);
        assert!(s.measure_data.iter().all(|md| md.stop_refs.is_empty()));
        assert_eq!(s.measure_data[1].music.len(), 1);
    }

    #[test]
    fn double_wedge_pivots_in_the_middle_measure() {
        let mut s = score(1, 3);
        let wedge = MusicKind::Wedge(Wedge { wedge_type: WedgeType::DoubleLine, height: 8 });
        s.measure_data[0].music.push(at(wedge, 0, 0, 2, 0));
        organize(&mut s);

        let points = |m: usize| -> Vec<(bool, WedgeType, i32)> {
            s.measure_data[m]
                .music
                .iter()
                .filter_map(|d| match &d.kind {
                    MusicKind::WedgeEndPoint(p) => Some((p.wedge_start, p.wedge_type, d.start.offset)),
                    _ => None,
                })
                .collect()
        };
        assert_eq!(points(0), vec![(true, WedgeType::CresLine, 0)]);
        assert_eq!(points(1), vec![(false, WedgeType::CresLine, 0), (true, WedgeType::DecrescLine, 0)]);
        assert_eq!(points(2), vec![(false, WedgeType::CresLine, 0)]);
    }

    #[test]
    fn middle_of_inside_one_measure() {
        assert_eq!(middle_of(&[1024, 1024], MeasurePos::new(0, 200), MeasurePos::new(0, 600)), (0, 400));
        assert_eq!(middle_of(&[1024, 1024], MeasurePos::new(0, 512), MeasurePos::new(1, 512)), (1, 0));
    }

    #[test]
    fn octave_shift_moves_enclosed_containers() {
        let mut s = score(1, 1);
        s.measure_data[0].containers = vec![container(0, 0, 0), container(480, 256, 0), container(960, 512, 0)];
        let shift = OctaveShift {
            shift_type: OctaveShiftType::Up8,
            positions: vec![OctaveShiftPosition::Start, OctaveShiftPosition::Stop],
            length: 256,
            end_tick: 960,
        };
        s.measure_data[0].music.push(at(MusicKind::OctaveShift(shift), 0, 0, 0, 0));
        organize(&mut s);

        let md = &s.measure_data[0];
        let shifts: Vec<i32> = md.containers.iter().map(|c| c.note_shift).collect();
        assert_eq!(shifts, vec![12, 12, 0]);
        let ends: Vec<(i32, i32)> = md
            .music
            .iter()
            .filter(|d| matches!(d.kind, MusicKind::OctaveShiftEndPoint(_)))
            .map(|d| (d.tick, d.start.offset))
            .collect();
        assert_eq!(ends, vec![(0, 0), (960, 256)]);
    }

    #[test]
    fn tuplet_is_reanchored_to_its_group() {
        let mut s = score(1, 1);
        s.measure_data[0].containers = [(0, 0), (320, 128), (480, 200)]
            .into_iter()
            .map(|(tick, offset)| NoteContainer {
                note_type: NoteType::Eighth,
                tuplet: 3,
                ..container(tick, offset, 0)
            })
            .collect();
        let tuplet = Tuplet { tuplet: 3, space: 2, ..Default::default() };
        s.measure_data[0].music.push(at(MusicKind::Tuplet(tuplet), 320, 128, 0, 300));
        organize(&mut s);

        let data = &s.measure_data[0].music[0];
        let MusicKind::Tuplet(t) = &data.kind else { panic!("not a tuplet") };
        assert_eq!(t.note_type, NoteType::Eighth);
        assert_eq!((data.tick, data.start.offset), (0, 0));
    }

    #[test]
    fn beam_hint_creates_one_tuplet() {
        let mut s = score(1, 2);
        let beam = Beam {
            grace: false,
            lines: vec![BeamLine { tuplet: 3, start: MeasurePos::new(0, 0), stop: MeasurePos::new(1, 0) }],
            shape: Default::default(),
        };
        s.measure_data[0].music.push(at(MusicKind::Beam(beam), 0, 0, 1, 0));
        organize(&mut s);

        let tuplets: Vec<&MusicData> = s.measure_data[0]
            .music
            .iter()
            .filter(|d| matches!(d.kind, MusicKind::Tuplet(_)))
            .collect();
        assert_eq!(tuplets.len(), 1);
        assert_eq!(tuplets[0].stop, MeasurePos::new(1, 0));
        let MusicKind::Tuplet(t) = &tuplets[0].kind else { unreachable!() };
        assert!(t.synthesized);
        assert_eq!((t.tuplet, t.space), (3, 2));
        assert_eq!(s.measure_data[1].stop_refs.len(), 2);
    }

    #[test]
    fn written_tuplet_suppresses_beam_hint() {
        let mut s = score(1, 1);
        let beam = Beam {
            grace: false,
            lines: vec![BeamLine { tuplet: 3, start: MeasurePos::new(0, 0), stop: MeasurePos::new(0, 300) }],
            shape: Default::default(),
        };
        s.measure_data[0].music.push(at(MusicKind::Beam(beam), 0, 0, 0, 300));
        s.measure_data[0].music.push(at(MusicKind::Tuplet(Tuplet::default()), 0, 0, 0, 300));
        organize(&mut s);
        let count = s.measure_data[0].music.iter().filter(|d| matches!(d.kind, MusicKind::Tuplet(_))).count();
        assert_eq!(count, 1);
    }
}
