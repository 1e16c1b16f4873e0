//! Overture 3 keeps lyric text in a separate `LYRC` chunk; the measures
//! only carry empty lyric slots. This pass fills the slots with words.

use log::debug;

use crate::model::{LyricInfo, MusicKind, Score};

/// Distribute the words of every lyric record over the lyric slots of its
/// track. Words without a matching slot are dropped.
pub fn associate_lyrics(score: &mut Score) {
    let infos = std::mem::take(&mut score.lyric_infos);
    for info in &infos {
        let placed = associate(score, info);
        debug!(
            "lyric '{}' on track {}: placed {placed} of {} words",
            info.name,
            info.track,
            info.words().len()
        );
    }
    score.lyric_infos = infos;
}

fn associate(score: &mut Score, info: &LyricInfo) -> usize {
    let words = info.words();
    let mut next = 0;
    let mut placed = 0;

    for measure in info.measure..score.measure_count() {
        if next >= words.len() {
            break;
        }
        let Some(md) = score.measure_data_mut(info.track, measure) else {
            break;
        };

        for container in md.containers.iter().filter(|c| !c.is_rest) {
            if next >= words.len() {
                break;
            }
            if container.voice != info.voice {
                continue;
            }
            for data in md.music.iter_mut() {
                if data.start.offset != container.start.offset {
                    continue;
                }
                let MusicKind::Lyric(lyric) = &mut data.kind else {
                    continue;
                };
                if lyric.verse != info.verse {
                    continue;
                }
                if let Some(word) = words.get(next) {
                    lyric.text = (*word).to_string();
                    data.voice = info.voice;
                    placed += 1;
                }
                next += 1;
            }
        }
    }

    placed
}
