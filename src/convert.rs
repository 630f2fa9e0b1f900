//! Whole-file pipelines: raw bytes or a path in, editable song or playback
//! sheet out, and back again.
//!
//! Each call owns its inputs and outputs; nothing is cached between
//! conversions, so concurrent callers never share state. Track extraction
//! fans out with rayon since tracks are independent.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use rayon::prelude::*;

use crate::{
    error::{EncodeError, ParseError},
    event::EventKind,
    notes::{bpm, extract_notes, song_tempo, ticks_to_ms, ExtractStats, Note},
    parse::{parse, MidiFile},
    sheet::{key_name, EditableSong, EditableTrack, PlaybackSheet, SheetNote, BITS_PER_PAGE},
};

/// Memory-map a MIDI file and parse it.
pub fn read_midi_file(path: &Path) -> Result<MidiFile, ParseError> {
    let file = File::open(path)?;
    // SAFETY: read-only mapping, dropped before this function returns.
    let mmap = unsafe { Mmap::map(&file)? };
    parse(&mmap)
}

/// Extract every track's notes, in parallel.
pub fn extract_all(file: &MidiFile) -> Vec<(Vec<Note>, ExtractStats)> {
    file.tracks.par_iter().map(extract_notes).collect()
}

/// Decoded file to the editable JSON form. Tracks that end up with no notes
/// are dropped, like the reference editor does.
pub fn editable_from_midi(file: &MidiFile) -> (EditableSong, ExtractStats) {
    let mut total = ExtractStats::default();
    let tracks: Vec<EditableTrack> = extract_all(file)
        .into_iter()
        .enumerate()
        .filter_map(|(track_index, (notes, stats))| {
            total.merge(&stats);
            (!notes.is_empty()).then_some(EditableTrack { track_index, notes })
        })
        .collect();

    if total.dropped() > 0 {
        log::warn!(
            "conversion dropped {} events ({} orphan note-offs, {} zero-length, {} dangling)",
            total.dropped(),
            total.unpaired_note_offs,
            total.zero_length,
            total.dangling_note_ons,
        );
    }

    (
        EditableSong {
            time_division: file.ticks_per_quarter,
            tracks,
        },
        total,
    )
}

/// Editable JSON form back to MIDI bytes.
pub fn midi_from_editable(song: &EditableSong) -> Result<Vec<u8>, EncodeError> {
    let tracks: Vec<Vec<Note>> = song.tracks.iter().map(|track| track.notes.clone()).collect();
    crate::encode(song.time_division, &tracks)
}

/// Decoded file to the lossy playback sheet for the 37-key grid player.
///
/// Works straight off note-on events: every note-on with positive velocity
/// whose pitch fits the keyboard becomes one sheet note at its absolute time
/// in milliseconds under the single derived tempo.
pub fn playback_sheet(file: &MidiFile, name: &str) -> PlaybackSheet {
    let tempo = song_tempo(file);
    let mut song_notes = Vec::new();

    for track in &file.tracks {
        let mut tick = 0u32;
        for event in &track.events {
            tick = tick.saturating_add(event.delta);
            if let EventKind::NoteOn { key, velocity, .. } = event.kind {
                if velocity > 0 {
                    if let Some(key) = key_name(key) {
                        song_notes.push(SheetNote {
                            time: ticks_to_ms(tick, tempo, file.ticks_per_quarter),
                            key,
                        });
                    }
                }
            }
        }
    }

    song_notes.sort_by_key(|note| note.time);
    PlaybackSheet {
        name: name.to_string(),
        bpm: bpm(tempo),
        bits_per_page: BITS_PER_PAGE,
        pitch_level: 0,
        song_notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(pitch: u8, start: u32, duration: u32) -> Note {
        Note {
            pitch,
            start_tick: start,
            duration_ticks: duration,
            velocity: 80,
            channel: 0,
        }
    }

    fn two_track_file() -> MidiFile {
        let bytes = crate::encode(
            480,
            &[
                vec![note(60, 0, 480), note(64, 480, 480)],
                vec![note(72, 240, 240)],
            ],
        )
        .unwrap();
        parse(&bytes).unwrap()
    }

    #[test]
    fn editable_form_keeps_all_tracks_with_notes() {
        let file = two_track_file();
        let (song, stats) = editable_from_midi(&file);
        assert_eq!(song.time_division, 480);
        assert_eq!(song.tracks.len(), 2);
        assert_eq!(song.tracks[0].notes.len(), 2);
        assert_eq!(song.tracks[1].notes.len(), 1);
        assert_eq!(stats.dropped(), 0);
    }

    #[test]
    fn empty_tracks_are_dropped_from_editable_form() {
        let bytes = crate::encode(480, &[vec![], vec![note(60, 0, 100)]]).unwrap();
        let file = parse(&bytes).unwrap();
        let (song, _) = editable_from_midi(&file);
        assert_eq!(song.tracks.len(), 1);
        assert_eq!(song.tracks[0].track_index, 1);
    }

    #[test]
    fn editable_round_trip_preserves_notes() {
        let file = two_track_file();
        let (song, _) = editable_from_midi(&file);
        let bytes = midi_from_editable(&song).unwrap();
        let (song_again, _) = editable_from_midi(&parse(&bytes).unwrap());
        assert_eq!(song_again, song);
    }

    #[test]
    fn playback_sheet_filters_and_orders() {
        // Pitches 40 and 90 fall outside the 37-key range.
        let bytes = crate::encode(
            480,
            &[vec![
                note(90, 0, 100),
                note(84, 960, 100),
                note(48, 480, 100),
                note(40, 0, 100),
            ]],
        )
        .unwrap();
        let sheet = playback_sheet(&parse(&bytes).unwrap(), "demo");
        assert_eq!(sheet.name, "demo");
        assert_eq!(sheet.bpm, 120);
        assert_eq!(sheet.bits_per_page, 16);
        assert_eq!(sheet.pitch_level, 0);
        let keys: Vec<&str> = sheet.song_notes.iter().map(|n| n.key.as_str()).collect();
        assert_eq!(keys, vec!["1Key1", "1Key37"]);
        // 480 ticks at default tempo and 480 tpq is half a second.
        assert_eq!(sheet.song_notes[0].time, 500);
        assert_eq!(sheet.song_notes[1].time, 1000);
    }
}
