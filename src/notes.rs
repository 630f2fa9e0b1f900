//! Note pairing and tempo derivation.
//!
//! The extractor walks a decoded track, accumulating absolute ticks, and
//! pairs each note-on with the nearest following unmatched note-off (or
//! note-on with velocity 0) for the same pitch and channel. Everything it
//! drops (orphan note-offs, zero-length notes, notes still sounding at the
//! end of the track) is counted in [`ExtractStats`] rather than silently
//! discarded.

use serde::{Deserialize, Serialize};

use crate::{
    event::EventKind,
    parse::{MidiFile, Track},
};

/// Default tempo when a file carries no Set Tempo meta event: 120 BPM.
pub const DEFAULT_TEMPO_MICROS: u32 = 500_000;

/// One sounding note with absolute, track-relative timing in ticks.
///
/// Serde field names follow the editor JSON shape: `note`, `time`,
/// `duration`, `velocity`, `channel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "note")]
    pub pitch: u8,
    #[serde(rename = "time")]
    pub start_tick: u32,
    #[serde(rename = "duration")]
    pub duration_ticks: u32,
    pub velocity: u8,
    #[serde(default)]
    pub channel: u8,
}

/// Counts of events the extractor had to drop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// Note-offs with no pending note-on for that pitch and channel.
    pub unpaired_note_offs: u32,
    /// Note-ons that arrived while the same pitch and channel was already
    /// sounding; the earlier note was closed at the new start tick.
    pub retriggered: u32,
    /// Notes discarded because their computed duration was zero.
    pub zero_length: u32,
    /// Notes still pending at end of track, discarded as unterminated.
    pub dangling_note_ons: u32,
}

impl ExtractStats {
    pub fn merge(&mut self, other: &ExtractStats) {
        self.unpaired_note_offs += other.unpaired_note_offs;
        self.retriggered += other.retriggered;
        self.zero_length += other.zero_length;
        self.dangling_note_ons += other.dangling_note_ons;
    }

    /// Total events that did not become part of a note.
    pub fn dropped(&self) -> u32 {
        self.unpaired_note_offs + self.zero_length + self.dangling_note_ons
    }
}

/// Extract the notes of one track, ordered by start tick.
pub fn extract_notes(track: &Track) -> (Vec<Note>, ExtractStats) {
    // Pending note-on per (channel, pitch).
    let mut pending = [[None::<(u32, u8)>; 128]; 16];
    let mut notes = Vec::new();
    let mut stats = ExtractStats::default();
    let mut tick = 0u32;

    for event in &track.events {
        tick = tick.saturating_add(event.delta);
        match event.kind {
            EventKind::NoteOn {
                channel,
                key,
                velocity,
            } if velocity > 0 => {
                let slot = &mut pending[usize::from(channel & 0x0F)][usize::from(key & 0x7F)];
                if let Some((start, prev_velocity)) = slot.take() {
                    // Retrigger: close the earlier note at the new start.
                    stats.retriggered += 1;
                    push_note(&mut notes, &mut stats, key, channel, start, tick, prev_velocity);
                }
                *slot = Some((tick, velocity));
            }
            EventKind::NoteOn { channel, key, .. } | EventKind::NoteOff { channel, key, .. } => {
                let slot = &mut pending[usize::from(channel & 0x0F)][usize::from(key & 0x7F)];
                match slot.take() {
                    Some((start, velocity)) => {
                        push_note(&mut notes, &mut stats, key, channel, start, tick, velocity)
                    }
                    None => stats.unpaired_note_offs += 1,
                }
            }
            _ => {}
        }
    }

    // Notes never turned off represent unterminated sounds; drop them.
    for channel in &pending {
        for slot in channel {
            if slot.is_some() {
                stats.dangling_note_ons += 1;
            }
        }
    }

    // Notes are completed at note-off time, so nested notes finish out of
    // start order. Stable sort restores it, keeping note-off order for
    // simultaneous starts.
    notes.sort_by_key(|note| note.start_tick);

    if stats.dropped() > 0 {
        log::debug!(
            "track extraction dropped events: {} orphan note-offs, {} zero-length, {} dangling",
            stats.unpaired_note_offs,
            stats.zero_length,
            stats.dangling_note_ons,
        );
    }

    (notes, stats)
}

fn push_note(
    notes: &mut Vec<Note>,
    stats: &mut ExtractStats,
    key: u8,
    channel: u8,
    start: u32,
    end: u32,
    velocity: u8,
) {
    let duration = end.saturating_sub(start);
    if duration == 0 {
        stats.zero_length += 1;
        return;
    }
    notes.push(Note {
        pitch: key & 0x7F,
        start_tick: start,
        duration_ticks: duration,
        velocity,
        channel: channel & 0x0F,
    });
}

/// Derive the single global tempo: the first Set Tempo meta event across all
/// tracks when flattened by absolute tick, or [`DEFAULT_TEMPO_MICROS`].
pub fn song_tempo(file: &MidiFile) -> u32 {
    let mut best: Option<(u32, u32)> = None;
    for track in &file.tracks {
        let mut tick = 0u32;
        for event in &track.events {
            tick = tick.saturating_add(event.delta);
            if let EventKind::Meta { kind: 0x51, data } = &event.kind {
                if data.len() >= 3 {
                    let micros =
                        u32::from(data[0]) << 16 | u32::from(data[1]) << 8 | u32::from(data[2]);
                    // Ties keep the earlier track, matching a stable
                    // flatten-and-sort by tick.
                    if micros > 0 && best.map_or(true, |(best_tick, _)| tick < best_tick) {
                        best = Some((tick, micros));
                    }
                    break;
                }
            }
        }
    }
    best.map_or(DEFAULT_TEMPO_MICROS, |(_, micros)| micros)
}

/// Beats per minute for display, rounded.
pub fn bpm(tempo_micros: u32) -> u32 {
    (60_000_000.0 / f64::from(tempo_micros)).round() as u32
}

/// Absolute tick to milliseconds under a single global tempo.
pub fn ticks_to_ms(tick: u32, tempo_micros: u32, ticks_per_quarter: u16) -> u64 {
    let ms_per_tick = f64::from(tempo_micros) / f64::from(ticks_per_quarter) / 1000.0;
    (f64::from(tick) * ms_per_tick).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TimedEvent;

    fn on(delta: u32, key: u8, velocity: u8) -> TimedEvent {
        TimedEvent {
            delta,
            kind: EventKind::NoteOn {
                channel: 0,
                key,
                velocity,
            },
        }
    }

    fn off(delta: u32, key: u8) -> TimedEvent {
        TimedEvent {
            delta,
            kind: EventKind::NoteOff {
                channel: 0,
                key,
                velocity: 0,
            },
        }
    }

    #[test]
    fn pairs_on_with_following_off() {
        let track = Track {
            events: vec![on(0, 60, 80), off(480, 60)],
        };
        let (notes, stats) = extract_notes(&track);
        assert_eq!(
            notes,
            vec![Note {
                pitch: 60,
                start_tick: 0,
                duration_ticks: 480,
                velocity: 80,
                channel: 0,
            }]
        );
        assert_eq!(stats, ExtractStats::default());
    }

    #[test]
    fn note_on_velocity_zero_acts_as_off() {
        let track = Track {
            events: vec![on(0, 72, 100), on(96, 72, 0)],
        };
        let (notes, _) = extract_notes(&track);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].duration_ticks, 96);
        assert_eq!(notes[0].velocity, 100);
    }

    #[test]
    fn orphan_note_off_is_counted_not_fatal() {
        let track = Track {
            events: vec![off(10, 61)],
        };
        let (notes, stats) = extract_notes(&track);
        assert!(notes.is_empty());
        assert_eq!(stats.unpaired_note_offs, 1);
    }

    #[test]
    fn retrigger_closes_earlier_note_at_new_start() {
        let track = Track {
            events: vec![on(0, 60, 80), on(240, 60, 90), off(240, 60)],
        };
        let (notes, stats) = extract_notes(&track);
        assert_eq!(stats.retriggered, 1);
        assert_eq!(notes.len(), 2);
        assert_eq!((notes[0].start_tick, notes[0].duration_ticks), (0, 240));
        assert_eq!(notes[0].velocity, 80);
        assert_eq!((notes[1].start_tick, notes[1].duration_ticks), (240, 240));
        assert_eq!(notes[1].velocity, 90);
    }

    #[test]
    fn nested_notes_come_out_in_start_order() {
        // 62 sounds entirely inside 60, so it finishes first.
        let track = Track {
            events: vec![on(0, 60, 80), on(10, 62, 70), off(10, 62), off(10, 60)],
        };
        let (notes, stats) = extract_notes(&track);
        assert_eq!(stats, ExtractStats::default());
        let starts: Vec<(u8, u32)> = notes.iter().map(|n| (n.pitch, n.start_tick)).collect();
        assert_eq!(starts, vec![(60, 0), (62, 10)]);
        assert_eq!(notes[0].duration_ticks, 30);
        assert_eq!(notes[1].duration_ticks, 10);
    }

    #[test]
    fn dangling_note_is_discarded_at_end_of_track() {
        let track = Track {
            events: vec![on(0, 60, 80)],
        };
        let (notes, stats) = extract_notes(&track);
        assert!(notes.is_empty());
        assert_eq!(stats.dangling_note_ons, 1);
    }

    #[test]
    fn same_pitch_different_channels_pair_independently() {
        let track = Track {
            events: vec![
                TimedEvent {
                    delta: 0,
                    kind: EventKind::NoteOn {
                        channel: 0,
                        key: 60,
                        velocity: 70,
                    },
                },
                TimedEvent {
                    delta: 0,
                    kind: EventKind::NoteOn {
                        channel: 1,
                        key: 60,
                        velocity: 75,
                    },
                },
                TimedEvent {
                    delta: 100,
                    kind: EventKind::NoteOff {
                        channel: 1,
                        key: 60,
                        velocity: 0,
                    },
                },
                TimedEvent {
                    delta: 100,
                    kind: EventKind::NoteOff {
                        channel: 0,
                        key: 60,
                        velocity: 0,
                    },
                },
            ],
        };
        let (notes, stats) = extract_notes(&track);
        assert_eq!(stats, ExtractStats::default());
        assert_eq!(notes.len(), 2);
        assert_eq!((notes[0].channel, notes[0].duration_ticks), (1, 100));
        assert_eq!((notes[1].channel, notes[1].duration_ticks), (0, 200));
    }

    #[test]
    fn tempo_defaults_to_120_bpm() {
        let file = MidiFile {
            format: 1,
            ticks_per_quarter: 480,
            tracks: vec![Track::default()],
        };
        assert_eq!(song_tempo(&file), DEFAULT_TEMPO_MICROS);
        assert_eq!(bpm(song_tempo(&file)), 120);
    }

    #[test]
    fn earliest_tempo_event_across_tracks_wins() {
        let tempo_event = |delta, micros: u32| TimedEvent {
            delta,
            kind: EventKind::Meta {
                kind: 0x51,
                data: micros.to_be_bytes()[1..].to_vec(),
            },
        };
        let file = MidiFile {
            format: 1,
            ticks_per_quarter: 480,
            tracks: vec![
                Track {
                    events: vec![tempo_event(100, 600_000)],
                },
                Track {
                    events: vec![tempo_event(0, 400_000)],
                },
            ],
        };
        assert_eq!(song_tempo(&file), 400_000);
        assert_eq!(bpm(400_000), 150);
    }

    #[test]
    fn tick_to_ms_matches_reference_formula() {
        // 500000 us/quarter at 480 tpq: 480 ticks == 500 ms.
        assert_eq!(ticks_to_ms(480, 500_000, 480), 500);
        assert_eq!(ticks_to_ms(0, 500_000, 480), 0);
        assert_eq!(ticks_to_ms(96, 500_000, 96), 500);
        assert_eq!(ticks_to_ms(1, 500_000, 480), 1); // 1.0417 rounds to 1
    }
}
