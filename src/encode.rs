//! Note lists back to Standard MIDI File bytes.
//!
//! Output is always a format 1 file. Each track sorts its notes by start tick
//! (stable, so simultaneous notes keep insertion order) and emits a note-on /
//! note-off pair per note with fixed status bytes 0x90 / 0x80 and release
//! velocity 0x40, then the End-of-Track meta sequence.

use crate::{error::EncodeError, notes::Note, varlen};

/// Counts of notes the encoder altered or refused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeStats {
    /// Notes skipped because their duration was zero.
    pub zero_duration: u32,
    /// Notes whose start preceded the previous note-off; their delta was
    /// clamped to zero.
    pub clamped_deltas: u32,
}

/// Encode note tracks into a format 1 MIDI file.
pub fn encode(ticks_per_quarter: u16, tracks: &[Vec<Note>]) -> Result<Vec<u8>, EncodeError> {
    encode_with_stats(ticks_per_quarter, tracks).map(|(bytes, _)| bytes)
}

/// Like [`encode`], also reporting what was skipped or clamped.
pub fn encode_with_stats(
    ticks_per_quarter: u16,
    tracks: &[Vec<Note>],
) -> Result<(Vec<u8>, EncodeStats), EncodeError> {
    if tracks.len() > usize::from(u16::MAX) {
        return Err(EncodeError::TooManyTracks(tracks.len()));
    }
    if ticks_per_quarter & 0x8000 != 0 {
        return Err(EncodeError::SmpteTiming(ticks_per_quarter));
    }

    let mut stats = EncodeStats::default();
    let mut out = Vec::new();
    out.extend_from_slice(b"MThd");
    out.extend_from_slice(&6u32.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    out.extend_from_slice(&ticks_per_quarter.to_be_bytes());

    for notes in tracks {
        let events = encode_track(notes, &mut stats)?;
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(events.len() as u32).to_be_bytes());
        out.extend_from_slice(&events);
    }

    if stats.zero_duration > 0 {
        log::warn!("skipped {} zero-duration notes while encoding", stats.zero_duration);
    }
    Ok((out, stats))
}

fn encode_track(notes: &[Note], stats: &mut EncodeStats) -> Result<Vec<u8>, EncodeError> {
    let mut sorted: Vec<&Note> = notes.iter().collect();
    // Stable: simultaneous notes keep their insertion order.
    sorted.sort_by_key(|note| note.start_tick);

    let mut events = Vec::new();
    let mut cursor = 0u32;
    for note in sorted {
        if note.pitch > 0x7F {
            return Err(EncodeError::PitchRange(note.pitch));
        }
        if note.velocity > 0x7F {
            return Err(EncodeError::VelocityRange(note.velocity));
        }
        if note.duration_ticks == 0 {
            stats.zero_duration += 1;
            continue;
        }

        let start = if note.start_tick < cursor {
            stats.clamped_deltas += 1;
            cursor
        } else {
            note.start_tick
        };
        varlen::write(start - cursor, &mut events)?;
        events.extend_from_slice(&[0x90, note.pitch, note.velocity]);
        varlen::write(note.duration_ticks, &mut events)?;
        events.extend_from_slice(&[0x80, note.pitch, 0x40]);
        cursor = start.saturating_add(note.duration_ticks);
    }

    events.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    Ok(events)
}
