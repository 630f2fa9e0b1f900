//! Strict Standard MIDI File decoder.
//!
//! Layout: an `MThd` chunk (big-endian u32 body length, at least 6: format
//! u16, track count u16, time division u16) followed by `MTrk` chunks, each a
//! u32-length-prefixed stream of `<delta-time><event>` pairs. Unknown chunk
//! magics with a sane declared length are skipped; anything truncated or
//! otherwise malformed fails the whole parse, with no partial result.

use crate::{
    error::ParseError,
    event::{EventKind, TimedEvent},
    varlen,
};

/// A fully decoded MIDI file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiFile {
    /// SMF format (0, 1 or 2) as declared by the header.
    pub format: u16,
    /// Ticks per quarter note. SMPTE divisions are rejected at parse time.
    pub ticks_per_quarter: u16,
    pub tracks: Vec<Track>,
}

/// One track: events in parse order, never re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    pub events: Vec<TimedEvent>,
}

/// Parse a Standard MIDI File from a byte buffer.
pub fn parse(bytes: &[u8]) -> Result<MidiFile, ParseError> {
    if bytes.len() < 8 {
        return Err(ParseError::NotMidi);
    }
    if &bytes[0..4] != b"MThd" {
        return Err(ParseError::NotMidi);
    }

    let header_len = read_u32(bytes, 4, "header length")? as usize;
    if header_len < 6 {
        return Err(ParseError::BadHeaderLength);
    }
    if bytes.len() < 8 + header_len {
        return Err(ParseError::Truncated("header body"));
    }

    let format = read_u16(bytes, 8, "format")?;
    let track_count = read_u16(bytes, 10, "track count")?;
    let division = read_u16(bytes, 12, "time division")?;
    if division & 0x8000 != 0 {
        return Err(ParseError::SmpteTiming(division));
    }

    let mut offset = 8 + header_len;
    let mut tracks = Vec::with_capacity(usize::from(track_count));
    while tracks.len() < usize::from(track_count) {
        if offset + 8 > bytes.len() {
            return Err(ParseError::Truncated("chunk header"));
        }
        let magic = &bytes[offset..offset + 4];
        let chunk_len = read_u32(bytes, offset + 4, "chunk length")? as usize;
        let body_start = offset + 8;
        let body_end = body_start
            .checked_add(chunk_len)
            .filter(|end| *end <= bytes.len())
            .ok_or(ParseError::Truncated("chunk body"))?;

        if magic == b"MTrk" {
            tracks.push(parse_track(&bytes[body_start..body_end])?);
        }
        // Non-MTrk chunks (proprietary extensions) are skipped whole.
        offset = body_end;
    }

    Ok(MidiFile {
        format,
        ticks_per_quarter: division,
        tracks,
    })
}

/// Parse one `MTrk` chunk body into events, honoring running status.
fn parse_track(data: &[u8]) -> Result<Track, ParseError> {
    let mut events = Vec::new();
    let mut offset = 0usize;
    let mut running: Option<u8> = None;

    while offset < data.len() {
        let delta = varlen::read(data, &mut offset)?;

        let lead = *data.get(offset).ok_or(ParseError::Truncated("status byte"))?;
        let (status, first_data) = if lead & 0x80 == 0 {
            // High bit clear: this is a data byte and the previous status
            // repeats (running status).
            let status = running.ok_or(ParseError::OrphanData(lead))?;
            offset += 1;
            (status, Some(lead))
        } else {
            offset += 1;
            if lead < 0xF0 {
                running = Some(lead);
            } else {
                running = None;
            }
            (lead, None)
        };

        let kind = match status >> 4 {
            0x8 => {
                let (key, velocity) = read_two(data, &mut offset, first_data)?;
                EventKind::NoteOff {
                    channel: status & 0x0F,
                    key,
                    velocity,
                }
            }
            0x9 => {
                let (key, velocity) = read_two(data, &mut offset, first_data)?;
                EventKind::NoteOn {
                    channel: status & 0x0F,
                    key,
                    velocity,
                }
            }
            0xA | 0xB | 0xE => {
                let (d1, d2) = read_two(data, &mut offset, first_data)?;
                EventKind::Other {
                    status,
                    data: [d1, d2],
                }
            }
            0xC | 0xD => {
                let d1 = read_one(data, &mut offset, first_data)?;
                EventKind::Other {
                    status,
                    data: [d1, 0],
                }
            }
            0xF => parse_system(data, &mut offset, status)?,
            _ => unreachable!("status bytes always have the high bit set"),
        };

        events.push(TimedEvent { delta, kind });
    }

    Ok(Track { events })
}

fn parse_system(data: &[u8], offset: &mut usize, status: u8) -> Result<EventKind, ParseError> {
    match status {
        0xFF => {
            let kind = read_one(data, offset, None)?;
            let len = varlen::read(data, offset)? as usize;
            let payload = take(data, offset, len, "meta payload")?;
            Ok(EventKind::Meta {
                kind,
                data: payload.to_vec(),
            })
        }
        0xF0 | 0xF7 => {
            let len = varlen::read(data, offset)? as usize;
            let payload = take(data, offset, len, "sysex payload")?;
            Ok(EventKind::SysEx {
                data: payload.to_vec(),
            })
        }
        0xF1 | 0xF3 => {
            let d1 = read_one(data, offset, None)?;
            Ok(EventKind::Other {
                status,
                data: [d1, 0],
            })
        }
        0xF2 => {
            let (d1, d2) = read_two(data, offset, None)?;
            Ok(EventKind::Other {
                status,
                data: [d1, d2],
            })
        }
        // F4-F6 and the realtime range carry no data bytes.
        _ => Ok(EventKind::Other {
            status,
            data: [0, 0],
        }),
    }
}

fn read_one(data: &[u8], offset: &mut usize, first: Option<u8>) -> Result<u8, ParseError> {
    if let Some(byte) = first {
        return Ok(byte);
    }
    let byte = *data.get(*offset).ok_or(ParseError::Truncated("event data"))?;
    *offset += 1;
    Ok(byte)
}

fn read_two(data: &[u8], offset: &mut usize, first: Option<u8>) -> Result<(u8, u8), ParseError> {
    let d1 = read_one(data, offset, first)?;
    let d2 = read_one(data, offset, None)?;
    Ok((d1, d2))
}

fn take<'a>(
    data: &'a [u8],
    offset: &mut usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], ParseError> {
    let end = offset
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or(ParseError::Truncated(what))?;
    let slice = &data[*offset..end];
    *offset = end;
    Ok(slice)
}

fn read_u16(data: &[u8], at: usize, what: &'static str) -> Result<u16, ParseError> {
    let bytes: [u8; 2] = data
        .get(at..at + 2)
        .and_then(|s| s.try_into().ok())
        .ok_or(ParseError::Truncated(what))?;
    Ok(u16::from_be_bytes(bytes))
}

fn read_u32(data: &[u8], at: usize, what: &'static str) -> Result<u32, ParseError> {
    let bytes: [u8; 4] = data
        .get(at..at + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or(ParseError::Truncated(what))?;
    Ok(u32::from_be_bytes(bytes))
}
