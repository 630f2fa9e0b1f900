//! Wire-level track events.
//!
//! A decoded track is the parse-order sequence of [`TimedEvent`]s; summing
//! `delta` over a prefix gives the absolute tick of that event. Only note
//! events and meta events are interpreted downstream, but every event is
//! carried so the stream stays faithful to the file.

/// One event with the ticks elapsed since the previous event in its track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedEvent {
    pub delta: u32,
    pub kind: EventKind,
}

/// The event payload.
///
/// `NoteOn` with velocity 0 is kept as-is here; the note extractor is the
/// layer that treats it as a note-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    NoteOff { channel: u8, key: u8, velocity: u8 },
    NoteOn { channel: u8, key: u8, velocity: u8 },
    /// Any other channel or system-common message, carried verbatim. The
    /// number of meaningful data bytes follows from the status; unused slots
    /// hold zero.
    Other { status: u8, data: [u8; 2] },
    /// Meta event: type byte plus payload. Type 0x51 is Set Tempo.
    Meta { kind: u8, data: Vec<u8> },
    /// SysEx (0xF0) or escape (0xF7) payload.
    SysEx { data: Vec<u8> },
}

impl EventKind {
    /// Numeric event type: the status high nibble for channel events
    /// (8 = note off, 9 = note on, ...) and 255 for meta events.
    pub fn type_code(&self) -> u16 {
        match self {
            EventKind::NoteOff { .. } => 8,
            EventKind::NoteOn { .. } => 9,
            EventKind::Other { status, .. } => u16::from(status >> 4),
            EventKind::Meta { .. } => 255,
            EventKind::SysEx { .. } => 0xF,
        }
    }

    /// Channel number for channel events, `None` otherwise.
    pub fn channel(&self) -> Option<u8> {
        match self {
            EventKind::NoteOff { channel, .. } | EventKind::NoteOn { channel, .. } => {
                Some(*channel)
            }
            EventKind::Other { status, .. } if *status < 0xF0 => Some(status & 0x0F),
            _ => None,
        }
    }
}
