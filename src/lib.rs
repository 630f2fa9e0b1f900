//! MIDI file codec and note model for virtual-piano sheet conversion.
//!
//! The crate turns Standard MIDI Files into editable note lists and lossy
//! playback sheets for a 37-key grid instrument, and re-encodes edited note
//! lists back into standards-conformant MIDI bytes. Everything is a pure,
//! single-pass transform over in-memory buffers:
//!
//! ```text
//! bytes --parse--> MidiFile --extract_notes--> Vec<Note> --encode--> bytes
//!                      \--playback_sheet--> PlaybackSheet (one-way)
//! ```
//!
//! # Example
//!
//! ```
//! use keysheet::{encode, extract_notes, parse, Note};
//!
//! let track = vec![Note {
//!     pitch: 60,
//!     start_tick: 0,
//!     duration_ticks: 480,
//!     velocity: 80,
//!     channel: 0,
//! }];
//! let bytes = encode(480, &[track.clone()]).unwrap();
//! let file = parse(&bytes).unwrap();
//! let (notes, _stats) = extract_notes(&file.tracks[0]);
//! assert_eq!(notes, track);
//! ```

pub mod convert;
pub mod encode;
pub mod error;
pub mod event;
pub mod notes;
pub mod parse;
pub mod sheet;
pub mod varlen;

pub use crate::{
    encode::{encode, encode_with_stats, EncodeStats},
    error::{EncodeError, ParseError, SheetError},
    event::{EventKind, TimedEvent},
    notes::{bpm, extract_notes, song_tempo, ticks_to_ms, ExtractStats, Note, DEFAULT_TEMPO_MICROS},
    parse::{parse, MidiFile, Track},
    sheet::{EditableSong, EditableTrack, PlaybackSheet, SheetNote},
};
