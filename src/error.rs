//! Error types for the decode, encode and sheet-file surfaces.
//!
//! Each surface gets its own enum so callers can tell a malformed MIDI file
//! apart from an unencodable note list or a bad sheet file. Decoding never
//! yields a partial [`MidiFile`](crate::MidiFile): the first error aborts the
//! whole parse.

use thiserror::Error;

/// A malformed or truncated Standard MIDI File.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The buffer does not start with an `MThd` chunk.
    #[error("not a standard midi file (missing MThd)")]
    NotMidi,

    /// The header chunk declares fewer than the mandatory 6 body bytes.
    #[error("midi header body shorter than 6 bytes")]
    BadHeaderLength,

    /// The time division uses SMPTE frames, which the tick-based note model
    /// cannot represent.
    #[error("smpte time division {0:#06x} is not supported")]
    SmpteTiming(u16),

    /// Ran out of bytes while reading the named element.
    #[error("truncated midi data while reading {0}")]
    Truncated(&'static str),

    /// A variable-length quantity kept its continuation bit set past the
    /// 4-byte maximum.
    #[error("variable-length quantity longer than 4 bytes")]
    VarLenOverflow,

    /// A data byte appeared where a status byte was expected and no running
    /// status was in effect.
    #[error("data byte {0:#04x} with no running status")]
    OrphanData(u8),

    /// The underlying file could not be read.
    #[error("failed to read midi file: {0}")]
    Io(#[from] std::io::Error),
}

/// A note list that cannot be rendered as a format 1 file.
///
/// Zero-duration notes are not an error: the encoder skips them and reports
/// the count through [`encode_with_stats`](crate::encode_with_stats).
#[derive(Debug, Error)]
pub enum EncodeError {
    /// More tracks than the u16 count field of the header can hold.
    #[error("track count {0} does not fit in a format 1 header")]
    TooManyTracks(usize),

    /// The requested time division has the SMPTE bit set.
    #[error("time division {0:#06x} has the smpte bit set")]
    SmpteTiming(u16),

    /// A note pitch outside the 7-bit MIDI range.
    #[error("note pitch {0} outside 0-127")]
    PitchRange(u8),

    /// A note velocity outside the 7-bit MIDI range.
    #[error("note velocity {0} outside 0-127")]
    VelocityRange(u8),

    /// A tick delta or duration too large for a 4-byte variable-length
    /// quantity.
    #[error("tick value {0} does not fit in a variable-length quantity")]
    VarLenRange(u32),
}

/// A sheet file that could not be read or understood.
#[derive(Debug, Error)]
pub enum SheetError {
    /// The file content is not valid JSON. Strict parsing only; there is no
    /// script-evaluation fallback.
    #[error("sheet file is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    /// The file is not UTF-16LE text.
    #[error("sheet file is not utf-16le text")]
    Encoding,

    /// The sheet is encrypted (numeric `songNotes` or an `isEncrypted` flag)
    /// and cannot be imported.
    #[error("sheet {0:?} is encrypted and cannot be imported")]
    Encrypted(String),

    /// The underlying file could not be read or written.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
