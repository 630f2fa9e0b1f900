//! The two JSON serializations the UI collaborator exchanges with the core.
//!
//! - The *editable* form is what the piano-roll editor persists between
//!   sessions and feeds back into [`encode`](crate::encode): time division
//!   plus per-track note lists, in ticks.
//! - The *playback* form is a derived, lossy, one-way export for the 37-key
//!   grid player: note-on times in milliseconds mapped onto `1Key1`..`1Key37`.
//!
//! Sheet files on disk are UTF-16LE text holding a JSON array of playback
//! sheets. Parsing is strict JSON only; the legacy script-evaluation loader
//! is not reproduced. Encrypted sheets (numeric `songNotes` or an
//! `isEncrypted` flag) are rejected as such.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{error::SheetError, notes::Note};

/// Lowest pitch on the virtual keyboard (C3).
pub const KEY_LOW: u8 = 48;
/// Highest pitch on the virtual keyboard (C6).
pub const KEY_HIGH: u8 = 84;
/// Number of playable keys.
pub const KEY_COUNT: u8 = KEY_HIGH - KEY_LOW + 1;
/// Grid columns per page in the playback UI.
pub const BITS_PER_PAGE: u32 = 16;

/// The editable round-trip form: `{ timeDivision, tracks: [{ notes }] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableSong {
    #[serde(rename = "timeDivision")]
    pub time_division: u16,
    pub tracks: Vec<EditableTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableTrack {
    #[serde(default, rename = "trackIndex")]
    pub track_index: usize,
    pub notes: Vec<Note>,
}

/// The playback-only export form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSheet {
    #[serde(default)]
    pub name: String,
    pub bpm: u32,
    #[serde(rename = "bitsPerPage")]
    pub bits_per_page: u32,
    #[serde(rename = "pitchLevel")]
    pub pitch_level: i32,
    #[serde(rename = "songNotes")]
    pub song_notes: Vec<SheetNote>,
}

/// One playback event: milliseconds from song start and a key label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetNote {
    pub time: u64,
    pub key: String,
}

/// 1-based key index for an in-range pitch; `None` outside 48–84.
///
/// This is a view-specific filter: it never mutates the note list it is
/// applied to.
pub fn key_index(pitch: u8) -> Option<u8> {
    (KEY_LOW..=KEY_HIGH)
        .contains(&pitch)
        .then(|| pitch - KEY_LOW + 1)
}

/// Key label for an in-range pitch, e.g. pitch 48 -> `"1Key1"`.
pub fn key_name(pitch: u8) -> Option<String> {
    key_index(pitch).map(|index| format!("1Key{index}"))
}

/// Parse a JSON array of playback sheets, rejecting encrypted entries.
pub fn parse_sheets(text: &str) -> Result<Vec<PlaybackSheet>, SheetError> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(text)?;
    entries
        .into_iter()
        .map(|entry| {
            let name = entry
                .get("name")
                .and_then(|name| name.as_str())
                .unwrap_or_default()
                .to_string();
            let encrypted = entry
                .get("isEncrypted")
                .and_then(|flag| flag.as_bool())
                .unwrap_or(false)
                || entry
                    .get("songNotes")
                    .and_then(|notes| notes.get(0))
                    .is_some_and(|first| first.is_number());
            if encrypted {
                return Err(SheetError::Encrypted(name));
            }
            serde_json::from_value(entry).map_err(SheetError::Json)
        })
        .collect()
}

/// Encode text as UTF-16LE without a byte-order mark, the sheet file format.
pub fn to_utf16le_bytes(text: &str) -> Vec<u8> {
    text.encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect()
}

/// Decode UTF-16LE bytes, tolerating a leading byte-order mark.
pub fn from_utf16le_bytes(bytes: &[u8]) -> Result<String, SheetError> {
    if bytes.len() % 2 != 0 {
        return Err(SheetError::Encoding);
    }
    let mut units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    if units.first() == Some(&0xFEFF) {
        units.remove(0);
    }
    String::from_utf16(&units).map_err(|_| SheetError::Encoding)
}

/// Write sheets as a compact JSON array in UTF-16LE.
pub fn write_sheet_file(path: &Path, sheets: &[PlaybackSheet]) -> Result<(), SheetError> {
    let json = serde_json::to_string(sheets)?;
    fs::write(path, to_utf16le_bytes(&json))?;
    Ok(())
}

/// Read and strictly parse a UTF-16LE sheet file.
pub fn read_sheet_file(path: &Path) -> Result<Vec<PlaybackSheet>, SheetError> {
    let text = from_utf16le_bytes(&fs::read(path)?)?;
    parse_sheets(&text)
}

/// Strip all whitespace from sheet text; some sheet importers choke on
/// pretty-printed JSON.
pub fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_range_boundaries() {
        assert_eq!(key_index(47), None);
        assert_eq!(key_index(48), Some(1));
        assert_eq!(key_index(84), Some(37));
        assert_eq!(key_index(85), None);
        assert_eq!(key_name(48).as_deref(), Some("1Key1"));
        assert_eq!(key_name(84).as_deref(), Some("1Key37"));
        assert_eq!(KEY_COUNT, 37);
    }

    #[test]
    fn editable_song_uses_editor_field_names() {
        let song = EditableSong {
            time_division: 480,
            tracks: vec![EditableTrack {
                track_index: 0,
                notes: vec![Note {
                    pitch: 60,
                    start_tick: 0,
                    duration_ticks: 480,
                    velocity: 80,
                    channel: 0,
                }],
            }],
        };
        let json = serde_json::to_value(&song).unwrap();
        assert_eq!(json["timeDivision"], 480);
        let note = &json["tracks"][0]["notes"][0];
        assert_eq!(note["note"], 60);
        assert_eq!(note["time"], 0);
        assert_eq!(note["duration"], 480);
        assert_eq!(note["velocity"], 80);

        let back: EditableSong = serde_json::from_value(json).unwrap();
        assert_eq!(back, song);
    }

    #[test]
    fn playback_sheet_round_trips_through_utf16le() {
        let sheets = vec![PlaybackSheet {
            name: "致爱丽丝".to_string(),
            bpm: 120,
            bits_per_page: BITS_PER_PAGE,
            pitch_level: 0,
            song_notes: vec![SheetNote {
                time: 0,
                key: "1Key13".to_string(),
            }],
        }];
        let json = serde_json::to_string(&sheets).unwrap();
        let bytes = to_utf16le_bytes(&json);
        let parsed = parse_sheets(&from_utf16le_bytes(&bytes).unwrap()).unwrap();
        assert_eq!(parsed, sheets);
    }

    #[test]
    fn bom_is_tolerated() {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(to_utf16le_bytes("[]"));
        assert_eq!(from_utf16le_bytes(&bytes).unwrap(), "[]");
    }

    #[test]
    fn encrypted_sheets_are_rejected() {
        let numeric = r#"[{"name":"locked","bpm":120,"bitsPerPage":16,"pitchLevel":0,"songNotes":[3,1,4]}]"#;
        assert!(matches!(
            parse_sheets(numeric),
            Err(SheetError::Encrypted(name)) if name == "locked"
        ));

        let flagged = r#"[{"name":"x","bpm":120,"bitsPerPage":16,"pitchLevel":0,"isEncrypted":true,"songNotes":[]}]"#;
        assert!(matches!(parse_sheets(flagged), Err(SheetError::Encrypted(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error_not_a_fallback() {
        assert!(matches!(
            parse_sheets("var sheet = []"),
            Err(SheetError::Json(_))
        ));
    }

    #[test]
    fn compact_strips_all_whitespace() {
        assert_eq!(compact(" [ {\n\t\"a\": 1 } ]\r\n"), "[{\"a\":1}]");
    }
}
