//! MIDI variable-length quantity codec.
//!
//! Seven payload bits per byte, most significant group first, high bit set on
//! every byte except the last. Values are limited to 28 bits (4 bytes) in
//! both directions.

use crate::error::{EncodeError, ParseError};

/// Largest value a 4-byte variable-length quantity can hold.
pub const MAX: u32 = 0x0FFF_FFFF;

/// Decode a variable-length quantity starting at `*offset`, advancing the
/// offset past the consumed bytes.
pub fn read(data: &[u8], offset: &mut usize) -> Result<u32, ParseError> {
    let mut value = 0u32;
    for _ in 0..4 {
        let byte = *data
            .get(*offset)
            .ok_or(ParseError::Truncated("variable-length quantity"))?;
        *offset += 1;
        value = (value << 7) | u32::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(ParseError::VarLenOverflow)
}

/// Append the encoding of `value` to `out`. Zero encodes as a single `0x00`.
///
/// Values above [`MAX`] do not fit in 4 bytes and are refused rather than
/// silently truncated.
pub fn write(value: u32, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    if value > MAX {
        return Err(EncodeError::VarLenRange(value));
    }
    if value < 0x80 {
        out.push(value as u8);
    } else if value < 0x4000 {
        out.extend_from_slice(&[(value >> 7) as u8 | 0x80, (value & 0x7F) as u8]);
    } else if value < 0x0020_0000 {
        out.extend_from_slice(&[
            (value >> 14) as u8 | 0x80,
            (value >> 7) as u8 & 0x7F | 0x80,
            (value & 0x7F) as u8,
        ]);
    } else {
        out.extend_from_slice(&[
            (value >> 21) as u8 | 0x80,
            (value >> 14) as u8 & 0x7F | 0x80,
            (value >> 7) as u8 & 0x7F | 0x80,
            (value & 0x7F) as u8,
        ]);
    }
    Ok(())
}
