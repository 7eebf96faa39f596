//! Modified UTF-8, the string encoding of `CONSTANT_Utf8` entries.
//!
//! It differs from standard UTF-8 in two ways: U+0000 is written as the two byte sequence
//! `C0 80`, and supplementary characters are written as a UTF-16 surrogate pair with each
//! surrogate encoded as three bytes.

use crate::Result;

/// Decodes a modified UTF-8 byte sequence.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for truncated sequences, invalid lead bytes and unpaired
/// surrogates, none of which can be represented in a Rust `String`.
pub fn decode(bytes: &[u8]) -> Result<String> {
    if bytes.is_ascii() && !bytes.contains(&0) {
        return Ok(bytes.iter().map(|&b| char::from(b)).collect());
    }

    let mut units = Vec::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        let lead = bytes[pos];
        let unit = match lead {
            0x01..=0x7F => {
                pos += 1;
                u16::from(lead)
            }
            0xC0..=0xDF => {
                let next = continuation(bytes, pos + 1)?;
                pos += 2;
                (u16::from(lead & 0x1F) << 6) | next
            }
            0xE0..=0xEF => {
                let second = continuation(bytes, pos + 1)?;
                let third = continuation(bytes, pos + 2)?;
                pos += 3;
                (u16::from(lead & 0x0F) << 12) | (second << 6) | third
            }
            _ => {
                return Err(malformed_error!(
                    "Invalid modified UTF-8 lead byte 0x{:02X} at {}",
                    lead,
                    pos
                ))
            }
        };
        units.push(unit);
    }

    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|error| malformed_error!("Unpaired surrogate in constant: {}", error))
}

fn continuation(bytes: &[u8], pos: usize) -> Result<u16> {
    match bytes.get(pos) {
        Some(&byte) if byte & 0xC0 == 0x80 => Ok(u16::from(byte & 0x3F)),
        Some(&byte) => Err(malformed_error!(
            "Invalid modified UTF-8 continuation byte 0x{:02X} at {}",
            byte,
            pos
        )),
        None => Err(out_of_bounds_error!()),
    }
}

/// Encodes a string as modified UTF-8.
#[must_use]
pub fn encode(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

/// Returns the number of bytes `c` occupies in modified UTF-8.
#[must_use]
pub fn encoded_len(c: char) -> usize {
    match u32::from(c) {
        0x0001..=0x007F => 1,
        0x0000 | 0x0080..=0x07FF => 2,
        0x0800..=0xFFFF => 3,
        _ => 6,
    }
}
