//! Conversion between the `d1` string array and the protobuf bytes it carries.
//!
//! Annotation values can only hold strings, and a single `CONSTANT_Utf8` holds at most 65535
//! bytes, so the compiler spreads the binary payload over several strings. Two encodings exist:
//!
//! - **UTF-8 mode**: the first string starts with `\0`. Every following character is one byte
//!   value (`0..=255`). This is what current compilers write.
//! - **8-to-7 mode**: used by early compilers, optionally marked by a leading `\u{FFFF}`. Bytes
//!   are repacked into 7-bit groups, each shifted by one so that no group is zero.
//!
//! [`decode_bytes`] accepts both; [`encode_bytes`] always writes UTF-8 mode.

use crate::{classfile::mutf8, Result};

const UTF8_MODE_MARKER: char = '\0';
const EIGHT_TO_SEVEN_MODE_MARKER: char = '\u{FFFF}';
/// Largest encoded size of one `CONSTANT_Utf8`
const MAX_UTF8_INFO_LENGTH: usize = 65535;

/// Decodes the `d1` strings into the protobuf payload.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a UTF-8 mode string contains a character above U+00FF.
pub fn decode_bytes(strings: &[String]) -> Result<Vec<u8>> {
    match strings.first().and_then(|first| first.chars().next()) {
        Some(UTF8_MODE_MARKER) => utf8_mode_to_bytes(strings),
        Some(EIGHT_TO_SEVEN_MODE_MARKER) => {
            let mut chars = strings.iter().flat_map(|s| s.chars());
            chars.next();
            Ok(seven_bit_to_bytes(chars))
        }
        _ => Ok(seven_bit_to_bytes(strings.iter().flat_map(|s| s.chars()))),
    }
}

fn utf8_mode_to_bytes(strings: &[String]) -> Result<Vec<u8>> {
    let total: usize = strings.iter().map(String::len).sum();
    let mut bytes = Vec::with_capacity(total);
    for c in strings.iter().flat_map(|s| s.chars()).skip(1) {
        let value = u8::try_from(u32::from(c))
            .map_err(|_| malformed_error!("Character U+{:04X} in UTF-8 mode metadata", u32::from(c)))?;
        bytes.push(value);
    }
    Ok(bytes)
}

fn seven_bit_to_bytes(chars: impl Iterator<Item = char>) -> Vec<u8> {
    // Each character holds one 7-bit group, stored with +1 modulo 128
    let groups: Vec<u8> = chars
        .map(|c| ((u32::from(c) as u8).wrapping_add(0x7F)) & 0x7F)
        .collect();

    let length = groups.len() * 7 / 8;
    let mut bytes = Vec::with_capacity(length);
    let mut index = 0;
    let mut bit = 0;
    for _ in 0..length {
        let low = u32::from(groups[index]) >> bit;
        index += 1;
        let high = (u32::from(groups[index]) & ((1 << (bit + 1)) - 1)) << (7 - bit);
        bytes.push((low + high) as u8);

        if bit == 6 {
            index += 1;
            bit = 0;
        } else {
            bit += 1;
        }
    }
    bytes
}

/// Encodes a protobuf payload as `d1` strings in UTF-8 mode.
///
/// A new string is started whenever the modified UTF-8 size of the current one reaches the
/// `CONSTANT_Utf8` limit.
#[must_use]
pub fn encode_bytes(bytes: &[u8]) -> Vec<String> {
    let mut strings = Vec::with_capacity(1);
    let mut buffer = String::new();
    buffer.push(UTF8_MODE_MARKER);
    let mut encoded = mutf8::encoded_len(UTF8_MODE_MARKER);

    for &byte in bytes {
        let c = char::from(byte);
        buffer.push(c);
        encoded += mutf8::encoded_len(c);

        if encoded >= MAX_UTF8_INFO_LENGTH - 1 {
            strings.push(std::mem::take(&mut buffer));
            encoded = 0;
        }
    }

    if !buffer.is_empty() {
        strings.push(buffer);
    }
    strings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_mode() {
        let payload = vec![0x00, 0x01, 0x7F, 0x80, 0xFF, 0x0A];
        let strings = encode_bytes(&payload);
        assert_eq!(strings.len(), 1);
        assert!(strings[0].starts_with('\0'));
        assert_eq!(strings[0].chars().count(), payload.len() + 1);
        assert_eq!(decode_bytes(&strings).unwrap(), payload);
    }

    #[test]
    fn empty_payload() {
        let strings = encode_bytes(&[]);
        assert_eq!(strings, vec!["\0".to_string()]);
        assert!(decode_bytes(&strings).unwrap().is_empty());
        assert!(decode_bytes(&[]).unwrap().is_empty());
    }

    #[test]
    fn long_payloads_are_split() {
        let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let strings = encode_bytes(&payload);
        assert!(strings.len() > 1);
        for string in &strings {
            let encoded: usize = string.chars().map(mutf8::encoded_len).sum();
            assert!(encoded <= MAX_UTF8_INFO_LENGTH);
        }
        assert_eq!(decode_bytes(&strings).unwrap(), payload);
    }

    #[test]
    fn rejects_wide_characters_in_utf8_mode() {
        let strings = vec!["\0\u{100}".to_string()];
        assert!(decode_bytes(&strings).is_err());
    }

    /// Reference encoder for the legacy format
    fn encode_8_to_7(data: &[u8]) -> String {
        let length = (data.len() * 8 + 6) / 7;
        let mut groups = vec![0u8; length];
        let mut index = 0;
        let mut bit = 0;
        for group in groups.iter_mut() {
            let first = data.get(index).copied().unwrap_or(0) as u32;
            let mut value = (first >> bit) & 0x7F;
            if bit > 1 {
                let second = data.get(index + 1).copied().unwrap_or(0) as u32;
                value |= (second << (8 - bit)) & 0x7F;
            }
            *group = ((value as u8).wrapping_add(1)) & 0x7F;
            bit += 7;
            if bit >= 8 {
                bit -= 8;
                index += 1;
            }
        }
        groups.into_iter().map(char::from).collect()
    }

    #[test]
    fn legacy_mode() {
        let payload = vec![0x0A, 0x03, 0xFF, 0x00, 0x80, 0x42, 0x13, 0x37, 0x99];
        let encoded = encode_8_to_7(&payload);
        assert_eq!(decode_bytes(&[encoded.clone()]).unwrap(), payload);

        let marked = format!("\u{FFFF}{encoded}");
        assert_eq!(decode_bytes(&[marked]).unwrap(), payload);
    }
}
