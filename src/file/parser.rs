//! Cursor-based byte stream parser for class files and metadata payloads.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a bounds-checked cursor over a
//! byte slice. It is used for two very different formats in this crate: the big-endian JVM class
//! file structure and the little-endian-varint protobuf messages embedded in Kotlin metadata.
//!
//! # Key Components
//!
//! ## Navigation Methods
//! - [`crate::file::parser::Parser::seek`] - Move to specific position
//! - [`crate::file::parser::Parser::advance_by`] - Move forward by specified bytes
//! - [`crate::file::parser::Parser::pos`] - Get current position
//!
//! ## Data Access Methods
//! - [`crate::file::parser::Parser::read_be`] - Read primitive types (big-endian)
//! - [`crate::file::parser::Parser::read_bytes`] - Borrow the next `n` bytes
//! - [`crate::file::parser::Parser::read_varint`] - Read a base-128 varint (protobuf encoding)
//!
//! # Usage Examples
//!
//! ```rust
//! use classabi::Parser;
//!
//! let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34];
//! let mut parser = Parser::new(&data);
//!
//! let magic = parser.read_be::<u32>()?;
//! let minor = parser.read_be::<u16>()?;
//! let major = parser.read_be::<u16>()?;
//! assert_eq!((magic, minor, major), (0xCAFE_BABE, 0, 52));
//! assert!(!parser.has_more_data());
//! # Ok::<(), classabi::Error>(())
//! ```

use crate::{
    file::io::{read_be_at, BeIO},
    Result,
};

/// A generic binary data parser.
///
/// `Parser` keeps a position cursor into a borrowed byte slice. Every read validates that enough
/// data is available, so truncated input surfaces as [`crate::Error::OutOfBounds`] instead of
/// a panic.
///
/// # Examples
///
/// ```rust
/// use classabi::Parser;
///
/// let data = [0x00, 0x03, b'f', b'o', b'o'];
/// let mut parser = Parser::new(&data);
///
/// let len = parser.read_be::<u16>()? as usize;
/// assert_eq!(parser.read_bytes(len)?, b"foo");
/// # Ok::<(), classabi::Error>(())
/// ```
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Returns the unread remainder of the buffer.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    /// Move the current position to the specified index.
    ///
    /// Seeking to exactly the end of the buffer is allowed; nothing can be read afterwards.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// Read a type `T` from the current position in big-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_be<T: BeIO>(&mut self) -> Result<T> {
        read_be_at::<T>(self.data, &mut self.position)
    }

    /// Borrow the next `len` bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let start = self.position;
        self.advance_by(len)?;
        Ok(&self.data[start..self.position])
    }

    /// Read a base-128 varint as used by the protobuf wire format.
    ///
    /// Each byte contributes its low 7 bits, least significant group first; a set high bit
    /// means another byte follows. At most 10 bytes are accepted.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the data ends inside the varint, or
    /// [`crate::Error::Malformed`] if the encoding exceeds 64 bits.
    pub fn read_varint(&mut self) -> Result<u64> {
        let mut value = 0u64;
        let mut shift = 0;

        loop {
            if self.position >= self.data.len() {
                return Err(out_of_bounds_error!());
            }

            let byte = self.data[self.position];
            self.position += 1;

            value |= u64::from(byte & 0x7F) << shift;
            shift += 7;

            if (byte & 0x80) == 0 {
                break;
            }

            if shift >= 64 {
                return Err(malformed_error!(
                    "Varint overflow: value exceeds u64 capacity after {} bits",
                    shift
                ));
            }
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_read_varint() {
        let test_cases = vec![
            (vec![0x00], 0),
            (vec![0x01], 1),
            (vec![0x7F], 0x7F),
            (vec![0x80, 0x01], 0x80),
            (vec![0xAC, 0x02], 300),
            (vec![0x86, 0x04], 518),
            (
                vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01],
                u64::MAX,
            ),
        ];

        for (input, expected) in test_cases {
            let mut parser = Parser::new(&input);
            assert_eq!(parser.read_varint().unwrap(), expected);
            assert!(!parser.has_more_data());
        }

        let mut parser = Parser::new(&[0x80]);
        assert!(matches!(parser.read_varint(), Err(Error::OutOfBounds)));

        let mut parser = Parser::new(&[0xFF; 11]);
        assert!(matches!(
            parser.read_varint(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn test_navigation() {
        let data = [1, 2, 3, 4];
        let mut parser = Parser::new(&data);
        parser.advance_by(2).unwrap();
        assert_eq!(parser.pos(), 2);
        assert_eq!(parser.remaining(), &[3, 4]);

        parser.seek(4).unwrap();
        assert!(!parser.has_more_data());
        assert!(parser.seek(5).is_err());
        assert!(parser.advance_by(1).is_err());
    }

    #[test]
    fn test_read_bytes() {
        let data = [0xCA, 0xFE, 0xBA, 0xBE];
        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_bytes(2).unwrap(), &[0xCA, 0xFE]);
        assert!(matches!(parser.read_bytes(3), Err(Error::OutOfBounds)));
        assert_eq!(parser.pos(), 2);
        assert_eq!(parser.read_be::<u16>().unwrap(), 0xBABE);
    }
}
