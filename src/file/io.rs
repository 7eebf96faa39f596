//! Low-level big-endian reading and writing utilities for class file processing.
//!
//! The JVM class file format stores every multi-byte quantity in big-endian order. This module
//! provides the bounds-checked primitives the rest of the crate builds on: reading typed values
//! out of a byte slice at a tracked offset, patching values into an existing buffer and
//! appending values to a growing output buffer.
//!
//! # Key Components
//!
//! - [`crate::file::io::BeIO`] - Trait defining big-endian conversion for primitive types
//! - [`crate::file::io::read_be`] - Read a value from the start of a buffer
//! - [`crate::file::io::read_be_at`] - Read a value at an offset and advance the offset
//! - [`crate::file::io::write_be_at`] - Overwrite a value at an offset and advance the offset
//! - [`crate::file::io::push_be`] - Append a value to a `Vec<u8>`
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use classabi::file::io::{read_be_at, push_be};
//!
//! let mut out = Vec::new();
//! push_be(&mut out, 0xCAFE_BABEu32);
//! push_be(&mut out, 52u16);
//!
//! let mut offset = 0;
//! let magic: u32 = read_be_at(&out, &mut offset)?;
//! let major: u16 = read_be_at(&out, &mut offset)?;
//! assert_eq!((magic, major, offset), (0xCAFE_BABE, 52, 6));
//! # Ok::<(), classabi::Error>(())
//! ```
//!
//! # Error Handling
//!
//! Reading and patching return [`crate::Error::OutOfBounds`] if the buffer is too short.
//! Appending cannot fail.

use crate::{Error::OutOfBounds, Result};

/// Trait for primitive types that can be converted to and from big-endian byte arrays.
///
/// Each implementation names the fixed-size byte array it converts from (e.g. `[u8; 4]` for
/// `u32`), which lets the generic readers slice exactly the right amount of input.
pub trait BeIO: Sized + Copy {
    /// Associated byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte array in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte array in big-endian
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_be_io {
    ($($ty:ty),*) => {
        $(
            impl BeIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_be_io!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Reads a value of type `T` from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` holds fewer than `size_of::<T>()` bytes.
pub fn read_be<T: BeIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_be_at(data, &mut offset)
}

/// Reads a value of type `T` at `offset` and advances `offset` past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value would extend past the end of `data`.
pub fn read_be_at<T: BeIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let size = std::mem::size_of::<T>();
    let end = offset.checked_add(size).ok_or(OutOfBounds)?;
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(bytes) = T::Bytes::try_from(&data[*offset..end]) else {
        return Err(OutOfBounds);
    };

    *offset = end;
    Ok(T::from_be_bytes(bytes))
}

/// Overwrites the bytes at `offset` with `value` and advances `offset`.
///
/// Used to back-patch length fields after the payload they describe has been written.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value would extend past the end of `data`.
pub fn write_be_at<T: BeIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let bytes = value.to_be_bytes();
    let bytes = bytes.as_ref();
    let end = offset.checked_add(bytes.len()).ok_or(OutOfBounds)?;
    if end > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..end].copy_from_slice(bytes);
    *offset = end;
    Ok(())
}

/// Appends `value` in big-endian order to `out`.
pub fn push_be<T: BeIO>(out: &mut Vec<u8>, value: T) {
    out.extend_from_slice(value.to_be_bytes().as_ref());
}
