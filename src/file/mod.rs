//! Byte-level input handling.
//!
//! This module groups the primitives every other layer builds on:
//!
//! - [`crate::file::io`] - Big-endian read/write helpers
//! - [`crate::file::parser::Parser`] - Bounds-checked cursor over a byte slice
//! - [`crate::file::Backend`] - Source of the bytes of an input archive, either memory-mapped
//!   from disk ([`crate::file::Physical`]) or owned in memory ([`crate::file::Memory`])
//!
//! Input jars can be large and are read once front to back while their entries are inflated,
//! so mapping them instead of reading them into a buffer keeps the resident set small.

pub mod io;
pub mod parser;

use std::{fs, path::Path};

use memmap2::Mmap;

use crate::{
    Error::{Error, FileError},
    Result,
};

/// Provides the raw bytes of an input archive.
pub trait Backend: Send + Sync {
    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the backend holds no data.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A read-only memory mapping of a file on disk.
#[derive(Debug)]
pub struct Physical {
    data: Mmap,
}

impl Physical {
    /// Maps the file at `path` into memory.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or
    /// [`crate::Error::Error`] if memory mapping fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path).map_err(FileError)?;

        // The mapping stays valid as long as nobody truncates the jar underneath us; input jars
        // are build outputs that are not rewritten while the ABI step runs.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|error| Error(error.to_string()))?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }
}

/// An input archive already held in memory.
#[derive(Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Takes ownership of `data`.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Memory {
        Memory { data }
    }
}

impl Backend for Memory {
    fn data(&self) -> &[u8] {
        self.data.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn memory_backend() {
        let memory = Memory::new(vec![0xCA, 0xFE]);
        assert_eq!(memory.len(), 2);
        assert!(!memory.is_empty());
        assert_eq!(memory.data(), &[0xCA, 0xFE]);

        assert!(Memory::default().is_empty());
    }

    #[test]
    fn physical_backend() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"PK\x03\x04rest").unwrap();
        file.flush().unwrap();

        let physical = Physical::new(file.path()).unwrap();
        assert_eq!(physical.len(), 8);
        assert_eq!(&physical.data()[..4], b"PK\x03\x04");
    }

    #[test]
    fn physical_missing_file() {
        let result = Physical::new("/nonexistent/input.jar");
        assert!(matches!(result, Err(FileError(_))));
    }
}
