//! Archive input and output.
//!
//! The ABI core consumes a stream of [`ClassEntry`] values and writes what survives into an
//! [`EntrySink`]. This module provides the jar-backed producer and the sinks used by the
//! command-line tool and the tests.
//!
//! # Key Components
//!
//! - [`ClassEntry`] - One `(entry name, bytes)` pair
//! - [`JarSource`] - Reads a jar and feeds its entries into a channel
//! - [`EntrySink`] - Destination of surviving entries
//! - [`ZipSink`] - Writes a jar atomically
//! - [`MemorySink`] - Collects entries in memory

mod sink;
mod source;

pub use sink::{EntrySink, MemorySink, ZipSink};
pub use source::JarSource;

/// Suffix of compiled class entries
pub const CLASS_SUFFIX: &str = ".class";
/// Suffix of the Kotlin module descriptors stored under `META-INF/`
pub const KOTLIN_MODULE_SUFFIX: &str = ".kotlin_module";

/// One archive entry as delivered by a producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    /// Entry name, `/`-separated, e.g. `com/x/A.class`
    pub name: String,
    /// Entry content
    pub data: Vec<u8>,
}

impl ClassEntry {
    /// Creates an entry.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        ClassEntry {
            name: name.into(),
            data,
        }
    }

    /// Returns `true` for compiled classes.
    #[must_use]
    pub fn is_class(&self) -> bool {
        self.name.ends_with(CLASS_SUFFIX)
    }

    /// Returns `true` for Kotlin module descriptors.
    #[must_use]
    pub fn is_kotlin_module(&self) -> bool {
        self.name.ends_with(KOTLIN_MODULE_SUFFIX)
    }
}
