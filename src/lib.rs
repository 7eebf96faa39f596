// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/mod.rs' uses mmap to map an input jar into memory

//! # classabi
//!
//! Reduces compiled JVM class files to their application binary interface: the declarations
//! another compilation unit can see. Two builds that only differ in private implementation
//! details produce byte-identical ABI jars, which lets a build system skip recompiling
//! everything downstream of a change that did not touch the public surface.
//!
//! ## Features
//!
//! - **Member filtering** - Drops private members, synthetic non-API classes and method bodies
//! - **Kotlin awareness** - Reads `@kotlin.Metadata`, honours `internal` visibility and keeps
//!   the bodies of inline functions
//! - **Canonical output** - Members, annotations and metadata declarations are emitted in a
//!   stable order, and archives are written with fixed timestamps
//! - **Archive orchestration** - Streams entries out of a jar, strips them, and publishes the
//!   result atomically
//!
//! ## Quick Start
//!
//! ### Using the Prelude
//!
//! ```rust,no_run
//! use classabi::prelude::*;
//!
//! let summary = strip_jar("build/lib.jar", "build/lib-abi.jar", &AbiConfig::kotlin(), None)?;
//! println!("{} classes deleted", summary.deleted.len());
//! # Ok::<(), classabi::Error>(())
//! ```
//!
//! ### Single Classes
//!
//! ```rust,no_run
//! use classabi::{strip_class, AbiConfig, DeletedClassNames};
//!
//! let bytes = std::fs::read("Foo.class")?;
//! let mut deleted = DeletedClassNames::new();
//! match strip_class(&bytes, &AbiConfig::java(), &mut deleted)? {
//!     Some(abi) => std::fs::write("Foo-abi.class", abi)?,
//!     None => println!("Foo has no public API"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`classfile`] - Event-based class file reader and writer
//! - [`metadata`] - `@kotlin.Metadata` header, bit-packed strings and the declaration model
//! - [`abi`] - The filters and the archive orchestrator
//! - [`archive`] - Jar sources and entry sinks
//! - [`file`] - Bounds-checked parsing primitives and input backends
//! - [`Error`] and [`Result`] - Error handling
//!
//! A class flows through a chain of visitors: [`ClassReader`] replays it as events, one of
//! the filters in [`abi`] decides what survives, and [`ClassWriter`] re-encodes the result.
//!
//! ## Error Handling
//!
//! ```rust,no_run
//! use classabi::{Error, ClassReader};
//!
//! match ClassReader::new(&[0xCA, 0xFE, 0xBA, 0xBE]) {
//!     Ok(reader) => println!("class {}", reader.class_name()),
//!     Err(Error::NotSupported) => println!("Not a class file"),
//!     Err(Error::Malformed { message, .. }) => println!("Malformed class: {}", message),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[doc(hidden)]
pub mod test;

/// Convenient re-exports of the most commonly used types and functions.
///
/// # Example
///
/// ```rust,no_run
/// use classabi::prelude::*;
///
/// let summary = strip_jar("lib.jar", "lib-abi.jar", &AbiConfig::default(), None)?;
/// println!("{} classes written", summary.classes_written);
/// # Ok::<(), classabi::Error>(())
/// ```
pub mod prelude;

pub mod abi;
pub mod archive;
pub mod classfile;
pub mod file;
pub mod metadata;

/// `classabi` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `classabi` Error type
///
/// The main error type for all operations in this crate, covering class file decoding,
/// metadata contract violations and archive I/O.
pub use error::Error;

/// Entry points for stripping classes and archives.
pub use abi::{
    run_batch, strip_class, strip_jar, AbiArchiveWriter, AbiConfig, AbiSummary, BatchJob,
    DeletedClassNames,
};

/// Class file codec.
pub use classfile::{ClassReader, ClassVisitor, ClassWriter, ReadOptions};

/// Low-level parsing utilities.
///
/// # Example
///
/// ```rust
/// use classabi::Parser;
///
/// let mut parser = Parser::new(&[0xCA, 0xFE, 0xBA, 0xBE]);
/// assert_eq!(parser.read_be::<u32>()?, 0xCAFE_BABE);
/// # Ok::<(), classabi::Error>(())
/// ```
pub use file::parser::Parser;
