//! Kotlin metadata support.
//!
//! Kotlin compilers describe the source-level shape of every class file in a `@kotlin.Metadata`
//! annotation: visibility, `internal` and `inline` modifiers, properties and their accessors,
//! companion objects and nested classes. Stripping a class file without updating this
//! description would leave consumers seeing declarations whose bytecode is gone, so this
//! module decodes the annotation far enough to prune it in step with the class file.
//!
//! # Layers
//!
//! - [`header`] - the seven annotation slots ([`MetadataHeader`])
//! - [`bitencoding`] - `d1` strings to protobuf bytes and back
//! - [`proto`] - lossless protobuf wire codec
//! - [`names`] - string table resolution
//! - [`ClassMetadata`] - decoded declarations, pruning and re-encoding
//!
//! # Examples
//!
//! ```rust,ignore
//! use classabi::metadata::{ClassMetadata, MetadataHeader, PruneOptions};
//!
//! let header = MetadataHeader::from_annotation(&annotation)?;
//! let mut metadata = ClassMetadata::parse(&header)?;
//! metadata.prune("com/x/A", PruneOptions::default(), |_| false);
//! let pruned = metadata.to_header().to_annotation()?;
//! ```

pub mod bitencoding;
pub mod header;
pub(crate) mod model;
pub mod names;
pub mod proto;
mod prune;

pub use header::{MetadataHeader, MetadataHeaderReader, METADATA_DESCRIPTOR};
pub use model::{
    ClassInfo, ClassMetadata, Constructor, Declarations, Function, FunctionFlags, JvmSignature,
    MetadataKind, NameRef, Property, PropertyFlags, TypeAlias, Visibility,
};
pub use prune::PruneOptions;
