//! # classabi Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and functions
//! from the classabi library. Import this module to get quick access to everything needed to
//! strip classes and archives, or to write a custom stage of the visitor chain.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all classabi operations
pub use crate::Error;

/// The result type used throughout classabi
pub use crate::Result;

// ================================================================================================
// Stripping
// ================================================================================================

/// Behaviour switches of a stripping run
pub use crate::abi::AbiConfig;

/// Single-class and whole-archive entry points
pub use crate::abi::{run_batch, strip_class, strip_jar, BatchJob};

/// Archive orchestration and its results
pub use crate::abi::{AbiArchiveWriter, AbiSummary, DeletedClassNames};

/// The filters, for composing custom visitor chains
pub use crate::abi::{MemberFilter, MetadataFilter};

// ================================================================================================
// Archives
// ================================================================================================

/// Archive entries, producers and sinks
pub use crate::archive::{ClassEntry, EntrySink, JarSource, MemorySink, ZipSink};

// ================================================================================================
// Class Files
// ================================================================================================

/// Class file codec
pub use crate::classfile::{ClassReader, ClassVisitor, ClassWriter, Discard, ReadOptions};

/// Class, field and method events
pub use crate::classfile::{
    ClassHeader, FieldInfo, InnerClass, MethodInfo, OuterClass, RawAttribute, SourceInfo,
};

/// Access flags
pub use crate::classfile::access::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};

/// Annotations
pub use crate::classfile::annotation::{Annotation, ElementValue};

// ================================================================================================
// Kotlin Metadata
// ================================================================================================

/// The raw `@kotlin.Metadata` annotation
pub use crate::metadata::{MetadataHeader, METADATA_DESCRIPTOR};

/// The decoded declaration model
pub use crate::metadata::{ClassMetadata, MetadataKind, PruneOptions, Visibility};
