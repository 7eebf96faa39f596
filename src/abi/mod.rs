//! ABI stripping of class files.
//!
//! This module reduces class files to the declarations other compilation units can see and
//! drives that reduction over whole archives.
//!
//! # Key Components
//!
//! - [`AbiConfig`] - What survives and how the output is shaped
//! - [`MemberFilter`] - Access-flag based filtering of one class
//! - [`MetadataFilter`] - Kotlin-metadata-aware filtering of one class
//! - [`DeletedClassNames`] - Classes removed during one archive run
//! - [`AbiArchiveWriter`] - Runs the filters over an archive and writes the result
//!
//! # Examples
//!
//! ```rust,no_run
//! use classabi::abi::{strip_jar, AbiConfig};
//!
//! let summary = strip_jar("lib.jar", "lib-abi.jar", &AbiConfig::kotlin(), None)?;
//! println!("{} of {} classes kept", summary.classes_written, summary.classes_seen);
//! # Ok::<(), classabi::Error>(())
//! ```

mod archive;
mod config;
mod deleted;
mod filter;
mod metadata_filter;

pub use archive::{run_batch, strip_jar, AbiArchiveWriter, AbiSummary, BatchJob};
pub use config::AbiConfig;
pub use deleted::DeletedClassNames;
pub use filter::MemberFilter;
pub use metadata_filter::MetadataFilter;

use crate::{
    classfile::{ClassReader, ClassVisitor, ClassWriter, ReadOptions},
    Result,
};

/// Runs the filter selected by `config` over `reader`, forwarding to `next`.
///
/// Returns whether the class is part of the API.
pub(crate) fn run_filter<V: ClassVisitor>(
    reader: &ClassReader,
    next: V,
    config: &AbiConfig,
    deleted: &mut DeletedClassNames,
    options: ReadOptions,
) -> Result<bool> {
    if config.use_metadata {
        let mut filter = MetadataFilter::new(next, config, deleted);
        reader.accept(&mut filter, options)?;
        Ok(filter.is_api_class())
    } else {
        let mut filter = MemberFilter::new(next, config, deleted);
        reader.accept(&mut filter, options)?;
        Ok(filter.is_api_class())
    }
}

/// Strips a single class file.
///
/// Method bodies are only read when [`AbiConfig::body_stripping`] is on. Returns `None` if the
/// class is not part of the API, in which case its name has been added to `deleted`.
///
/// # Errors
/// Returns an error if the class file or its Kotlin metadata is malformed.
pub fn strip_class(
    data: &[u8],
    config: &AbiConfig,
    deleted: &mut DeletedClassNames,
) -> Result<Option<Vec<u8>>> {
    let reader = ClassReader::new(data)?;
    let mut writer = ClassWriter::from_reader(&reader);
    let options = ReadOptions {
        skip_code: !config.body_stripping,
    };

    if !run_filter(&reader, &mut writer, config, deleted, options)? {
        return Ok(None);
    }
    Ok(writer.into_bytes())
}
