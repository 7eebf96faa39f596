//! Jar I/O and sample class files shared by the integration tests.
//!
//! Synthetic classes and metadata come from `classabi::test`. The files under `tests/samples/`
//! were produced by the Kotlin compiler.

#![allow(dead_code)]

use std::{
    io::{Cursor, Read, Write},
    path::{Path, PathBuf},
};

use classabi::prelude::*;

pub use classabi::test::{
    read_class, visibility_flags, ClassBuilder, MetadataBuilder, Recorder, INLINE,
};

/// Path of a file under `tests/samples/`
pub fn sample_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("samples")
        .join(name)
}

/// Every entry of a sample jar
pub fn sample_jar(name: &str) -> Vec<ClassEntry> {
    read_jar(&sample_path(name))
}

/// The entry `name` of a sample jar
pub fn sample_class(jar: &str, name: &str) -> Vec<u8> {
    sample_jar(jar)
        .into_iter()
        .find(|entry| entry.name == name)
        .unwrap_or_else(|| panic!("{jar} has no entry {name}"))
        .data
}

/// Writes `entries` into an in-memory jar.
pub fn jar(entries: &[ClassEntry]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for entry in entries {
        writer
            .start_file(entry.name.as_str(), zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(&entry.data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Reads every entry of the jar at `path`.
pub fn read_jar(path: &Path) -> Vec<ClassEntry> {
    let data = std::fs::read(path).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
    (0..archive.len())
        .map(|index| {
            let mut file = archive.by_index(index).unwrap();
            let mut content = Vec::new();
            file.read_to_end(&mut content).unwrap();
            ClassEntry::new(file.name(), content)
        })
        .filter(|entry| !entry.name.ends_with('/'))
        .collect()
}
