//! Destinations for the entries that survive stripping.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use zip::{write::SimpleFileOptions, CompressionMethod, DateTime, ZipWriter};

use crate::{Error, Result};

/// Receives the entries of one output archive.
///
/// A sink is written once and then finished. A sink that is dropped without a successful
/// [`EntrySink::finish`] must not leave a usable archive behind.
pub trait EntrySink {
    /// Adds an entry with exactly these bytes under exactly this name.
    ///
    /// # Errors
    /// Returns an error if the entry cannot be written.
    fn write_entry(&mut self, name: &str, data: &[u8]) -> Result<()>;

    /// Completes the archive.
    ///
    /// # Errors
    /// Returns an error if the archive cannot be completed or published.
    fn finish(&mut self) -> Result<()>;
}

impl<S: EntrySink + ?Sized> EntrySink for &mut S {
    fn write_entry(&mut self, name: &str, data: &[u8]) -> Result<()> {
        (**self).write_entry(name, data)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Writes a jar file through a temporary file.
///
/// Entries go to `<target>.<pid>.tmp` in the target directory, so the final rename stays on one
/// filesystem. [`EntrySink::finish`] renames it over the target; dropping the sink before that
/// removes it, so an aborted run never publishes a partial archive. Every entry is deflated and
/// carries the same fixed timestamp, which makes the output reproducible.
pub struct ZipSink {
    writer: Option<ZipWriter<File>>,
    temp_path: PathBuf,
    target_path: PathBuf,
    finished: bool,
}

impl ZipSink {
    /// Starts a new archive that will be published at `target`.
    ///
    /// # Errors
    /// Returns [`Error::FileError`] if the temporary file cannot be created.
    pub fn create(target: impl AsRef<Path>) -> Result<ZipSink> {
        let target_path = target.as_ref().to_path_buf();
        let Some(file_name) = target_path.file_name() else {
            return Err(Error::Error(format!(
                "Invalid output path {}",
                target_path.display()
            )));
        };

        let mut temp_name = file_name.to_os_string();
        temp_name.push(format!(".{}.tmp", std::process::id()));
        let temp_path = target_path.with_file_name(temp_name);

        let file = File::create(&temp_path)?;
        Ok(ZipSink {
            writer: Some(ZipWriter::new(file)),
            temp_path,
            target_path,
            finished: false,
        })
    }

    /// Where the archive is published.
    #[must_use]
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    fn options() -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
    }
}

impl EntrySink for ZipSink {
    fn write_entry(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(Error::Error(format!(
                "Archive {} is already finished",
                self.target_path.display()
            )));
        };
        writer.start_file(name, Self::options())?;
        writer.write_all(data)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(writer) = self.writer.take() else {
            return Err(Error::Error(format!(
                "Archive {} is already finished",
                self.target_path.display()
            )));
        };
        let file = writer.finish()?;
        file.sync_all()?;
        drop(file);

        fs::rename(&self.temp_path, &self.target_path)?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for ZipSink {
    fn drop(&mut self) {
        if !self.finished {
            // Close the handle before deleting the incomplete file
            drop(self.writer.take());
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// Collects entries in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    entries: Vec<(String, Vec<u8>)>,
    finished: bool,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> MemorySink {
        MemorySink::default()
    }

    /// Entries in the order they were written.
    #[must_use]
    pub fn entries(&self) -> &[(String, Vec<u8>)] {
        &self.entries
    }

    /// Entry names in the order they were written.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Content of the entry `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, data)| data.as_slice())
    }

    /// Returns `true` once [`EntrySink::finish`] was called.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Consumes the sink and returns its entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<(String, Vec<u8>)> {
        self.entries
    }
}

impl EntrySink for MemorySink {
    fn write_entry(&mut self, name: &str, data: &[u8]) -> Result<()> {
        if self.finished {
            return Err(Error::Error("Memory sink is already finished".to_string()));
        }
        self.entries.push((name.to_string(), data.to_vec()));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
