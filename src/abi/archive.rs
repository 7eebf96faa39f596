//! Stripping whole archives.
//!
//! [`AbiArchiveWriter`] consumes `(entry name, bytes)` pairs and writes the stripped classes to
//! an [`EntrySink`]. It works in two phases:
//!
//! 1. **Classification** - every class is run through the configured filter into
//!    [`Discard`] as it arrives. This fills the [`DeletedClassNames`] of the run and tells which
//!    entries survive.
//! 2. **Emission** - once the input is exhausted, the surviving entries are filtered again, now
//!    against the complete deleted set, and written in arrival order.
//!
//! Splitting the run this way makes the cross-reference tables of the output independent of
//! the order in which a producer delivers classes: an outer class arriving before its deleted
//! inner class still loses the reference to it.
//!
//! A run either publishes a complete archive or fails. The first error aborts it with the
//! offending entry attached, and a raised cancellation flag stops it with
//! [`Error::Cancelled`]; in both cases the sink is never finished.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info};
use rayon::prelude::*;

use crate::{
    abi::{config::AbiConfig, deleted::DeletedClassNames, run_filter, strip_class},
    archive::{ClassEntry, EntrySink, JarSource, ZipSink},
    classfile::{ClassReader, Discard, ReadOptions},
    Error, Result,
};

/// Entries buffered between the jar reader thread and the writer
const CHANNEL_CAPACITY: usize = 256;
/// How often a blocked [`AbiArchiveWriter::drain`] checks for cancellation
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Outcome of one archive run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbiSummary {
    /// Class entries received
    pub classes_seen: usize,
    /// Class entries written
    pub classes_written: usize,
    /// Non-class entries copied (`.kotlin_module`)
    pub resources_copied: usize,
    /// Classes removed for lack of public API
    pub deleted: DeletedClassNames,
}

/// Strips the classes of one archive into an [`EntrySink`].
pub struct AbiArchiveWriter<S: EntrySink> {
    config: AbiConfig,
    sink: S,
    cancel: Option<Arc<AtomicBool>>,
    deleted: DeletedClassNames,
    /// Surviving entries in arrival order
    pending: Vec<ClassEntry>,
    classes_seen: usize,
}

impl<S: EntrySink> AbiArchiveWriter<S> {
    /// Creates a writer for one run.
    pub fn new(sink: S, config: AbiConfig) -> Self {
        AbiArchiveWriter {
            config,
            sink,
            cancel: None,
            deleted: DeletedClassNames::new(),
            pending: Vec::new(),
            classes_seen: 0,
        }
    }

    /// Aborts the run with [`Error::Cancelled`] once `flag` is raised.
    #[must_use]
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Classes found without public API so far.
    #[must_use]
    pub fn deleted(&self) -> &DeletedClassNames {
        &self.deleted
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    /// Classifies one entry.
    ///
    /// Classes are decoded and filtered immediately, so malformed input fails here. `.kotlin_module`
    /// descriptors are kept when [`AbiConfig::copy_kotlin_module`] is set; every other entry is
    /// ignored.
    ///
    /// # Errors
    /// Returns [`Error::Entry`] wrapping the decoding error, or [`Error::Cancelled`].
    pub fn push(&mut self, entry: ClassEntry) -> Result<()> {
        self.check_cancelled()?;

        if entry.is_class() {
            self.classes_seen += 1;
            let api = ClassReader::new(&entry.data)
                .and_then(|reader| {
                    run_filter(
                        &reader,
                        Discard,
                        &self.config,
                        &mut self.deleted,
                        ReadOptions { skip_code: true },
                    )
                })
                .map_err(|error| error.in_entry(&entry.name))?;

            if api {
                self.pending.push(entry);
            }
        } else if entry.is_kotlin_module() && self.config.copy_kotlin_module {
            self.pending.push(entry);
        } else {
            debug!("Skipping {}", entry.name);
        }
        Ok(())
    }

    /// Classifies entries from `receiver` until the producer closes the channel.
    ///
    /// Returns the number of entries received.
    ///
    /// # Errors
    /// See [`AbiArchiveWriter::push`].
    pub fn drain(&mut self, receiver: &Receiver<ClassEntry>) -> Result<usize> {
        let mut received = 0;
        loop {
            self.check_cancelled()?;
            match receiver.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(entry) => {
                    received += 1;
                    self.push(entry)?;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Ok(received),
            }
        }
    }

    /// Writes the surviving entries and finishes the sink.
    ///
    /// # Errors
    /// Returns [`Error::Entry`] if an entry cannot be stripped or written, [`Error::Cancelled`],
    /// or the error of [`EntrySink::finish`].
    pub fn finish(mut self) -> Result<AbiSummary> {
        let mut classes_written = 0;
        let mut resources_copied = 0;

        for entry in std::mem::take(&mut self.pending) {
            self.check_cancelled()?;

            if entry.is_class() {
                let stripped = strip_class(&entry.data, &self.config, &mut self.deleted)
                    .map_err(|error| error.in_entry(&entry.name))?;
                if let Some(data) = stripped {
                    self.sink
                        .write_entry(&entry.name, &data)
                        .map_err(|error| error.in_entry(&entry.name))?;
                    classes_written += 1;
                }
            } else {
                self.sink
                    .write_entry(&entry.name, &entry.data)
                    .map_err(|error| error.in_entry(&entry.name))?;
                resources_copied += 1;
            }
        }

        self.check_cancelled()?;
        self.sink.finish()?;

        info!(
            "ABI archive complete: {} of {} classes written, {} deleted, {} resources copied",
            classes_written,
            self.classes_seen,
            self.deleted.len(),
            resources_copied
        );

        Ok(AbiSummary {
            classes_seen: self.classes_seen,
            classes_written,
            resources_copied,
            deleted: self.deleted,
        })
    }

    /// Runs both phases over `entries`.
    ///
    /// # Errors
    /// See [`AbiArchiveWriter::push`] and [`AbiArchiveWriter::finish`].
    pub fn write_all(mut self, entries: impl IntoIterator<Item = ClassEntry>) -> Result<AbiSummary> {
        for entry in entries {
            self.push(entry)?;
        }
        self.finish()
    }
}

/// Strips the jar at `input` into a new jar at `output`.
///
/// The input is read on a separate thread. `output` is only created once the run succeeded.
///
/// # Errors
/// Returns the first error of reading, stripping or writing, or [`Error::Cancelled`].
pub fn strip_jar(
    input: impl Into<PathBuf>,
    output: impl Into<PathBuf>,
    config: &AbiConfig,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<AbiSummary> {
    let input = input.into();
    let output = output.into();

    let source = JarSource::open(&input)?;
    let mut writer = AbiArchiveWriter::new(ZipSink::create(&output)?, *config);
    if let Some(flag) = cancel {
        writer = writer.with_cancellation(flag);
    }

    debug!("Stripping {} into {}", input.display(), output.display());
    let (receiver, producer) = source.spawn(CHANNEL_CAPACITY);
    let drained = writer.drain(&receiver);
    // Unblocks the producer if draining stopped early
    drop(receiver);

    let produced = producer
        .join()
        .map_err(|_| Error::Error(format!("Reader thread for {} panicked", input.display())))?;
    drained?;
    produced?;

    writer.finish()
}

/// One input/output pair of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    /// Jar to read
    pub input: PathBuf,
    /// Jar to write
    pub output: PathBuf,
}

/// Strips several jars in parallel, one independent run per job.
///
/// Results are returned in job order. A failing job does not affect the others.
pub fn run_batch(
    jobs: &[BatchJob],
    config: &AbiConfig,
    cancel: Option<&Arc<AtomicBool>>,
) -> Vec<Result<AbiSummary>> {
    jobs.par_iter()
        .map(|job| strip_jar(&job.input, &job.output, config, cancel.cloned()))
        .collect()
}
