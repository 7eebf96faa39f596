//! Reading entries out of an input jar.

use std::{
    io::{Cursor, Read},
    path::Path,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{bounded, Receiver, Sender};
use zip::ZipArchive;

use crate::{
    archive::ClassEntry,
    file::{Backend, Physical},
    Result,
};

/// A jar whose entries are produced in archive order.
///
/// Directory entries are skipped. The archive is read from a [`Backend`], by default a
/// memory-mapped file.
pub struct JarSource<B: Backend = Physical> {
    backend: B,
}

impl JarSource<Physical> {
    /// Memory-maps the jar at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    pub fn open(path: impl AsRef<Path>) -> Result<JarSource<Physical>> {
        Ok(JarSource {
            backend: Physical::new(path)?,
        })
    }
}

impl<B: Backend> JarSource<B> {
    /// Reads the jar held by `backend`.
    pub fn from_backend(backend: B) -> JarSource<B> {
        JarSource { backend }
    }

    /// Sends every entry to `sender` and returns the number of entries sent.
    ///
    /// Stops early, without error, when the receiving side has hung up.
    ///
    /// # Errors
    /// Returns [`crate::Error::Archive`] if the jar is not a valid zip archive and
    /// [`crate::Error::FileError`] if an entry cannot be decompressed.
    pub fn send_to(&self, sender: &Sender<ClassEntry>) -> Result<usize> {
        let mut archive = ZipArchive::new(Cursor::new(self.backend.data()))?;
        let mut sent = 0;
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }

            let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
            file.read_to_end(&mut data)?;
            if sender.send(ClassEntry::new(file.name(), data)).is_err() {
                break;
            }
            sent += 1;
        }
        Ok(sent)
    }

    /// Every entry of the jar, in archive order.
    ///
    /// # Errors
    /// See [`JarSource::send_to`].
    pub fn entries(&self) -> Result<Vec<ClassEntry>> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.send_to(&sender)?;
        drop(sender);
        Ok(receiver.into_iter().collect())
    }
}

impl<B: Backend + 'static> JarSource<B> {
    /// Produces the entries on a new thread through a channel holding at most `capacity`
    /// entries. The channel closes when the jar is exhausted or reading fails; the thread's
    /// result carries the number of entries sent or the read error.
    pub fn spawn(self, capacity: usize) -> (Receiver<ClassEntry>, JoinHandle<Result<usize>>) {
        let (sender, receiver) = bounded(capacity);
        let handle = thread::spawn(move || self.send_to(&sender));
        (receiver, handle)
    }
}
