use std::path::Path;

use classabi::{AbiSummary, Error};
use serde::Serialize;

/// Exit code used when a run was interrupted with Ctrl+C.
pub const EXIT_CANCELLED: i32 = 130;

/// Serializable outcome of one stripped jar.
#[derive(Debug, Serialize)]
pub struct StripInfo {
    pub input: String,
    pub output: String,
    pub classes_seen: usize,
    pub classes_written: usize,
    pub resources_copied: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deleted: Vec<String>,
}

impl StripInfo {
    pub fn new(input: &Path, output: &Path, summary: &AbiSummary) -> Self {
        Self {
            input: input.display().to_string(),
            output: output.display().to_string(),
            classes_seen: summary.classes_seen,
            classes_written: summary.classes_written,
            resources_copied: summary.resources_copied,
            deleted: summary
                .deleted
                .sorted()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// One-line human-readable summary.
    pub fn line(&self) -> String {
        format!(
            "{} -> {}: {} of {} classes kept, {} deleted, {} resources copied",
            self.input,
            self.output,
            self.classes_written,
            self.classes_seen,
            self.deleted.len(),
            self.resources_copied
        )
    }
}

/// Terminates the process if `error` is a cancellation, otherwise returns it unchanged.
pub fn exit_if_cancelled(error: Error) -> Error {
    if matches!(error, Error::Cancelled) {
        eprintln!("Cancelled, no output written.");
        std::process::exit(EXIT_CANCELLED);
    }
    error
}
