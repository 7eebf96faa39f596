use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every failure in this crate is fatal for the unit of work it happens in: a class file that
/// cannot be decoded, a metadata blob that violates the expected format or an archive that
/// cannot be written. None of them are retried, since the inputs are static byte buffers.
///
/// # Error Categories
///
/// ## Class File Errors
/// - [`Error::Malformed`] - Corrupted or invalid class file structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of the buffer
/// - [`Error::NotSupported`] - Input is not a class file (bad magic)
/// - [`Error::Empty`] - Empty input provided
///
/// ## Metadata Errors
/// - [`Error::MetadataType`] - A known `@kotlin.Metadata` key carried a value of the wrong type
///
/// ## Archive Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::Archive`] - Errors reported by the zip container
/// - [`Error::Entry`] - Any of the above, attributed to the archive entry being processed
/// - [`Error::Cancelled`] - The run was cancelled before the archive was complete
///
/// # Examples
///
/// ```rust
/// use classabi::{ClassReader, Error};
///
/// match ClassReader::new(&[0xCA, 0xFE]) {
///     Ok(_) => println!("parsed"),
///     Err(Error::OutOfBounds) => eprintln!("truncated class file"),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed class: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The class file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected
    /// for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the buffer.
    ///
    /// Typically a truncated class file or protobuf message.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// The input does not start with the class file magic `0xCAFEBABE`.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while reading input jars or
    /// writing the output archive.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// A known metadata key carried a value of an unexpected type.
    ///
    /// This is a contract violation between the producer of the `@kotlin.Metadata`
    /// annotation and this tool; it is never recovered from.
    #[error("Metadata key '{key}' expected {expected}")]
    MetadataType {
        /// The annotation element name, e.g. `k` or `d1`
        key: String,
        /// Human readable name of the expected value type
        expected: &'static str,
    },

    /// Error from the zip crate while reading or writing an archive.
    #[error("{0}")]
    Archive(#[from] zip::result::ZipError),

    /// An error attributed to a specific archive entry.
    ///
    /// The orchestrator wraps every per-entry failure so the build step that
    /// surfaces it can point at the offending class.
    #[error("{name}: {source}")]
    Entry {
        /// Entry name inside the archive, e.g. `com/x/A.class`
        name: String,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },

    /// The run was cancelled; no output archive was published.
    #[error("Operation was cancelled")]
    Cancelled,
}

impl Error {
    /// Attaches an archive entry name to this error.
    #[must_use]
    pub fn in_entry(self, name: &str) -> Self {
        match self {
            Error::Entry { .. } => self,
            other => Error::Entry {
                name: name.to_string(),
                source: Box::new(other),
            },
        }
    }
}
