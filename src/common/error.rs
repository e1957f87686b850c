use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Format-level errors raised while decoding or encoding an ID3v2 tag.
#[derive(Error, Debug)]
pub enum TagError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("ID3 no header found")]
    NoHeader,

    #[error("ID3 unsupported version: {0}")]
    UnsupportedTagVersion(String),

    #[error("ID3 malformed header: {0}")]
    MalformedHeader(String),

    #[error("ID3 malformed frame at offset {offset}")]
    MalformedFrame { offset: usize },

    #[error("ID3 truncated frame {id}: declared {declared} bytes, {available} available")]
    TruncatedFrame {
        id: String,
        declared: usize,
        available: usize,
    },

    #[error("ID3 unsupported text encoding: {0:#04x}")]
    UnsupportedEncoding(u8),

    #[error("ID3 tag declares {declared} bytes but only {available} are present")]
    PayloadBoundary { declared: usize, available: usize },

    #[error("ID3 bad compressed data")]
    BadCompressedData,

    #[error("ID3 frame {id} too large: {size} bytes")]
    TooLarge { id: String, size: usize },
}

pub type Result<T> = std::result::Result<T, TagError>;

/// Errors surfaced by the mutation engine. Every variant names the path
/// that caused it so callers can render a message.
#[derive(Error, Debug)]
pub enum MutationError {
    #[error("Source file not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Source file unreadable: {}: {source}", path.display())]
    SourceUnreadable { path: PathBuf, source: io::Error },

    #[error("No MPEG audio found in {}", path.display())]
    NotAnMp3 { path: PathBuf },

    #[error("Export directory not writable: {}: {source}", path.display())]
    DestDirUnwritable { path: PathBuf, source: io::Error },

    #[error("Failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    #[error("Corrupt ID3 tag in {}: {source}", path.display())]
    CorruptTag { path: PathBuf, source: TagError },

    #[error("Target already claimed by another request in this batch: {}", path.display())]
    DuplicateTarget { path: PathBuf },
}

impl MutationError {
    /// The path the failure refers to.
    pub fn path(&self) -> &Path {
        match self {
            MutationError::SourceNotFound { path }
            | MutationError::SourceUnreadable { path, .. }
            | MutationError::NotAnMp3 { path }
            | MutationError::DestDirUnwritable { path, .. }
            | MutationError::WriteFailed { path, .. }
            | MutationError::CorruptTag { path, .. }
            | MutationError::DuplicateTarget { path } => path,
        }
    }
}

#[cfg(feature = "python")]
mod python {
    use pyo3::create_exception;
    use pyo3::exceptions::PyException;

    use super::MutationError;

    // Python exception hierarchy mirroring MutationError
    create_exception!(id3_mutate, MutationPyError, PyException);
    create_exception!(id3_mutate, SourceNotFoundError, MutationPyError);
    create_exception!(id3_mutate, SourceUnreadableError, MutationPyError);
    create_exception!(id3_mutate, NotAnMp3Error, MutationPyError);
    create_exception!(id3_mutate, DestDirUnwritableError, MutationPyError);
    create_exception!(id3_mutate, WriteFailedError, MutationPyError);
    create_exception!(id3_mutate, CorruptTagError, MutationPyError);

    impl From<MutationError> for pyo3::PyErr {
        fn from(err: MutationError) -> pyo3::PyErr {
            let msg = err.to_string();
            match err {
                MutationError::SourceNotFound { .. } => SourceNotFoundError::new_err(msg),
                MutationError::SourceUnreadable { .. } => SourceUnreadableError::new_err(msg),
                MutationError::NotAnMp3 { .. } => NotAnMp3Error::new_err(msg),
                MutationError::DestDirUnwritable { .. } => DestDirUnwritableError::new_err(msg),
                MutationError::WriteFailed { .. } => WriteFailedError::new_err(msg),
                MutationError::CorruptTag { .. } => CorruptTagError::new_err(msg),
                MutationError::DuplicateTarget { .. } => MutationPyError::new_err(msg),
            }
        }
    }
}

#[cfg(feature = "python")]
pub use python::*;
