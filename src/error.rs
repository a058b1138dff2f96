//! Error types for pagex.
//!
//! Search and suggestion operations fail with [`PagexError`]. The variants map to
//! how the caller is expected to react:
//!
//! - [`PagexError::InvalidArgument`] and [`PagexError::NotFound`] abort the whole
//!   operation before any document is touched.
//! - [`PagexError::CorruptIndex`] is returned by a snapshot reload; the previous
//!   snapshot stays live.
//! - [`PagexError::ExtractionFailure`] concerns a single document. The search
//!   executor logs it and moves on to the next document.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the search, extraction and suggestion layers.
#[derive(Error, Debug)]
pub enum PagexError {
    /// A caller-supplied argument is unusable (e.g. an empty search term)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A directory or document that must exist does not
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The persisted identifier snapshot could not be parsed
    #[error("Corrupt index at {}: {source}", path.display())]
    CorruptIndex {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Text could not be extracted from one document
    #[error("Failed to extract text from {}: {reason}", path.display())]
    ExtractionFailure { path: PathBuf, reason: String },

    /// I/O errors (file reads, snapshot writes, process spawning)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for pagex operations.
pub type Result<T> = std::result::Result<T, PagexError>;

impl PagexError {
    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        PagexError::InvalidArgument(msg.into())
    }

    /// Create a new extraction failure for `path`.
    pub fn extraction<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        PagexError::ExtractionFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }

}
