//! Error types for meshprep

use thiserror::Error;

/// Main error type for meshprep operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unreadable mesh: {0}")]
    UnreadableMesh(String),

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Visualization error: {0}")]
    Visualization(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl Error {
    /// Whether the error means the input mesh could not be used at all.
    ///
    /// These are skipped quietly by the batch runner instead of being
    /// reported as processing failures.
    pub fn is_unreadable(&self) -> bool {
        matches!(self, Error::UnreadableMesh(_) | Error::UnsupportedFormat(_))
    }
}

/// Result type alias for meshprep operations
pub type Result<T> = std::result::Result<T, Error>;
