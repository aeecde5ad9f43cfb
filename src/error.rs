//! Centralized error types for emlpdf.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the emlpdf library.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The batch was rejected before any item was processed.
    #[error("Invalid input for batch conversion: {0}")]
    InvalidBatchInput(String),

    /// The document font could not be loaded or embedded.
    #[error("Font error: {0}")]
    Font(String),

    /// The PDF document could not be assembled.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// The output file appeared between resolution and write.
    #[error("Output file already exists: {0}")]
    OutputExists(PathBuf),
}

/// Convenience alias for `Result<T, ConvertError>`.
pub type Result<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Map a read error, turning `NotFound` into [`ConvertError::FileNotFound`].
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path)
        } else {
            Self::Io { path, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_not_found_maps_to_file_not_found() {
        let err = ConvertError::read(
            "/missing.eml",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(matches!(err, ConvertError::FileNotFound(_)));
    }

    #[test]
    fn test_io_error_message_contains_path() {
        let err = ConvertError::io(
            "/out/a.pdf",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(err.to_string().contains("/out/a.pdf"));
    }
}
