//! Application-wide error types.

use std::path::{Path, PathBuf};

use slack_api::ApiError;
use thiserror::Error;

use crate::credentials::ExtractionError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Credential extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error while {op} {}: {source}", path.display())]
    IoPath {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn io_path(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::IoPath {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_path_display() {
        let err = Error::io_path(
            "creating log directory",
            Path::new("/tmp/logs"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "IO error while creating log directory /tmp/logs: denied"
        );
    }

    #[test]
    fn test_from_extraction_error() {
        let err: Error = ExtractionError::NotInstalled.into();
        assert!(matches!(err, Error::Extraction(ExtractionError::NotInstalled)));
    }
}
