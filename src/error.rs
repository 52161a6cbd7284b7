use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum DocTextError {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Output directory already exists: {path}")]
    OutputDirectoryExists { path: String },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Extraction(#[from] ExtractError),
}

/// Failure of a single extraction attempt.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("No registered extractor handles {}", path.display())]
    Unsupported { path: PathBuf },

    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to decode {}: {message}", path.display())]
    Decode {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Access failed for {}: {source}", path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Extraction was cancelled")]
    Cancelled,
}

/// Serializable tag for an [`ExtractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unsupported,
    NotFound,
    DecodeFailure,
    AccessFailure,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::NotFound => "not_found",
            ErrorKind::DecodeFailure => "decode_failure",
            ErrorKind::AccessFailure => "access_failure",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ExtractError {
    pub fn unsupported<P: Into<PathBuf>>(path: P) -> Self {
        ExtractError::Unsupported { path: path.into() }
    }

    pub fn decode<P: Into<PathBuf>, M: Into<String>>(path: P, message: M) -> Self {
        ExtractError::Decode {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn decode_with_source<P, E>(path: P, source: E) -> Self
    where
        P: Into<PathBuf>,
        E: std::error::Error + Send + Sync + 'static,
    {
        ExtractError::Decode {
            path: path.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Classifies an I/O failure raised while reading `path`.
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => ExtractError::NotFound {
                path: path.to_path_buf(),
            },
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
                ExtractError::decode_with_source(path, error)
            }
            _ => ExtractError::Access {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::Unsupported { .. } => ErrorKind::Unsupported,
            ExtractError::NotFound { .. } => ErrorKind::NotFound,
            ExtractError::Decode { .. } => ErrorKind::DecodeFailure,
            ExtractError::Access { .. } => ErrorKind::AccessFailure,
            ExtractError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExtractError::Cancelled)
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            ExtractError::Unsupported { path }
            | ExtractError::NotFound { path }
            | ExtractError::Decode { path, .. }
            | ExtractError::Access { path, .. } => Some(path),
            ExtractError::Cancelled => None,
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for ExtractError {
    fn user_message(&self) -> String {
        match self {
            ExtractError::Unsupported { path } => {
                format!("Unsupported file format: {}", path.display())
            }
            ExtractError::NotFound { path } => format!("File not found: {}", path.display()),
            ExtractError::Decode { path, message, .. } => {
                format!("Could not read document {}: {}", path.display(), message)
            }
            ExtractError::Access { path, source } => {
                format!("Could not access {}: {}", path.display(), source)
            }
            ExtractError::Cancelled => "Operation was cancelled by user".to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            ExtractError::Unsupported { .. } => Some(
                "Register an extractor for this format or enable the fallback text extractor."
                    .to_string(),
            ),
            ExtractError::NotFound { .. } => Some(
                "The file may have been moved or deleted after it was discovered; re-run the extraction."
                    .to_string(),
            ),
            ExtractError::Decode { .. } => Some(
                "The document may be corrupt, encrypted, or use an unsupported feature.".to_string(),
            ),
            ExtractError::Access { .. } => Some(
                "Ensure you have read permission for the file and that no other process holds a lock on it."
                    .to_string(),
            ),
            ExtractError::Cancelled => None,
        }
    }
}

impl UserFriendlyError for DocTextError {
    fn user_message(&self) -> String {
        match self {
            DocTextError::Io(err) => format!("IO error: {}", err),
            DocTextError::Config { message } => format!("Configuration error: {}", message),
            DocTextError::InvalidPath { path } => format!("Invalid file path: {}", path),
            DocTextError::OutputDirectoryExists { path } => {
                format!("Output directory already exists: {}", path)
            }
            DocTextError::Pattern(err) => format!("Invalid pattern: {}", err),
            DocTextError::Extraction(err) => err.user_message(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            DocTextError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all values are positive."
                    .to_string(),
            ),
            DocTextError::InvalidPath { .. } => {
                Some("Check that the path exists and points to a directory.".to_string())
            }
            DocTextError::OutputDirectoryExists { .. } => Some(
                "Remove the existing directory, choose a different output directory, or enable force_overwrite."
                    .to_string(),
            ),
            DocTextError::Extraction(err) => err.suggestion(),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for DocTextError {
    fn from(error: toml::de::Error) -> Self {
        DocTextError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DocTextError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_friendly_messages() {
        let error = ExtractError::unsupported("/tmp/file.xyz");
        assert!(error.user_message().contains("Unsupported file format"));
        assert!(error.suggestion().is_some());

        let error = DocTextError::Config {
            message: "bad".to_string(),
        };
        assert!(error.user_message().contains("Configuration error"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_io_error_classification() {
        let path = Path::new("/tmp/missing.txt");

        let err = ExtractError::from_io(path, io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = ExtractError::from_io(path, io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.kind(), ErrorKind::AccessFailure);

        let err = ExtractError::from_io(path, io::Error::from(io::ErrorKind::InvalidData));
        assert_eq!(err.kind(), ErrorKind::DecodeFailure);
        assert_eq!(err.path(), Some(path));
    }

    #[test]
    fn test_access_message_names_the_cause() {
        let path = Path::new("/tmp/busy.txt");
        let cause = io::Error::new(io::ErrorKind::Other, "too many open files");
        let err = ExtractError::from_io(path, cause);
        assert_eq!(err.kind(), ErrorKind::AccessFailure);
        assert!(err.user_message().contains("too many open files"));
        assert!(err.user_message().contains("/tmp/busy.txt"));
        assert!(!err.user_message().contains("Permission denied"));
    }

    #[test]
    fn test_cancelled_has_no_path() {
        let err = ExtractError::Cancelled;
        assert!(err.is_cancelled());
        assert!(err.path().is_none());
        assert_eq!(err.kind().to_string(), "cancelled");
    }

    #[test]
    fn test_extraction_error_is_transparent() {
        let err = DocTextError::from(ExtractError::NotFound {
            path: PathBuf::from("a.txt"),
        });
        assert_eq!(err.to_string(), "File not found: a.txt");
    }
}
