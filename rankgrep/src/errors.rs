/// Error types for rankgrep.
///
/// Errors fall into two groups:
///
/// 1. **Fatal** errors abort the whole search: an invalid pattern, a root that
///    cannot be listed, bad configuration, or cancellation.
/// 2. **Per-file** errors only affect a single file. The engine records the file
///    as skipped and keeps going:
///    ```rust,ignore
///    match processor.process_file(path) {
///        Ok(Some(file_match)) => // keep,
///        Ok(None) => // no matches,
///        Err(e) if e.is_per_file() => // skip and record,
///        Err(e) => return Err(e),
///    }
///    ```
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Cannot walk {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid UTF-8 in file {path}: {source}")]
    EncodingError {
        path: PathBuf,
        source: std::str::Utf8Error,
    },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Search cancelled")]
    Cancelled,
}

impl SearchError {
    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn encoding_error(path: impl Into<PathBuf>, source: std::str::Utf8Error) -> Self {
        Self::EncodingError {
            path: path.into(),
            source,
        }
    }

    /// Maps an I/O error raised while opening or reading `path`.
    pub fn from_io(path: &Path, e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(e),
        }
    }

    /// True for errors confined to a single file, which the engine skips
    /// instead of aborting.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_)
                | Self::PermissionDenied(_)
                | Self::EncodingError { .. }
                | Self::IoError(_)
        )
    }
}
