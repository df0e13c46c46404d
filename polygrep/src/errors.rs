/// Error types for polygrep.
///
/// Two families of failure exist and they travel differently:
///
/// 1. **Configuration errors** (empty search strings, missing roots, bad globs or
///    patterns) are returned as `Err(SearchError)` from `Searcher::new` before any
///    file is touched.
/// 2. **File-scoped errors** (an unreadable directory, a corrupt archive) are
///    converted into [`FileError`](crate::results::FileError) records and carried
///    in the search output. They never abort a run.
///
/// ```rust,ignore
/// match Searcher::new(config) {
///     Ok(searcher) => {
///         let output = searcher.search();
///         for err in &output.errors { /* report */ }
///     }
///     Err(SearchError::ConfigError(msg)) => // fatal, nothing was scanned
///     Err(e) => // other pre-scan failure
/// }
/// ```
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Failed to load ignore file {path}: {message}")]
    IgnoreFile { path: PathBuf, message: String },
    #[error("Archive error in {path}: {source}")]
    ArchiveError {
        path: PathBuf,
        source: zip::result::ZipError,
    },
    #[error("Directory traversal error: {0}")]
    WalkError(#[from] ignore::Error),
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
    #[error("Extractor panicked while processing {path}: {message}")]
    ExtractorPanic { path: PathBuf, message: String },
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl SearchError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn ignore_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::IgnoreFile {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn archive_error(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::ArchiveError {
            path: path.into(),
            source,
        }
    }

    pub fn worker_pool(msg: impl Into<String>) -> Self {
        Self::WorkerPool(msg.into())
    }

    pub fn extractor_panic(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ExtractorPanic {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Maps an I/O error on `path` to the most specific variant.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::file_not_found(path),
            io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }
}
