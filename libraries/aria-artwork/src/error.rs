use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while caching thumbnails
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// Source audio file not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error while reading or writing cache files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No per-user cache directory could be resolved
    #[error("No cache directory available on this platform")]
    NoCacheDir,
}

/// Result type for thumbnail operations
pub type Result<T> = std::result::Result<T, ThumbnailError>;
