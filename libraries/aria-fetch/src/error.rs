use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the acquisition pipeline.
///
/// Cancellation is not represented here; a killed job resolves as
/// [`crate::FetchOutcome::Cancelled`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// The external tool exited with a failure status
    #[error("Tool invocation failed (exit {code:?}): {stderr}")]
    Tool { code: Option<i32>, stderr: String },

    /// The tool's structured output could not be parsed
    #[error("Could not parse tool output: {0}")]
    Parse(#[from] serde_json::Error),

    /// The tool reported success but the artifact is not on disk
    #[error("Downloaded file missing despite tool success: {0}")]
    Verification(PathBuf),

    /// I/O error spawning or talking to the tool
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for fetch operations
pub type Result<T> = std::result::Result<T, FetchError>;
